//! Tool calls within a turn, and hand-off-directed conversations.

mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use tk_core::agents::Agent;
use tk_core::engine::{
    AnyOf, EngineError, HandoffSelection, HandoffToUserTermination, KeywordTermination, RunConfig,
    TextReplyTermination,
};
use tk_core::gateway::{GatewayResponse, ScriptedGateway};
use tk_core::tools::builtin;
use tk_protocol::events::RunEvent;
use tk_protocol::message_models::{HandoffTarget, Message, MessageKind, Role, ToolCall};
use tk_protocol::run_models::{RunStatus, StopReason};
use tk_protocol::team_models::NoHandoffPolicy;
use tokio_util::sync::CancellationToken;

fn calculator(gateway: &Arc<ScriptedGateway>) -> Agent {
    Agent::new("calculator", gateway.clone())
        .with_instruction("Use the add tool.")
        .with_tool(builtin::add())
}

fn travel_desk(gateway: &Arc<ScriptedGateway>) -> Vec<Agent> {
    vec![
        Agent::new("travel_agent", gateway.clone())
            .with_handoff("flights_refunder")
            .with_handoff("user"),
        Agent::new("flights_refunder", gateway.clone())
            .with_handoff("travel_agent")
            .with_handoff("user")
            .with_tool(builtin::refund_flight()),
    ]
}

fn swarm(agents: Vec<Agent>, policy: NoHandoffPolicy, termination: AnyOf, config: RunConfig) -> tk_core::engine::Orchestrator {
    team(
        agents,
        Arc::new(HandoffSelection::new("travel_agent", policy)),
        Arc::new(termination),
        config,
    )
}

#[tokio::test]
async fn test_identically_configured_agents_answer_identically() {
    let script = || {
        Arc::new(ScriptedGateway::new().with_replies(
            "writer",
            [
                GatewayResponse::ToolCall(ToolCall::new("c1", "add", json!({"a": 2, "b": 3}))),
                GatewayResponse::handoff("reviewer", "Draft ready."),
            ],
        ))
    };
    let writer = |gateway: &Arc<ScriptedGateway>| {
        Agent::new("writer", gateway.clone())
            .with_model("gpt-4o")
            .with_instruction("Write a draft.")
            .with_tool(builtin::add())
            .with_handoff("reviewer")
    };

    let (first_gateway, second_gateway) = (script(), script());
    let (first, second) = (writer(&first_gateway), writer(&second_gateway));

    let mut history = vec![Message::user("Write a slogan")];
    for _ in 0..2 {
        let a = first.act(&history).await.unwrap();
        let b = second.act(&history).await.unwrap();
        assert_eq!(a, b);
        history.push(a);
    }

    assert_eq!(first_gateway.requests(), second_gateway.requests());
    assert_eq!(first_gateway.requests().len(), 2);
}

#[tokio::test]
async fn test_tool_result_is_visible_before_the_answer() {
    let gateway = Arc::new(
        ScriptedGateway::new().with_replies(
            "calculator",
            [
                GatewayResponse::ToolCall(ToolCall::new("c1", "add", json!({"a": 2, "b": 3}))),
                GatewayResponse::text("5"),
            ],
        ),
    );
    let orchestrator = fixed_order_team(
        vec![calculator(&gateway)],
        AnyOf::default().or(TextReplyTermination),
        RunConfig::default(),
    );

    let state = orchestrator.run("What is 2 + 3?").await.unwrap();

    assert_eq!(state.status, RunStatus::Satisfied);
    assert_eq!(state.stop_reason, Some(StopReason::TextReply));
    assert_eq!(state.turn, 1);

    let roles: Vec<Role> = state.transcript.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
    assert_eq!(state.transcript.messages()[2].content, "5");
    assert!(matches!(
        &state.transcript.messages()[2].kind,
        MessageKind::ToolResult { call_id, is_error: false, .. } if call_id == "c1"
    ));

    let requests = gateway.requests_for("calculator");
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].last_tool_result(), None);
    assert_eq!(requests[1].last_tool_result(), Some("5"));
}

#[tokio::test]
async fn test_tool_errors_are_reported_and_the_turn_continues() {
    let gateway = Arc::new(
        ScriptedGateway::new().with_replies(
            "calculator",
            [
                GatewayResponse::ToolCall(ToolCall::new("c1", "add", json!({"a": "two", "b": 3}))),
                GatewayResponse::ToolCall(ToolCall::new("c2", "teleport", json!({}))),
                GatewayResponse::text("I could not add those."),
            ],
        ),
    );
    let orchestrator = fixed_order_team(
        vec![calculator(&gateway)],
        AnyOf::default().or(TextReplyTermination),
        RunConfig::default(),
    );

    let (tx, mut rx) = event_channel();
    let state = orchestrator
        .run_with_events("add two and 3", &tx, &CancellationToken::new())
        .await
        .unwrap();
    let events = drain(&mut rx);

    assert_eq!(state.status, RunStatus::Satisfied);
    let errors: Vec<_> = state
        .transcript
        .messages()
        .iter()
        .filter(|m| m.is_tool_error())
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[1].content.contains("teleport"));

    let failed_tools: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::ToolFailed { tool, .. } => Some(tool.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(failed_tools, vec!["add", "teleport"]);
    assert_event_sequence(&events);
}

#[tokio::test]
async fn test_too_many_tool_rounds_fail_the_run() {
    let gateway = Arc::new(ScriptedGateway::new().with_default(GatewayResponse::ToolCall(
        ToolCall::new("loop", "add", json!({"a": 1, "b": 1})),
    )));
    let orchestrator = fixed_order_team(
        vec![calculator(&gateway)],
        AnyOf::default().or(TextReplyTermination),
        RunConfig {
            max_tool_rounds: 2,
            ..RunConfig::default()
        },
    );

    let (tx, mut rx) = event_channel();
    let mut state = orchestrator.new_run();
    let err = orchestrator
        .execute(&mut state, "count forever", &tx, &CancellationToken::new())
        .await
        .unwrap_err();
    let events = drain(&mut rx);

    assert!(matches!(
        err,
        EngineError::ToolRoundsExceeded { ref agent, limit: 2 } if agent == "calculator"
    ));
    assert_eq!(state.status, RunStatus::Failed);
    // task, then two executed calls with results, then the rejected call.
    assert_eq!(state.transcript.len(), 6);
    assert!(matches!(events.last(), Some(RunEvent::RunFailed { .. })));
}

#[tokio::test]
async fn test_handoff_to_user_suspends_and_resume_returns_to_the_agent() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_replies(
                "travel_agent",
                [
                    GatewayResponse::handoff("flights_refunder", "Transferring you."),
                    GatewayResponse::text("All set. TERMINATE"),
                ],
            )
            .with_replies(
                "flights_refunder",
                [
                    GatewayResponse::handoff("user", "What is your booking reference?"),
                    GatewayResponse::ToolCall(ToolCall::new(
                        "r1",
                        "refund_flight",
                        json!({"flight_id": "IJI325"}),
                    )),
                    GatewayResponse::handoff("travel_agent", "Refunded."),
                ],
            ),
    );
    let orchestrator = swarm(
        travel_desk(&gateway),
        NoHandoffPolicy::Stay,
        AnyOf::default()
            .or(HandoffToUserTermination)
            .or(KeywordTermination::new("TERMINATE")),
        RunConfig::default(),
    );

    let (tx, mut rx) = event_channel();
    let cancel = CancellationToken::new();
    let mut state = orchestrator.new_run();
    orchestrator
        .execute(&mut state, "I want a refund", &tx, &cancel)
        .await
        .unwrap();
    let first = drain(&mut rx);

    assert_eq!(state.status, RunStatus::AwaitingUser);
    assert_eq!(state.stop_reason, Some(StopReason::HandoffToUser));
    assert_eq!(state.turn, 2);
    assert!(state.finished_at.is_none());
    assert_event_sequence(&first);
    assert!(matches!(
        first.last(),
        Some(RunEvent::RunSuspended { agent, .. }) if agent == "flights_refunder"
    ));

    orchestrator
        .resume(&mut state, "IJI325", &tx, &cancel)
        .await
        .unwrap();
    let second = drain(&mut rx);

    assert_eq!(state.status, RunStatus::Satisfied);
    assert_eq!(state.turn, 4);
    assert_eq!(
        turn_agents(&second),
        vec!["flights_refunder", "travel_agent"]
    );

    let reply = state
        .transcript
        .messages()
        .iter()
        .find(|m| m.role == Role::User && m.is_handoff())
        .unwrap();
    assert_eq!(reply.content, "IJI325");
    assert_eq!(
        reply.target(),
        Some(&HandoffTarget::Agent("flights_refunder".to_string()))
    );

    let refunder_requests = gateway.requests_for("flights_refunder");
    assert_eq!(refunder_requests[1].messages.last().unwrap().content, "IJI325");
    assert_eq!(
        refunder_requests[2].last_tool_result(),
        Some("Flight IJI325 refunded")
    );
}

#[tokio::test]
async fn test_forbidden_handoff_falls_back_to_default_agent() {
    let gateway = Arc::new(
        ScriptedGateway::new()
            .with_reply(
                "travel_agent",
                GatewayResponse::handoff("weekend_planner", "Let me ask our planner."),
            )
            .with_reply("flights_refunder", GatewayResponse::text("Handled. TERMINATE")),
    );
    let mut agents = travel_desk(&gateway);
    agents.push(Agent::new("weekend_planner", gateway.clone()));

    let orchestrator = swarm(
        agents,
        NoHandoffPolicy::Stay,
        AnyOf::default().or(KeywordTermination::new("TERMINATE")),
        RunConfig {
            default_agent: Some("flights_refunder".to_string()),
            ..RunConfig::default()
        },
    );

    let (tx, mut rx) = event_channel();
    let state = orchestrator
        .run_with_events("Plan my weekend", &tx, &CancellationToken::new())
        .await
        .unwrap();
    let events = drain(&mut rx);

    assert_eq!(state.status, RunStatus::Satisfied);
    assert_eq!(turn_agents(&events), vec!["travel_agent", "flights_refunder"]);
    assert!(events.iter().any(|e| matches!(
        e,
        RunEvent::SelectionFallback { requested: Some(r), fallback, .. }
            if r == "weekend_planner" && fallback == "flights_refunder"
    )));
    assert!(gateway.requests_for("weekend_planner").is_empty());
}

#[tokio::test]
async fn test_handoff_to_user_without_suspension_condition_ends_the_run() {
    let gateway = Arc::new(ScriptedGateway::new().with_reply(
        "travel_agent",
        GatewayResponse::handoff("user", "Anything else?"),
    ));
    let orchestrator = swarm(
        travel_desk(&gateway),
        NoHandoffPolicy::Stay,
        AnyOf::default().or(KeywordTermination::new("TERMINATE")),
        RunConfig::default(),
    );

    let state = orchestrator.run("hello").await.unwrap();

    assert_eq!(state.status, RunStatus::Satisfied);
    assert_eq!(state.stop_reason, Some(StopReason::NoNextAgent));
    assert_eq!(state.turn, 1);
}

#[tokio::test]
async fn test_no_handoff_policies() {
    let gateway = Arc::new(ScriptedGateway::new().with_default(GatewayResponse::text("Hmm.")));

    let ended = swarm(
        travel_desk(&gateway),
        NoHandoffPolicy::End,
        AnyOf::default(),
        RunConfig::default(),
    )
    .run("hello")
    .await
    .unwrap();
    assert_eq!(ended.turn, 1);
    assert_eq!(ended.stop_reason, Some(StopReason::NoNextAgent));

    let stayed = swarm(
        travel_desk(&gateway),
        NoHandoffPolicy::Stay,
        AnyOf::default(),
        RunConfig {
            max_iterations: 3,
            ..RunConfig::default()
        },
    )
    .run("hello")
    .await
    .unwrap();
    assert_eq!(stayed.status, RunStatus::CeilingReached);
    assert_eq!(
        stayed.transcript.agent_turn_sources(),
        vec!["travel_agent", "travel_agent", "travel_agent"]
    );
}
