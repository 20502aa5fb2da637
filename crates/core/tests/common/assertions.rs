//! Assertion helpers over the events of a run.

#![allow(dead_code)]

use tk_protocol::events::RunEvent;
use tk_protocol::run_models::RunStatus;

/// Assert the basic shape of one run segment: started first, a final event last.
pub fn assert_event_sequence(events: &[RunEvent]) {
    assert!(!events.is_empty(), "Event sequence is empty");

    assert!(
        matches!(events[0], RunEvent::RunStarted { .. }),
        "First event should be RunStarted, got: {:?}",
        events[0]
    );

    let last = events.last().unwrap();
    assert!(last.is_final(), "Last event should be final, got: {last:?}");
    assert_eq!(
        events.iter().filter(|e| e.is_final()).count(),
        1,
        "Exactly one final event expected in {events:?}"
    );
}

/// Status reported by the `RunFinished` event, if any.
pub fn finished_status(events: &[RunEvent]) -> Option<RunStatus> {
    events.iter().find_map(|e| match e {
        RunEvent::RunFinished { status, .. } => Some(*status),
        _ => None,
    })
}

/// Agents in the order their turns started.
pub fn turn_agents(events: &[RunEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::TurnStarted { agent, .. } => Some(agent.clone()),
            _ => None,
        })
        .collect()
}

/// Transcript indices reported by `MessageAppended`, in emission order.
pub fn appended_indices(events: &[RunEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::MessageAppended { index, .. } => Some(*index),
            _ => None,
        })
        .collect()
}

pub fn count_fallbacks(events: &[RunEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, RunEvent::SelectionFallback { .. }))
        .count()
}
