//! Auxiliary model calls used by judge-directed selection and termination.

use crate::engine::error::EngineError;
use crate::gateway::{GatewayRequest, GatewayResponse, ModelGateway};
use std::sync::Arc;
use tk_protocol::message_models::Message;

/// Default prompt for choosing the next speaker.
pub const DEFAULT_SELECTION_PROMPT: &str = "\
Examine the RESPONSE and choose the participant who should take the next turn.
State only the name of the chosen participant, without explanation.

Choose only from these participants:
{{participants}}

RESPONSE:
{{lastmessage}}";

/// Default prompt for deciding whether the conversation is done.
/// `{{keyword}}` is replaced with the configured satisfaction keyword.
pub const DEFAULT_TERMINATION_PROMPT: &str = "\
Examine the RESPONSE and determine whether the task has been completed satisfactorily.
If so, respond with a single word without explanation: {{keyword}}.
Otherwise respond with: no.

RESPONSE:
{{lastmessage}}";

/// A gateway-backed classifier.
///
/// The rendered prompt becomes the instruction of the request; the
/// (optionally windowed) transcript is sent as conversation.
pub struct Judge {
    name: String,
    gateway: Arc<dyn ModelGateway>,
    model: String,
    prompt: String,
    history_window: Option<usize>,
}

impl Judge {
    pub fn new(
        name: impl Into<String>,
        gateway: Arc<dyn ModelGateway>,
        model: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            gateway,
            model: model.into(),
            prompt: prompt.into(),
            history_window: None,
        }
    }

    /// Only send the most recent `window` messages.
    pub fn with_history_window(mut self, window: Option<usize>) -> Self {
        self.history_window = window;
        self
    }

    /// Substitute `{{keyword}}` in the prompt.
    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.prompt = self.prompt.replace("{{keyword}}", keyword);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the prompt for the given participants and last message.
    pub fn render(&self, participants: &str, last_message: &str) -> String {
        self.prompt
            .replace("{{participants}}", participants)
            .replace("{{lastmessage}}", last_message)
    }

    /// Ask the judge about `messages`.
    ///
    /// Returns the trimmed answer, or `None` when the judge answered with
    /// something other than non-empty text.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Gateway`] if the gateway call fails.
    pub async fn ask(
        &self,
        messages: &[Message],
        participants: &str,
    ) -> Result<Option<String>, EngineError> {
        let last_message = messages
            .iter()
            .rev()
            .find(|m| m.ends_turn())
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let window = match self.history_window {
            Some(n) if n < messages.len() => &messages[messages.len() - n..],
            _ => messages,
        };

        let request = GatewayRequest {
            agent: self.name.clone(),
            model: self.model.clone(),
            instruction: self.render(participants, last_message),
            messages: window.to_vec(),
            tools: Vec::new(),
            handoffs: Vec::new(),
        };

        let response = self
            .gateway
            .complete(&request)
            .await
            .map_err(|e| EngineError::gateway(&self.name, e))?;

        Ok(match response {
            GatewayResponse::Text(answer) if !answer.trim().is_empty() => {
                Some(answer.trim().to_string())
            }
            _ => None,
        })
    }
}
