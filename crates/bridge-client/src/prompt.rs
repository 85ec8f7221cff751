use crate::error::{BridgeError, Result};
use crate::types::{Message, Role};

/// Pick the prompt sent upstream from a conversation history
///
/// The bridge server takes a single flat prompt, so only the most recent
/// user message is used. System and assistant turns are dropped, and so
/// are earlier user turns.
///
/// # Errors
///
/// Returns `InvalidRequest` if the history is empty, has no user message,
/// or the most recent user message is empty
pub fn extract_prompt(history: &[Message]) -> Result<&str> {
    if history.is_empty() {
        return Err(BridgeError::InvalidRequest(
            "messages are required for chat completion".to_owned(),
        ));
    }

    history
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .map(|message| message.content.as_str())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| {
            BridgeError::InvalidRequest("no user message found in the conversation to use as a prompt".to_owned())
        })
}
