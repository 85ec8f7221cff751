#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Client for the LLM bridge server
//!
//! The server exposes language models behind a single streaming endpoint,
//! `POST /chat`, that takes one flat prompt and answers with raw text. This
//! crate offers two ways to talk to it:
//!
//! - [`BridgeClient`]: prompt in, text (or a text stream) out
//! - [`BridgeChatClient`]: a [`ChatCompletionClient`] for multi-agent host
//!   frameworks, turning conversation histories into prompts and text back
//!   into completion records

mod adapter;
mod client;
pub mod error;
mod prompt;
mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use adapter::{BridgeChatClient, ChatCompletionClient, ChunkStream, CompletionResult};
pub use client::{BridgeClient, ChatOptions};
pub use error::{BridgeError, ErrorBody, ErrorKind, ErrorRecord, Result};
pub use prompt::extract_prompt;
pub use transport::{ByteStream, HttpTransport, TextStream, Transport};
pub use types::*;
