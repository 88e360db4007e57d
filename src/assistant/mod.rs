//! Assistant Collaborator
//!
//! External question-answering service consumed by the chat path.
//! The core never depends on it being up: replies degrade to canned
//! guidance when the upstream is missing.

mod client;

pub use client::{fallback_reply, AssistantClient, AssistantConfig, AssistantError};
