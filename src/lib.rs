//! tutor-gateway - Session-based tutoring chat service.
//!
//! Mediates between HTTP clients and an LLM chat-completion endpoint:
//! sessions are created against a pedagogical prompt mode, accumulate a
//! bounded message history, and forward their full history to the model
//! on every turn.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod provider;
pub mod routes;
pub mod session;

pub use config::Config;
pub use error::ApiError;
pub use prompt::{PromptContext, PromptMode};
pub use provider::{
    Completion, CompletionClient, CompletionError, CompletionErrorKind, CompletionOptions,
    OpenAiClient, TokenUsage,
};
pub use routes::{build_router, AppState};
pub use session::{spawn_sweeper, Message, Role, Session, SessionStats, SessionStore};
