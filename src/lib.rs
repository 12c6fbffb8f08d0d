//! ask - put a question to a chat-completion endpoint from the shell.
//!
//! The question comes from argument words, piped stdin, or both. The answer
//! is printed raw when piped and rendered as markdown on a terminal.

pub mod app;
pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod output;
pub mod prompt;
pub mod protocol;
