//! Top-level error type for one `ask` invocation.

use crate::chat::ChatError;
use crate::config::ConfigError;
use crate::input::InputError;
use thiserror::Error;

/// Every way a run can fail. Each is reported once and ends the process.
#[derive(Debug, Error)]
pub enum AskError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

impl AskError {
    /// Whether the usage text should be shown instead of an error line.
    pub fn is_usage(&self) -> bool {
        matches!(self, AskError::Input(InputError::Usage))
    }

    /// Whether stdout was closed by the reader (`ask ... | head`). Not a
    /// failure of the run.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, AskError::Output(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
    }
}
