//! Integration with the external `quarto` command line tool
//!
//! Long-running preview servers are tracked per project directory by the
//! [`Runner`]; render and create are one-shot subprocesses awaited to
//! completion.

pub mod invocation;
pub mod ready;
pub mod runner;

pub use invocation::{Engine, ProjectType, WHOLE_PROJECT};
pub use runner::{OneShotKind, Runner, RunnerEvent};

/// Binary used when no path is configured
pub const DEFAULT_BINARY: &str = "quarto";

/// Errors raised while driving a quarto subprocess
#[derive(Debug, thiserror::Error)]
pub enum QuartoError {
    #[error("failed to spawn `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Exited with code {code}")]
    Exit { code: i32 },

    #[error("terminated by a signal before exiting")]
    Signalled,

    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),
}

impl QuartoError {
    /// Exit code carried by a non-zero exit failure
    #[allow(dead_code)]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            QuartoError::Exit { code } => Some(*code),
            _ => None,
        }
    }
}
