//! Error taxonomy shared by every muxkit backend.

use thiserror::Error;

use crate::exec::CommandOutput;

#[derive(Debug, Error)]
pub enum MuxError {
    /// Rejected before any subprocess was spawned.
    #[error("{0}")]
    Validation(String),

    /// The multiplexer binary exited nonzero with output that is not a
    /// recognized "nothing running" condition.
    #[error("{tool} {action}: {output}")]
    Tool {
        tool: String,
        action: String,
        code: Option<i32>,
        output: String,
    },

    /// Backend B replied with malformed JSON or `ok: false`.
    #[error("{0}")]
    Protocol(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0} not found in PATH")]
    BinaryNotFound(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MuxError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a failed invocation, keeping the tool's own diagnostic text.
    pub fn tool(tool: &str, action: &str, output: &CommandOutput) -> Self {
        let mut text = output.combined();
        if text.is_empty() {
            text = match output.code {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            };
        }
        Self::Tool {
            tool: tool.to_string(),
            action: action.to_string(),
            code: output.code,
            output: text,
        }
    }

    /// Exit code of a wrapped tool failure, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Tool { code, .. } => *code,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MuxError>;
