//! Unified error types surfaced by the runtime API.
//!
//! Engine rejections are not errors here: they come back as
//! [`CommandOutcome::Rejected`](super::CommandOutcome). These variants cover
//! worker coordination and startup.
use thiserror::Error;
use tokio::sync::oneshot;
use vtt_core::{ErrorSeverity, GameError};

use crate::hooks::HookError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("failed to load content: {0}")]
    Content(String),
}

impl GameError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Hook(_) => ErrorSeverity::Internal,
            Self::Content(_) => ErrorSeverity::Validation,
            Self::CommandChannelClosed | Self::ReplyChannelClosed(_) | Self::WorkerJoin(_) => {
                ErrorSeverity::Fatal
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::CommandChannelClosed => "RUNTIME_COMMAND_CHANNEL_CLOSED",
            Self::ReplyChannelClosed(_) => "RUNTIME_REPLY_CHANNEL_CLOSED",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            Self::Hook(_) => "RUNTIME_HOOK_FAILED",
            Self::Content(_) => "RUNTIME_CONTENT",
        }
    }
}
