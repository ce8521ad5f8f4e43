use relay_core::types::ActionKind;
use relay_core::RelayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid arguments for {kind}: {reason}")]
    InvalidArguments { kind: ActionKind, reason: String },

    #[error("script {0} does not exist in the scripts folder")]
    ScriptNotFound(String),

    #[error("failed to spawn script {script}: {source}")]
    ProcessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid status code in script output: {0:?}")]
    InvalidStatusCode(String),

    #[error("executor has been shut down")]
    ShutDown,

    #[error("action task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("execution queue closed while waiting")]
    Closed,

    #[error("timed out waiting for the execution queue")]
    Timeout,
}
