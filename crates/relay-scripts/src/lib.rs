//! Serialized execution of messaging-app automation scripts.
//!
//! The messaging app is a single stateful GUI program. Only one script may
//! drive it at a time, so every action goes through one FIFO queue.
//!
//! # Architecture
//!
//! ```text
//! ActionRequest
//!     │  validate arity / argument types
//!     ▼
//! ExecutionQueue  ← FIFO, single-flight; Ticket releases on drop
//!     │
//!     ▼
//! AppSupervisor   ← Helpers script: launch (1) / force-quit (2)
//!     │
//!     ▼
//! ScriptProcess   ← `<interpreter> <script> <args…>`, keep last stdout line
//!     │
//!     ▼
//! decode          ← "0, 3" → ExecutionResult; UnknownError / UiError
//!                   trigger a force-quit and delayed relaunch
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use relay_core::config::RelayConfig;
//! use relay_scripts::ScriptExecutor;
//!
//! let executor = ScriptExecutor::new(parent, RelayConfig::load_or_default(parent)?)?;
//! let result = executor.send_message("+15551234567", None, "Hello").await?;
//! assert!(result.is_success());
//! ```

pub mod decode;
pub mod error;
pub mod executor;
pub mod queue;
pub mod registry;
pub mod request;
pub mod supervisor;
pub mod workspace;

pub(crate) mod process;

#[cfg(test)]
mod tests;

pub use decode::{decode, decode_bare, ExecutionResult, UtilityOutcome};
pub use error::{ActionError, QueueError};
pub use executor::ScriptExecutor;
pub use queue::{ExecutionQueue, Ticket, TicketId};
pub use registry::ScriptRegistry;
pub use request::{ActionRequest, ChatMetadata};
pub use supervisor::AppSupervisor;
pub use workspace::TempWorkspace;
