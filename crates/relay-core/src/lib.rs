pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod types;

pub use error::{RelayError, Result};
