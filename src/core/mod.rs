pub mod config;
pub mod context;
pub mod drift;
pub mod environment;
pub mod error;
pub mod executor;
pub mod guard;
pub mod pipeline;
pub mod prompt;
pub mod settings;
pub mod ssh;
pub mod workflows;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
