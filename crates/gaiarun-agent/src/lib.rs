//! Agent execution for gaiarun
//!
//! This crate runs the external interpreter agent as a subprocess and
//! collects its newline-delimited JSON messages into a [`Transcript`].
//!
//! # Example
//!
//! ```rust,no_run
//! use gaiarun_agent::{AgentExecutor, InterpreterExecutor};
//! use gaiarun_core::RunConfiguration;
//!
//! async fn run_agent() -> Result<(), Box<dyn std::error::Error>> {
//!     let executor = InterpreterExecutor::new("interpreter");
//!     let settings = RunConfiguration {
//!         auto_run: true,
//!         ..Default::default()
//!     };
//!
//!     let transcript = executor.execute("What is 2 + 2?", &settings).await?;
//!     println!("{} messages", transcript.len());
//!     Ok(())
//! }
//! ```
//!
//! [`Transcript`]: gaiarun_core::Transcript

mod error;
mod executor;
mod types;

// Re-export main types
pub use error::{AgentError, ExecutionFailure};
pub use executor::{AgentExecutor, InterpreterExecutor, API_KEY_ENV};
pub use types::AgentMessage;
