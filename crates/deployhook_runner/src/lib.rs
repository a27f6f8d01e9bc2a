//! # deployhook_runner
//!
//! Command execution capability for deployhook.
//!
//! Deployment steps never spawn processes themselves; they go through the
//! [`CommandRunner`] trait so the pipeline can be driven by a real shell in
//! production and by a scripted [`MockRunner`] in tests.
//!
//! # Features
//!
//! - **Shell Runner**: `sh -c` execution pinned to a working directory
//! - **Timeouts**: Optional per-command timeout that kills the child
//! - **Dry-Run Mode**: Log commands without executing them
//! - **Mock Runner**: Substring-matched and sequential scripted responses
//!
//! # Example
//!
//! ```rust,no_run
//! use deployhook_runner::{CommandRunner, ShellConfig, ShellRunner};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = ShellRunner::new(ShellConfig::new().timeout(600));
//!
//!     let output = runner.run("git rev-parse HEAD", Path::new("/srv/app")).await?;
//!     println!("Exit code: {}", output.exit_code);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod runner;
pub mod shell;

pub use config::ShellConfig;
pub use error::{RunnerError, RunnerResult};
pub use mock::{CapturedCall, MockResponse, MockRunner};
pub use runner::{CommandOutput, CommandRunner};
pub use shell::ShellRunner;
