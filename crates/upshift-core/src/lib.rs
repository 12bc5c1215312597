//! Core library for upshift.
//!
//! upshift computes the next semantic version of a repository from its
//! conventional-commit history and drives a release workflow around it.
//!
//! # Modules
//!
//! - [`version`] - Version model, commit classification and next-version calculation
//! - [`task`] - The task abstraction and pipeline executor
//! - [`workflow`] - Task sequences for each operation
//! - [`context`] - Shared state for one run
//! - [`git`] - Git access behind the [`git::Repository`] trait
//! - [`hooks`] - Hook execution behind the [`hooks::HookExecutor`] trait
//! - [`bump`] - In-file version replacement
//! - [`changelog`] - Changelog rendering
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//!
//! # Quick Start
//!
//! ```no_run
//! use upshift_core::context::{Context, ContextInit, RunOptions};
//! use upshift_core::git::GitCli;
//! use upshift_core::hooks::ShellExecutor;
//! use upshift_core::workflow::{self, Operation};
//! use upshift_core::ConfigLoader;
//!
//! let root = camino::Utf8PathBuf::from(".");
//! let config = ConfigLoader::new()
//!     .with_project_search(&root)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let mut ctx = Context::new(ContextInit {
//!     repo: Box::new(GitCli::new(&root)),
//!     hooks: Box::new(ShellExecutor::new(&root)),
//!     root,
//!     config,
//!     options: RunOptions::default(),
//! })
//! .expect("invalid options");
//!
//! workflow::run(Operation::Next, &mut ctx, &mut |_| {}).expect("pipeline failed");
//! println!("{:?}", ctx.next_tag());
//! ```
#![deny(unsafe_code)]

pub mod bump;

pub mod changelog;

pub mod config;

pub mod context;

pub mod error;

pub mod git;

pub mod hooks;

pub mod task;

pub mod version;

pub mod workflow;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationResult};

pub use version::{Increment, PrereleaseMode, Version};
