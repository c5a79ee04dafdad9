//! Locating and launching the Mojo language server and formatter.
//!
//! The protocol client itself belongs to the editor. This crate decides
//! which executable to run, with which environment, and keeps a single
//! server process alive across SDK changes.

pub mod error;
pub mod format;
pub mod launch;
pub mod supervisor;

pub use error::{LspError, LspResult};
pub use format::Formatter;
pub use launch::ServerLaunch;
pub use supervisor::{
    LanguageClientSupervisor, ServerHandle, ServerSpawner, SupervisorOptions, TokioServerSpawner,
};
