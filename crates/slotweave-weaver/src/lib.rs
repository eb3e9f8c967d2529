//! Compile-time dependency-injection weaver.
//!
//! The weaver rewrites compiled [`Module`]s so that values passed to
//! *provider* methods end up in fields of *consumer* objects, with no runtime
//! lookup. It works in two phases:
//!
//! 1. [`scanner`] walks the module and collects provider parameters, wired
//!    fields and after-wiring methods from their marker attributes.
//! 2. [`slots`] ensures one static slot field per (scope, type) pair on a
//!    holder type; [`provider`] prefixes provider methods with stores into
//!    those slots and [`consumer`] prefixes initializers with reads from them.
//!
//! Slot names come from [`namer::slot_name`] on both sides, so a provider and
//! consumer of the same pair always meet at the same field. Running the
//! weaver twice over a module changes nothing the second time.
//!
//! # Runtime model
//!
//! Slots are process-wide static fields written on every provider call,
//! last write wins, with no synchronization. Providers have to run during a
//! single-threaded startup phase before any consumer initializer runs.
//!
//! Scope identity is the marker's short name minus its `Scope` suffix, so
//! unrelated marker types with the same short name share slots.
//!
//! # Example
//!
//! ```no_run
//! use slotweave_weaver::{PostProcessor, Weaver, WeaverConfig};
//! # fn run(module: slotweave_bytecode::Module) -> Result<(), Box<dyn std::error::Error>> {
//! let weaver = Weaver::new(WeaverConfig::default())?;
//! if weaver.will_process(&module) {
//!     let result = weaver.process(module);
//!     for diagnostic in &result.diagnostics {
//!         eprintln!("{}", diagnostic);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Module`]: slotweave_bytecode::Module

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod consumer;
pub mod diagnostic;
pub mod eligibility;
pub mod error;
pub mod namer;
pub mod provider;
pub mod scanner;
pub mod slots;
pub mod weaver;

pub use config::{ConfigError, Markers, WeaverConfig, CONFIG_FILE_NAME};
pub use diagnostic::{Diagnostic, Location, Severity};
pub use eligibility::EligibilityList;
pub use error::WeaveError;
pub use namer::{slot_name, ScopeId};
pub use scanner::{scan, Declarations};
pub use slots::SlotTable;
pub use weaver::{PostProcessor, ProcessResult, WeaveStats, Weaver};
