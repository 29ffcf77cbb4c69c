//! # superbuild
//!
//! Turns a declarative project description into an XML configuration dump.
//!
//! ## Modules
//!
//! - [`collect`] - reads `project.xml` and its includes into a tree
//! - [`options`] - export options file
//! - [`ctx`] - run context driving the pipeline
//!
//! ## Example
//!
//! ```rust,no_run
//! use superbuild::ctx::AppContext;
//!
//! let mut ctx = AppContext::new("./project", "./dump");
//! let report = ctx.run().unwrap();
//! println!("{} files", report.files.len());
//! ```

/// Reading the declarative project.
pub mod collect;

/// Run context and pipeline.
pub mod ctx;

/// Export options loaded from TOML.
pub mod options;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;
