//! # cfgdump
//!
//! Object model and XML dump engine for hierarchical business-application
//! configurations.
//!
//! A configuration is built as a [`ConfigTree`](tree::ConfigTree): a root
//! configuration owning languages, catalogs and documents, where catalogs
//! and documents own typed properties and tabular sections. The
//! [`Exporter`](export::Exporter) writes the tree as one XML document per
//! object plus a root `Configuration` document, and
//! [`VersionLedger`](ledger::VersionLedger) records a change-tracking
//! version for every node.
//!
//! ## Modules
//!
//! - [`ids`] - random and name-derived identifiers, version tokens
//! - [`typing`] - data types of properties and columns
//! - [`tree`] - the configuration object tree
//! - [`export`] - document emission and output sinks
//! - [`ledger`] - the `ConfigDumpInfo` version ledger
//! - [`xml`] - element tree, writer and reader
//!
//! ## Example
//!
//! ```rust
//! use cfgdump::{
//!     export::{DumpSettings, MemorySink, dump},
//!     ids::IdService,
//!     tree::{ConfigTree, ConfigurationProps, NodeInfo},
//! };
//!
//! let mut tree = ConfigTree::new(NodeInfo::new("Demo"), ConfigurationProps::default());
//! tree.add_language(NodeInfo::new("English"), "en").unwrap();
//!
//! let mut sink = MemorySink::new();
//! let report = dump(&tree, &mut IdService::new(), &DumpSettings::default(), &mut sink).unwrap();
//! assert!(sink.get("Configuration.xml").is_some());
//! assert!(sink.get("ConfigDumpInfo.xml").is_some());
//! assert_eq!(report.warnings.len(), 1);
//! ```

pub mod error;
pub mod export;
pub mod ids;
pub mod ledger;
pub mod tree;
pub mod typing;
pub mod xml;

#[macro_use]
extern crate log;

pub use error::{Error, Result};
pub use export::{DumpSettings, DumpSink, ExportReport, ExportWarning, Exporter, FsSink, MemorySink, dump};
pub use ids::{IdService, Identifier};
pub use ledger::VersionLedger;
pub use tree::ConfigTree;
pub use typing::TypeDescriptor;
