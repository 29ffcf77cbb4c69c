//! Version ledger (`ConfigDumpInfo`).
//!
//! One entry per tree node, keyed by qualified name, in the same pre-order
//! the exporter emits objects. The platform's importer compares
//! `configVersion` values across dumps to decide what changed.

use crate::{
    ids::{IdService, Identifier},
    tree::ConfigTree,
    xml::{Document, Element},
};

/// Namespace declarations of the ledger document.
pub const LEDGER_NAMESPACES: &[(&str, &str)] = &[
    ("xmlns", "http://v8.1c.ru/8.3/xcf/dumpinfo"),
    ("xmlns:xen", "http://v8.1c.ru/8.3/xcf/enums"),
    ("xmlns:xs", "http://www.w3.org/2001/XMLSchema"),
    ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
];

/// A single ledger record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub name: String,
    pub id: Identifier,
    pub config_version: String,
}

/// Change-tracking records for a whole tree.
#[derive(Debug, Clone, Default)]
pub struct VersionLedger {
    entries: Vec<LedgerEntry>,
}

impl VersionLedger {
    /// Walks `tree` and records every node.
    ///
    /// Nodes with an explicit version keep it; the others get a fresh
    /// random token.
    pub fn build(tree: &ConfigTree, ids: &mut IdService) -> Self {
        let entries = tree
            .walk()
            .into_iter()
            .map(|id| {
                let node = tree.node(id);
                let name = node.qualified_name().to_string();
                let config_version = match &node.info().version {
                    Some(v) if !v.is_empty() => v.clone(),
                    _ => ids.fresh_version_token(),
                };
                debug!("ledger: {name} -> {config_version}");
                LedgerEntry {
                    id: ids.identifier_for(&name),
                    name,
                    config_version,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the ledger as a hierarchical-format `ConfigDumpInfo` document.
    pub fn to_document(&self, format_version: &str) -> Document {
        let mut root = Element::new("ConfigDumpInfo");
        for (key, value) in LEDGER_NAMESPACES {
            root.set_attr(*key, *value);
        }
        root.set_attr("format", "Hierarchical");
        root.set_attr("version", format_version);

        let versions = root.append("ConfigVersions");
        for entry in &self.entries {
            versions.push(
                Element::new("Metadata")
                    .with_attr("name", entry.name.as_str())
                    .with_attr("id", entry.id.to_string())
                    .with_attr("configVersion", entry.config_version.as_str()),
            );
        }
        Document::new(root)
    }
}
