//! Error types for the dump engine.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout `cfgdump`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a configuration tree or writing a dump.
///
/// Recoverable conditions (unknown type tokens, a missing default language)
/// are not represented here; they are logged and reported as warnings.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem access failed for the given path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rendering a document into its textual form failed.
    #[error("failed to render document: {0}")]
    Render(#[source] std::io::Error),

    /// The XML reader rejected its input.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be decoded.
    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Input was well-formed XML but not a usable document.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Two children of one owner share a local name.
    #[error("`{owner}` already has a child named `{name}`")]
    DuplicateName { owner: String, name: String },

    /// A node would reuse a qualified name already present in the tree.
    #[error("qualified name `{0}` is already in use")]
    DuplicateQualifiedName(String),

    /// A node kind was attached under a parent that cannot own it.
    #[error("`{child}` cannot be attached to `{parent}`")]
    UnexpectedParent { child: String, parent: String },

    /// A name cannot be used as the stem of a single file.
    #[error("`{0}` is not a valid file name")]
    InvalidFileName(String),

    /// Two documents of one dump map to the same file.
    #[error("{} would be written twice", .0.display())]
    PathCollision(PathBuf),
}

impl Error {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
