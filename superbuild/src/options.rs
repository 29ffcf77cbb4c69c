//! Export options.
//!
//! Options are stored in TOML, by default in `.superbuild.toml` at the
//! project root:
//!
//! ```toml
//! extension = "xml"
//! format_version = "2.18"
//! ledger_file = "ConfigDumpInfo"
//! deterministic_contained_objects = true
//! ```
//!
//! Every key is optional. Unknown keys are rejected.

use std::{fs, path::Path};

use anyhow::Context;
use cfgdump::DumpSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Options file looked up in the project root when none is given.
pub const DEFAULT_OPTIONS_FILE: &str = ".superbuild.toml";

/// How the dump is written.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExportOptions {
    /// File extension of every emitted document, without the dot.
    pub extension: String,
    /// Schema version written on every document and on the ledger.
    pub format_version: String,
    /// File name of the version ledger, without extension.
    pub ledger_file: String,
    /// Derive the configuration's contained-object ids from its name.
    ///
    /// When false, they are random on every run.
    pub deterministic_contained_objects: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        let settings = DumpSettings::default();
        Self {
            extension: settings.extension,
            format_version: settings.format_version,
            ledger_file: settings.ledger_file,
            deterministic_contained_objects: settings.deterministic_contained_objects,
        }
    }
}

impl ExportOptions {
    /// Parses options from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let options: Self = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read options file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid options file {}", path.display()))
    }

    /// Resolves the options for a run.
    ///
    /// An explicit path must exist. Without one, `.superbuild.toml` in the
    /// project root is used if present, defaults otherwise.
    pub fn discover(explicit: Option<&Path>, project_root: &Path) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = project_root.join(DEFAULT_OPTIONS_FILE);
        if path.exists() {
            debug!("using options from {}", path.display());
            Self::load(&path)
        } else {
            debug!("no {DEFAULT_OPTIONS_FILE} in project, using defaults");
            Ok(Self::default())
        }
    }

    /// JSON schema of the options file.
    pub fn schema_json() -> anyhow::Result<String> {
        let schema = schemars::schema_for!(ExportOptions);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let ext = self.extension.as_str();
        if ext.is_empty() || ext.contains(['.', '/', '\\']) {
            bail!("extension `{ext}` must be a bare, non-empty file extension");
        }
        let ledger = self.ledger_file.as_str();
        if ledger.trim().is_empty() {
            bail!("ledger_file must not be empty");
        }
        if ledger.contains(['/', '\\']) || ledger == "." || ledger == ".." {
            bail!("ledger_file `{ledger}` must be a plain file name");
        }
        if ledger.eq_ignore_ascii_case("Configuration") {
            bail!("ledger_file `{ledger}` would overwrite the configuration document");
        }
        Ok(())
    }
}

impl From<ExportOptions> for DumpSettings {
    fn from(options: ExportOptions) -> Self {
        Self {
            extension: options.extension,
            format_version: options.format_version,
            ledger_file: options.ledger_file,
            deterministic_contained_objects: options.deterministic_contained_objects,
        }
    }
}
