//! Run context.
//!
//! [`AppContext`] holds the paths and options of one `superbuild`
//! invocation and drives the pipeline: collect the project, export the
//! tree, write the version ledger.

use std::path::PathBuf;

use anyhow::Context;
use cfgdump::{DumpSettings, ExportReport, FsSink, IdService, dump};
use colored::Colorize;

use crate::{collect::ProjectCollector, options::ExportOptions};

/// Path configuration of a run.
#[derive(Default, Clone)]
pub struct PathConfig {
    /// Project root holding `project.xml`.
    pub project: PathBuf,
    /// Dump output directory.
    pub output: PathBuf,
    /// Explicit options file.
    pub options: Option<PathBuf>,
}

/// State of one `superbuild` run.
#[derive(Default, Clone)]
pub struct AppContext {
    pub paths: PathConfig,
    /// Seed for random identifiers and version tokens; entropy when unset.
    pub seed: Option<u64>,
    /// Options in effect, filled by [`prepare_options`](Self::prepare_options).
    pub options: Option<ExportOptions>,
}

impl AppContext {
    pub fn new(project: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            paths: PathConfig {
                project: project.into(),
                output: output.into(),
                options: None,
            },
            ..Default::default()
        }
    }

    /// Loads the export options for this run.
    pub fn prepare_options(&mut self) -> anyhow::Result<ExportOptions> {
        let options = ExportOptions::discover(self.paths.options.as_deref(), &self.paths.project)?;
        self.options = Some(options.clone());
        Ok(options)
    }

    fn id_service(&self) -> IdService {
        match self.seed {
            Some(seed) => IdService::with_seed(seed),
            None => IdService::new(),
        }
    }

    /// Collects the project and writes the full dump.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be read, the tree is
    /// inconsistent, or an output file cannot be written.
    pub fn run(&mut self) -> anyhow::Result<ExportReport> {
        let options = match &self.options {
            Some(options) => options.clone(),
            None => self.prepare_options()?,
        };
        let settings = DumpSettings::from(options);

        println!(
            "{}",
            format!("Reading project {}", self.paths.project.display())
                .bold()
                .purple()
        );
        let tree = ProjectCollector::new(&self.paths.project).collect()?;

        println!(
            "{}",
            format!("Writing dump to {}", self.paths.output.display())
                .bold()
                .purple()
        );
        let mut sink = FsSink::new(&self.paths.output)
            .with_context(|| format!("cannot create {}", self.paths.output.display()))?;
        let mut ids = self.id_service();
        let report = dump(&tree, &mut ids, &settings, &mut sink)
            .with_context(|| format!("failed to write dump to {}", sink.root().display()))?;

        for warning in &report.warnings {
            println!("{} {warning}", "warning:".yellow().bold());
        }
        println!(
            "{}",
            format!("Done: {} files written", report.files.len())
                .green()
                .bold()
        );
        Ok(report)
    }
}
