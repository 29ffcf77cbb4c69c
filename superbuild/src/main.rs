use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use colored::Colorize;
use log::LevelFilter;
use superbuild::{ctx::AppContext, options::ExportOptions};

#[derive(Parser)]
#[command(name = "superbuild")]
#[command(version)]
#[command(about = "Build an XML configuration dump from a project description")]
struct Cli {
    /// Project root containing project.xml
    #[arg(short, long, required_unless_present = "print_options_schema")]
    project: Option<PathBuf>,

    /// Output directory of the dump
    #[arg(short, long, required_unless_present = "print_options_schema")]
    output: Option<PathBuf>,

    /// Options file (defaults to <project>/.superbuild.toml)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Seed for random identifiers, for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the JSON schema of the options file and exit
    #[arg(long)]
    print_options_schema: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e:#}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.print_options_schema {
        println!("{}", ExportOptions::schema_json()?);
        return Ok(());
    }

    let (Some(project), Some(output)) = (cli.project, cli.output) else {
        anyhow::bail!("both --project and --output are required");
    };

    let mut ctx = AppContext::new(project, output);
    ctx.paths.options = cli.options;
    ctx.seed = cli.seed;
    ctx.run()?;
    Ok(())
}
