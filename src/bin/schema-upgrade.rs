//! schema-upgrade: bring a re-introspected schema in line with its legacy datamodel
//!
//! # Usage
//!
//! ```bash
//! # Print the corrected schema and the SQL to run
//! schema-upgrade datamodel.graphql schema.prisma
//!
//! # Write the corrected schema back, report as JSON
//! schema-upgrade datamodel.graphql schema.prisma -o schema.prisma -f json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use serde::Serialize;
use tracing::Level;

use schema_upgrade::prelude::*;

#[derive(Parser)]
#[command(name = "schema-upgrade")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reconcile a legacy datamodel with its re-introspected schema", long_about = None)]
#[command(after_help = "EXAMPLES:
    schema-upgrade datamodel.graphql schema.prisma
    schema-upgrade -C app datamodel.graphql schema.prisma -o schema.prisma
    schema-upgrade datamodel.graphql schema.prisma --format json --no-breaking")]
struct Cli {
    /// Legacy datamodel
    legacy: PathBuf,

    /// Re-introspected target schema
    target: PathBuf,

    /// Resolve paths relative to this directory
    #[arg(short = 'C', long = "chdir")]
    chdir: Option<PathBuf>,

    /// Database connection URL, used to name the Postgres schema
    #[arg(long, env = "SCHEMA_UPGRADE_DATABASE_URL")]
    url: Option<String>,

    /// Write the corrected schema here instead of printing it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Leave breaking operations out of the report
    #[arg(long)]
    no_breaking: bool,

    /// Configuration file (default: ./schema-upgrade.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Flags merged over the configuration file.
struct Settings {
    url: Option<String>,
    format: Format,
    breaking: bool,
}

impl Settings {
    fn resolve(cli: &Cli, config: Config) -> Self {
        Self {
            url: cli.url.clone().or(config.database.url),
            format: cli.format.or(config.output.format).unwrap_or_default(),
            breaking: !cli.no_breaking && config.output.breaking.unwrap_or(true),
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    provider: Provider,
    schema: String,
    warnings: &'a [Warning],
    safe: Vec<Statement<'a>>,
    breaking: Vec<Statement<'a>>,
    id: Vec<Statement<'a>>,
}

#[derive(Serialize)]
struct Statement<'a> {
    operation: &'a Operation,
    sql: String,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let base = cli.chdir.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = match &cli.config {
        Some(path) => Config::load(&base.join(path))?,
        None => Config::discover(&base)?,
    };
    let settings = Settings::resolve(cli, config);

    let legacy_path = base.join(&cli.legacy);
    let target_path = base.join(&cli.target);
    let legacy = legacy::parse(&read(&legacy_path)?)
        .with_context(|| format!("failed to parse {}", legacy_path.display()))?;
    let target = target::parse(&read(&target_path)?)
        .with_context(|| format!("failed to parse {}", target_path.display()))?;

    let mut input = Input::new(&legacy, &target);
    if let Some(url) = &settings.url {
        input = input.with_url(url);
    }
    let output = upgrade(input).context("upgrade failed")?;

    // One translator for the run: enum types are created once across lists.
    let mut translator = Translator::new(output.provider);
    let safe = statements(&mut translator, &output.safe_ops)?;
    let id = statements(&mut translator, &output.id_ops)?;
    let breaking = if settings.breaking {
        statements(&mut translator, &output.breaking_ops)?
    } else {
        Vec::new()
    };
    let schema = output.schema.to_string();

    if let Some(path) = &cli.output {
        let path = base.join(path);
        fs::write(&path, &schema).with_context(|| format!("failed to write {}", path.display()))?;
    }

    match settings.format {
        Format::Json => {
            let report = Report {
                provider: output.provider,
                schema,
                warnings: &output.warnings,
                safe: to_statements(safe),
                breaking: to_statements(breaking),
                id: to_statements(id),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Format::Text => {
            if cli.output.is_none() {
                println!("{}", schema);
            }
            print_text(&output.warnings, &safe, &breaking, &id);
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Pair each operation with its SQL.
fn statements<'a>(
    translator: &mut Translator,
    ops: &'a [Operation],
) -> Result<Vec<(&'a Operation, String)>> {
    let sql = translator.translate(ops)?;
    Ok(ops.iter().zip(sql).collect())
}

fn to_statements(pairs: Vec<(&Operation, String)>) -> Vec<Statement<'_>> {
    pairs
        .into_iter()
        .map(|(operation, sql)| Statement { operation, sql })
        .collect()
}

fn print_text(
    warnings: &[Warning],
    safe: &[(&Operation, String)],
    breaking: &[(&Operation, String)],
    id: &[(&Operation, String)],
) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    if safe.is_empty() && breaking.is_empty() && id.is_empty() {
        println!("{}", "-- Nothing to run, the database is up to date.".green());
        return;
    }
    if !safe.is_empty() {
        println!("{}", "-- Safe changes".green().bold());
        for (_, sql) in safe {
            println!("{}", sql.green());
        }
    }
    if !id.is_empty() {
        println!("{}", "-- Widen id columns".green().bold());
        for (_, sql) in id {
            println!("{}", sql.green());
        }
    }
    if !breaking.is_empty() {
        println!("{}", "-- Breaking changes, back up your data first".red().bold());
        for (op, sql) in breaking {
            println!("{} {}", "--".dimmed(), op.name().dimmed());
            println!("{}", sql.red());
        }
    }
}
