//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::services::RunAborted;
use crate::application::{ApplicationError, RunSummary};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{BuildStats, ForestBuilder, Level, NodeView, OrgForest, RunMode};
use crate::infrastructure::csv_source::read_records;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::path::expand_path;

/// Flags of the `sync` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub simulation: bool,
    pub debug: bool,
    pub print_structure: bool,
    pub json: bool,
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let config = cli.config.as_deref().map(expand_path);
    match &cli.command {
        Some(Commands::Sync {
            csv,
            simulation,
            debug,
            print_structure,
            json,
        }) => {
            let options = SyncOptions {
                simulation: *simulation,
                debug: *debug,
                print_structure: *print_structure,
                json: *json,
            };
            cmd_sync(config.as_deref(), csv, options)
        }
        Some(Commands::Tree { csv }) => cmd_tree(config.as_deref(), csv),
        Some(Commands::Config { command }) => cmd_config(config.as_deref(), command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `orgsync --help`".to_string(),
        )),
    }
}

/// Read the export and build the forest.
fn load_forest(settings: &Settings, csv: &Path) -> CliResult<(OrgForest, BuildStats)> {
    let csv = expand_path(csv);
    let records = read_records(&csv, settings.csv.delimiter)?;
    let (forest, stats) = ForestBuilder::build(records).map_err(ApplicationError::from)?;
    debug!(
        "built {} nodes from {} records ({} without leaf)",
        forest.len(),
        stats.records,
        stats.records_without_leaf
    );
    Ok((forest, stats))
}

#[instrument(skip(options), fields(simulation = options.simulation))]
fn cmd_sync(config: Option<&Path>, csv: &Path, options: SyncOptions) -> CliResult<()> {
    let settings = Settings::load(config)?;
    settings.validate_registry()?;

    let (mut forest, _) = load_forest(&settings, csv)?;
    let mode = RunMode {
        simulation: options.simulation,
    };

    let container = ServiceContainer::new(settings, options.debug);
    match container.reconcile().run(&mut forest, mode) {
        Ok(summary) => {
            report(&forest, &summary, options)?;
            Ok(())
        }
        Err(RunAborted { error, summary }) => {
            report(&forest, &summary, options)?;
            Err(error.into())
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    structure: Option<Vec<NodeView>>,
}

fn report(forest: &OrgForest, summary: &RunSummary, options: SyncOptions) -> CliResult<()> {
    if options.json {
        let report = JsonReport {
            summary,
            structure: options.print_structure.then(|| forest.structure()),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::Usage(format!("cannot serialize report: {e}")))?;
        output::info(&json);
        return Ok(());
    }

    if options.print_structure {
        output::header("Structure");
        for tree in forest.to_tree_strings() {
            output::info(&tree);
        }
        for node in forest.structure() {
            output::detail(&format_node(&node));
        }
        println!();
    }

    output::header(if summary.simulation {
        "Summary (simulation)"
    } else {
        "Summary"
    });
    output::info(summary);
    if summary.is_clean() {
        output::success("all nodes resolved");
    } else {
        for issue in &summary.issues {
            output::issue(issue);
        }
    }
    Ok(())
}

fn format_node(node: &NodeView) -> String {
    let id = |value: Option<i64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    format!(
        "{} [{}] id={} parent={} prev={} next={}",
        node.description,
        node.level,
        id(node.id),
        id(node.parent_id),
        id(node.previous_sibling_id),
        id(node.next_sibling_id)
    )
}

#[instrument]
fn cmd_tree(config: Option<&Path>, csv: &Path) -> CliResult<()> {
    let settings = Settings::load(config)?;
    let (forest, stats) = load_forest(&settings, csv)?;

    for tree in forest.to_tree_strings() {
        output::info(&tree);
    }
    output::header("Nodes per level");
    for level in Level::ALL {
        output::detail(&format!("{:<10} {}", level, stats.nodes_per_level[level.depth()]));
    }
    if stats.records_without_leaf > 0 {
        output::warning(&format!(
            "{} records have no {} entry",
            stats.records_without_leaf,
            Level::Bsu
        ));
    }
    Ok(())
}

fn cmd_config(config: Option<&Path>, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(config)?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(no config directory)".to_string());
            output::action("global", &global);
            if let Some(path) = config {
                output::action("file", &path.display());
            }
            output::action("env", &"ORGSYNC_* (e.g. ORGSYNC_REGISTRY__CLIENT_SECRET)");
            Ok(())
        }
        ConfigCommands::Init { force } => {
            let path = match config {
                Some(path) => path.to_path_buf(),
                None => global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine config directory".to_string())
                })?,
            };
            init_config(&path, *force)
        }
    }
}

fn init_config(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::Usage(format!(
            "config already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| InfraError::io(format!("create {}", dir.display()), e))?;
    }
    std::fs::write(path, Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::success(&format!("created {}", path.display()));
    Ok(())
}
