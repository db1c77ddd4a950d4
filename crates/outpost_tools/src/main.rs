//! Outpost - Operator Tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use outpost_core::layout::{self, LayoutStore};
use outpost_tools::validate::{check_exclusion_zones, check_layout, load_data_directory};
use outpost_tools::{DirectoryStore, Result, ToolError};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use ron::ser::PrettyConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "outpost-tools")]
#[command(about = "Operator tools for Outpost structure layouts")]
struct Cli {
    /// Directory holding `layouts/` and `nobuild/`
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect saved layouts
    Layout {
        #[command(subcommand)]
        command: LayoutCommand,
    },
    /// Inspect exclusion zones
    Nobuild {
        #[command(subcommand)]
        command: NobuildCommand,
    },
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "data")]
        path: String,
    },
}

#[derive(Subcommand)]
enum LayoutCommand {
    /// List the layouts of a map
    List {
        /// Map name
        map: String,
    },
    /// Show which layout a map start would pick
    Select {
        /// Map name
        map: String,
        /// Requested layout names
        names: Vec<String>,
        /// Consider every layout when none is requested
        #[arg(long)]
        auto: bool,
        /// Seed for the random pick
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Check a layout file for lines that would be skipped
    Check {
        /// Map name
        map: String,
        /// Layout name
        name: String,
        /// Data directory with archetype overrides
        #[arg(long, default_value = "data")]
        data: String,
        /// Print the full report as RON
        #[arg(long = "ron")]
        as_ron: bool,
    },
}

#[derive(Subcommand)]
enum NobuildCommand {
    /// Print the exclusion zones of a map
    Show {
        /// Map name
        map: String,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = DirectoryStore::new(&cli.root);

    let result = match cli.command {
        Commands::Layout { command } => run_layout(&store, command),
        Commands::Nobuild {
            command: NobuildCommand::Show { map },
        } => show_zones(&store, &map),
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {path}");
            outpost_tools::validate::validate_data_directory(Path::new(&path))
        }
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run_layout(store: &DirectoryStore, command: LayoutCommand) -> Result<()> {
    match command {
        LayoutCommand::List { map } => {
            for name in layout::list_layouts(store, &map)? {
                println!("{name}");
            }
            Ok(())
        }
        LayoutCommand::Select {
            map,
            names,
            auto,
            seed,
        } => {
            let mut request = names.join(" ");
            let mut rng = SmallRng::seed_from_u64(seed);
            let choice = layout::select_layout(store, &map, &mut request, auto, &mut rng)?;
            println!("{choice}");
            Ok(())
        }
        LayoutCommand::Check {
            map,
            name,
            data,
            as_ron,
        } => {
            let (table, _) = load_data_directory(Path::new(&data))?;
            let path = layout::layout_path(&map, &name);
            let Some(source) = store.read(&path)? else {
                return Err(ToolError::Io {
                    path: store.root().join(&path),
                    source: std::io::ErrorKind::NotFound.into(),
                });
            };
            let report = check_layout(&source, &table);
            if as_ron {
                println!("{}", ron::ser::to_string_pretty(&report, PrettyConfig::default())?);
            }
            for problem in &report.problems {
                println!("{path}: {problem}");
            }
            tracing::info!(
                %path,
                records = report.records.len(),
                problems = report.problems.len(),
                "Layout checked"
            );
            if report.is_clean() {
                Ok(())
            } else {
                Err(ToolError::Invalid {
                    path,
                    problems: report.problems.len(),
                })
            }
        }
    }
}

fn show_zones(store: &DirectoryStore, map: &str) -> Result<()> {
    let path = layout::exclusion_path(map);
    if let Some(source) = store.read(&path)? {
        let problems = check_exclusion_zones(&source);
        for problem in &problems {
            println!("{path}: {problem}");
        }
    }
    for zone in layout::load_exclusion_zones(store, map)? {
        println!(
            "origin ({:.1}, {:.1}, {:.1}) radius {:.1} height {:.1}",
            zone.origin.x, zone.origin.y, zone.origin.z, zone.radius, zone.height
        );
    }
    Ok(())
}
