use clap::{Parser, Subcommand};
use color_eyre::Result;
use env_logger::Env;
use labgen::error::GenerateError;
use labgen::orchestrator::{self, GenerateOptions, DEFAULT_CONFIG_PATH, DEFAULT_OUTPUT_DIR};
use log::{error, info};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Topology generator for containerised BGP attack labs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a lab configuration and generate its artifacts
    Generate {
        /// Path to the lab configuration YAML file
        #[arg(default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Directory receiving docker-compose.yml, frr/ and the metadata
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Only validate the configuration
        #[arg(long)]
        validate_only: bool,

        /// Overwrite a non-empty output directory
        #[arg(long)]
        force: bool,

        /// Also write topology-metadata.json to this path (repeatable)
        #[arg(long = "metadata-target", value_name = "PATH")]
        metadata_targets: Vec<PathBuf>,
    },

    /// List the attack scenarios a configuration registers
    Scenarios {
        /// Path to the lab configuration YAML file
        #[arg(default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct ScenarioEntry<'a> {
    entrypoint: &'a str,
    description: &'a str,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let code = match args.command {
        Command::Generate {
            config,
            output_dir,
            validate_only,
            force,
            metadata_targets,
        } => {
            let options = GenerateOptions {
                output_dir,
                validate_only,
                force,
                metadata_targets,
            };
            run_generate(config, &options)
        }
        Command::Scenarios { config, json } => run_scenarios(config, json)?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn run_generate(config: PathBuf, options: &GenerateOptions) -> i32 {
    info!("Configuration file: {:?}", config);

    let report = match orchestrator::generate(&config, options) {
        Ok(report) => report,
        Err(err) => return report_failure(&err),
    };

    if !report.warnings.is_empty() {
        info!("Completed with {} warning(s)", report.warnings.len());
    }

    match report.written {
        Some(summary) => {
            println!(
                "Generated {} files in {}",
                summary.files.len(),
                summary.output_dir.display()
            );
            for file in &summary.files {
                println!("  {}", file.display());
            }
            for copy in &summary.metadata_copies {
                println!("  metadata copy: {}", copy.display());
            }
        }
        None => {
            let topology = &report.topology;
            println!(
                "{} is valid: {} routers, {} links, {} scenarios",
                config.display(),
                topology.routers.len(),
                topology.links.len(),
                topology.scenarios.len()
            );
        }
    }
    0
}

fn run_scenarios(config: PathBuf, json: bool) -> Result<i32> {
    let (topology, _) = match orchestrator::load_and_validate(&config) {
        Ok(loaded) => loaded,
        Err(err) => return Ok(report_failure(&err)),
    };

    if json {
        let entries: BTreeMap<&str, ScenarioEntry> = topology
            .scenarios
            .iter()
            .map(|scenario| {
                (
                    scenario.key.as_str(),
                    ScenarioEntry {
                        entrypoint: scenario.kind.entrypoint(),
                        description: scenario.description.as_str(),
                    },
                )
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for scenario in topology.scenarios.iter() {
            println!(
                "{:<16} {:<14} {}",
                scenario.key,
                scenario.kind.entrypoint(),
                scenario.description
            );
        }
    }
    Ok(0)
}

/// Print every diagnostic of a failed run and pick the exit code.
fn report_failure(err: &GenerateError) -> i32 {
    error!("{}", err);
    for diagnostic in err.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    err.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let args = Args::parse_from(["labgen", "generate"]);
        match args.command {
            Command::Generate {
                config,
                output_dir,
                validate_only,
                force,
                metadata_targets,
            } => {
                assert_eq!(config, PathBuf::from("lab_config.yaml"));
                assert_eq!(output_dir, PathBuf::from("generated_lab"));
                assert!(!validate_only);
                assert!(!force);
                assert!(metadata_targets.is_empty());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_generate_flags() {
        let args = Args::parse_from([
            "labgen",
            "generate",
            "labs/hijack.yaml",
            "--output-dir",
            "out",
            "--validate-only",
            "--force",
            "--metadata-target",
            "dashboard/topology.json",
            "--metadata-target",
            "lab_config.meta.json",
        ]);
        match args.command {
            Command::Generate {
                config,
                output_dir,
                validate_only,
                force,
                metadata_targets,
            } => {
                assert_eq!(config, PathBuf::from("labs/hijack.yaml"));
                assert_eq!(output_dir, PathBuf::from("out"));
                assert!(validate_only);
                assert!(force);
                assert_eq!(metadata_targets.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_scenarios_command() {
        let args = Args::parse_from(["labgen", "scenarios", "lab.yaml", "--json"]);
        match args.command {
            Command::Scenarios { config, json } => {
                assert_eq!(config, PathBuf::from("lab.yaml"));
                assert!(json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Args::try_parse_from(["labgen"]).is_err());
    }
}
