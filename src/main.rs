//! EventFlow CLI Entry Point
//!
//! Loads a definition file, registers the built-in `core` integration and
//! fires an event or triggers a workflow.
//!
//! # Usage
//!
//! ```bash
//! # List events and workflows
//! eventflow definitions.yaml --list
//!
//! # Fire an event with a JSON payload
//! eventflow definitions.yaml --event ticket.created --data '{"owner":"alice"}'
//!
//! # Run one workflow directly
//! eventflow definitions.yaml --workflow greet --data '{"owner":"alice"}'
//! ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use log::{error, info};

use eventflow::events::handler;
use eventflow::integration::builtin::core_integration;
use eventflow::{EngineConfig, Manager, Payload, WorkflowResult};
use eventflow::{APP_NAME, VERSION};

/// Default definition file used when none is specified.
const DEFAULT_DEFINITIONS: &str = "definitions.yaml";

/// What the CLI was asked to do.
#[derive(Debug, PartialEq)]
enum Target {
    List,
    Event(String),
    Workflow(String),
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    definitions_path: String,
    target: Target,
    data: Option<String>,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            definitions_path: DEFAULT_DEFINITIONS.to_string(),
            target: Target::List,
            data: None,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Event-Driven Automation Engine");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: eventflow [OPTIONS] <DEFINITIONS_FILE>");
    println!();
    println!("Arguments:");
    println!("  <DEFINITIONS_FILE>  Path to the events/workflows YAML file");
    println!();
    println!("Options:");
    println!("  --list              List events and workflows (default)");
    println!("  --event ID          Fire an event");
    println!("  --workflow ID       Run a single workflow directly");
    println!("  --data JSON         Trigger payload (a JSON object)");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  eventflow definitions.yaml --list");
    println!("  eventflow definitions.yaml --event ticket.created --data '{{\"owner\":\"alice\"}}'");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_seen = false;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--list" => {
                config.target = Target::List;
            }
            "--event" | "--workflow" | "--data" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("{} requires an argument", arg))?
                    .clone();
                match arg.as_str() {
                    "--event" => config.target = Target::Event(value),
                    "--workflow" => config.target = Target::Workflow(value),
                    _ => config.data = Some(value),
                }
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if positional_seen {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.definitions_path = arg.clone();
                positional_seen = true;
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Parses the `--data` argument into a payload.
fn parse_payload(data: Option<&str>) -> Result<Option<Payload>, String> {
    let Some(text) = data else {
        return Ok(None);
    };
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err("--data must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid --data JSON: {}", e)),
    }
}

/// Prints events and workflows.
fn print_listing(manager: &Manager) {
    println!("{}", "Events:".bold());
    for id in manager.event_ids() {
        println!("  {}", id);
    }
    println!();
    println!("{}", "Workflows:".bold());
    for id in manager.workflow_ids() {
        if let Some(workflow) = manager.workflow(&id) {
            println!(
                "  {} ({} steps, on '{}')",
                workflow.display_name(),
                workflow.len(),
                workflow.trigger_event()
            );
        }
    }
}

/// Prints one completed run.
fn print_results(workflow: &str, results: &[WorkflowResult]) {
    println!();
    println!("{} {}", "completed".green().bold(), workflow);
    for result in results {
        let output = serde_json::to_string(&result.output).unwrap_or_default();
        println!("  {:20} {}", result.step.cyan(), output);
    }
}

/// Prints every completed run of every registered workflow.
fn subscribe_printers(manager: &Manager) {
    for id in manager.workflow_ids() {
        let Some(workflow) = manager.workflow(&id) else {
            continue;
        };
        let name = Arc::new(workflow.display_name().to_string());
        workflow.on_workflow_run().add(handler(move |results: Vec<WorkflowResult>| {
            let name = Arc::clone(&name);
            async move {
                print_results(&name, &results);
                Ok(())
            }
        }));
    }
}

/// Main application entry point.
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let payload = parse_payload(config.data.as_deref())?;

    // Load definitions
    let definitions = EngineConfig::load(&config.definitions_path).map_err(|e| {
        error!("Failed to load definitions: {}", e);
        format!(
            "Could not load definitions from '{}': {}",
            config.definitions_path, e
        )
    })?;

    let manager = definitions.build([core_integration()])?;
    info!(
        "Definitions loaded: {} events, {} workflows",
        manager.event_ids().len(),
        manager.workflow_ids().len()
    );

    match config.target {
        Target::List => print_listing(&manager),
        Target::Event(id) => {
            subscribe_printers(&manager);
            info!("Firing event: {}", id);
            manager.trigger_event(&id, payload).await?;
        }
        Target::Workflow(id) => {
            info!("Triggering workflow: {}", id);
            match manager.trigger_workflow(&id, payload).await? {
                Some(results) => print_results(&id, &results),
                None => return Err(format!("There is no workflow with ID: {}", id).into()),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("eventflow")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse_arguments(&args(&[])).unwrap();
        assert_eq!(config.definitions_path, DEFAULT_DEFINITIONS);
        assert_eq!(config.target, Target::List);
        assert!(!config.verbose);
    }

    #[test]
    fn test_parse_event_with_data() {
        let config = parse_arguments(&args(&[
            "defs.yaml",
            "--event",
            "ticket.created",
            "--data",
            "{\"owner\":\"alice\"}",
            "-v",
        ]))
        .unwrap();

        assert_eq!(config.definitions_path, "defs.yaml");
        assert_eq!(config.target, Target::Event("ticket.created".to_string()));
        assert_eq!(config.data.as_deref(), Some("{\"owner\":\"alice\"}"));
        assert!(config.verbose);
    }

    #[test]
    fn test_parse_missing_value() {
        assert!(parse_arguments(&args(&["defs.yaml", "--workflow"])).is_err());
    }

    #[test]
    fn test_parse_unknown_option() {
        assert!(parse_arguments(&args(&["--bogus"])).is_err());
    }

    #[test]
    fn test_parse_extra_positional() {
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(None).unwrap(), None);
        let payload = parse_payload(Some("{\"a\":1}")).unwrap().unwrap();
        assert_eq!(payload["a"], serde_json::json!(1));
        assert!(parse_payload(Some("[1]")).is_err());
        assert!(parse_payload(Some("{")).is_err());
    }
}
