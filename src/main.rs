//! CloudCAFE CLI Entry Point
//!
//! Validates a captured stream of compute notifications against an
//! instance lifecycle operation.
//!
//! # Usage
//!
//! ```bash
//! # Check that an instance was created cleanly
//! cloudcafe notifications.json --instance-id 4f1c...
//!
//! # Check a delete, comparing sizing with a flavor body
//! cloudcafe notifications.json --instance-id 4f1c... --action delete --flavor flavor.json
//!
//! # Machine-readable report
//! cloudcafe notifications.json --instance-id 4f1c... --report json
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use log::{error, info};

use cloudcafe::events::{lifecycle_workflow, Flavor, InstanceAction, Notification};
use cloudcafe::{AutoMarshallingModel, CafeConfig, CafeError, Format, APP_NAME, VERSION};

/// How the final report is printed.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ReportFormat {
    Text,
    Json,
    Yaml,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(format!("Invalid report format: {}", other)),
        }
    }
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Args {
    notifications_path: String,
    instance_id: String,
    action: InstanceAction,
    flavor_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    report: ReportFormat,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(level: &str) {
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
    println!("Compute Notification Validator");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: cloudcafe [OPTIONS] --instance-id ID <NOTIFICATIONS_FILE>");
    println!();
    println!("Arguments:");
    println!("  <NOTIFICATIONS_FILE>  JSON array of captured notifications");
    println!();
    println!("Options:");
    println!("  --instance-id ID      Instance whose lifecycle is validated (required)");
    println!("  --action ACTION       Lifecycle operation: create, delete (default: create)");
    println!("  --flavor PATH         Flavor body (JSON or .xml) to compare sizing against");
    println!("  --config PATH         Config file (default: $CAFE_CONFIG_FILE_PATH or cafe.yaml)");
    println!("  --report FORMAT       Report format: text, json, yaml (default: text)");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Examples:");
    println!("  cloudcafe events.json --instance-id 4f1c");
    println!("  cloudcafe events.json --instance-id 4f1c --action delete --report yaml");
}

fn option_value<'a>(args: &'a [String], i: &mut usize, option: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires an argument", option))
}

/// Parses command-line arguments.
fn parse_arguments(args: &[String]) -> Result<Args, String> {
    let mut notifications_path = None;
    let mut instance_id = None;
    let mut action = InstanceAction::Create;
    let mut flavor_path = None;
    let mut config_path = None;
    let mut report = ReportFormat::Text;
    let mut verbose = false;
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
            "--verbose" | "-v" => verbose = true,
            "--instance-id" => {
                instance_id = Some(option_value(args, &mut i, "--instance-id")?.to_string());
            }
            "--action" => {
                action = option_value(args, &mut i, "--action")?.parse()?;
            }
            "--flavor" => {
                flavor_path = Some(PathBuf::from(option_value(args, &mut i, "--flavor")?));
            }
            "--config" => {
                config_path = Some(PathBuf::from(option_value(args, &mut i, "--config")?));
            }
            "--report" => {
                report = option_value(args, &mut i, "--report")?.parse()?;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if notifications_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                notifications_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    Ok(Args {
        notifications_path: notifications_path.ok_or("Missing notifications file")?,
        instance_id: instance_id.ok_or("Missing --instance-id")?,
        action,
        flavor_path,
        config_path,
        report,
        verbose,
    })
}

fn read_file(path: &Path) -> Result<String, CafeError> {
    fs::read_to_string(path).map_err(|e| CafeError::io(path, e))
}

/// Loads the flavor body, picking the format from the file extension.
fn load_flavor(path: &Path, config: &CafeConfig) -> Result<Flavor, Box<dyn std::error::Error>> {
    let body = read_file(path)?;
    let format = match path.extension().and_then(|ext| ext.to_str()) {
        Some("xml") => Format::Xml,
        Some("json") => Format::Json,
        _ => config.marshalling.format,
    };

    Flavor::unmarshal(&body, format, config.marshalling.policy)
        .ok_or_else(|| format!("'{}' is not a valid {} flavor body", path.display(), format).into())
}

/// Main application entry point. Returns whether validation passed.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let raw_args: Vec<String> = env::args().collect();

    let args = parse_arguments(&raw_args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    let config = match &args.config_path {
        Some(path) => CafeConfig::load(path)?,
        None => CafeConfig::from_env()?,
    };

    let level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    setup_logging(level);

    if args.report == ReportFormat::Text {
        print_banner();
    }

    let body = read_file(Path::new(&args.notifications_path))?;
    let notifications = Notification::unmarshal_list(&body, config.marshalling.policy).ok_or_else(|| {
        error!("Failed to load notifications from '{}'", args.notifications_path);
        format!(
            "'{}' does not contain valid notifications (policy: {:?})",
            args.notifications_path, config.marshalling.policy
        )
    })?;
    info!("Loaded {} notifications", notifications.len());

    let flavor = match &args.flavor_path {
        Some(path) => Some(load_flavor(path, &config)?),
        None => None,
    };

    let mut runner = lifecycle_workflow(args.action, &args.instance_id, flavor);
    runner.set_log_result(config.logging.log_result);

    let (report, _) = runner.run(notifications);

    match args.report {
        ReportFormat::Text => {
            print!("{}", report.render(true));
            println!();
            println!("{}", report.summary());
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
    }

    Ok(report.success())
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
