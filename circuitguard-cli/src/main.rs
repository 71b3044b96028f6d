//! CircuitGuard CLI - electrical circuit compliance validation from the command line.

use circuitguard::{
    load_circuit_records, BatchValidationResult, CableLibrary, DeviceFamily, InstallationMethod,
    NonConformity, ProtectionLibrary, RuleSet, Severity, ValidationEngine, ValidationOptions,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::Path;
use std::path::PathBuf;
use std::process;
use tracing::Level;

#[derive(Parser)]
#[command(name = "circuitguard")]
#[command(about = "Electrical circuit compliance validation tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every circuit in a JSON file
    Check {
        /// Path to a JSON file holding one circuit record or an array of them
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Exit with error code if findings exist at this severity or higher
        #[arg(long, value_enum)]
        fail_on: Option<FailOnSeverity>,

        /// Only run these rule codes (comma separated)
        #[arg(long, value_delimiter = ',')]
        rules: Vec<String>,

        /// Log rule evaluation to stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Find the smallest cable gauge (and protective device) for a load
    Size {
        /// Cable type code, e.g. NYM-J
        #[arg(long)]
        cable: String,

        /// Design current in A
        #[arg(long)]
        current: f64,

        /// Installation method code or alias
        #[arg(long, default_value = "conduit/tray")]
        method: String,

        /// Ambient temperature in °C
        #[arg(long, default_value_t = 30.0)]
        ambient: f64,

        /// Number of grouped circuits
        #[arg(long, default_value_t = 1)]
        grouping: u32,

        /// Tripping characteristic letter (B, C, D, K, Z)
        #[arg(long)]
        family: Option<char>,
    },

    /// List available validation rules
    Rules {
        /// Show trigger fields and normative references
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
    /// GitHub Actions format
    Github,
}

#[derive(Clone, ValueEnum)]
enum FailOnSeverity {
    Critical,
    Warning,
    Info,
}

impl FailOnSeverity {
    fn threshold(&self) -> Severity {
        match self {
            FailOnSeverity::Critical => Severity::Critical,
            FailOnSeverity::Warning => Severity::Warning,
            FailOnSeverity::Info => Severity::Info,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Check {
            file,
            format,
            fail_on,
            rules,
            verbose,
        } => {
            init_logging(verbose);
            handle_check(&file, format, fail_on, rules)
        }
        Commands::Size {
            cable,
            current,
            method,
            ambient,
            grouping,
            family,
        } => {
            init_logging(false);
            handle_size(&cable, current, &method, ambient, grouping, family)
        }
        Commands::Rules { verbose } => {
            handle_rules(verbose);
            0
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_check(
    file: &Path,
    format: OutputFormat,
    fail_on: Option<FailOnSeverity>,
    rules: Vec<String>,
) -> i32 {
    let records = match load_circuit_records(file) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {}: {}", file.display(), e);
            return 1;
        }
    };

    let options = ValidationOptions {
        rules,
        ..ValidationOptions::default()
    };
    let engine = ValidationEngine::with_options(options);
    let batch = engine.validate_batch(&records);

    output_results(&batch, file, &format);

    if let Some(severity) = fail_on {
        if should_fail(&batch, &severity) {
            return 1;
        }
    }
    0
}

fn should_fail(batch: &BatchValidationResult, severity: &FailOnSeverity) -> bool {
    batch
        .highest_severity()
        .map(|highest| highest >= severity.threshold())
        .unwrap_or(false)
}

fn output_results(batch: &BatchValidationResult, file: &Path, format: &OutputFormat) {
    match format {
        OutputFormat::Human => output_human(batch, file),
        OutputFormat::Json => output_json(batch),
        OutputFormat::Github => output_github(batch, file),
    }
}

fn output_human(batch: &BatchValidationResult, file: &Path) {
    println!("\nFile: {}", file.display());

    for result in &batch.circuit_results {
        println!("\nCircuit: {}", result.circuit_id);
        println!("{}", "─".repeat(60));

        if result.is_compliant() {
            println!(
                "  No issues found ({} rules applied)",
                result.summary.rules_applicable
            );
            continue;
        }

        for severity in [Severity::Critical, Severity::Warning, Severity::Info] {
            let findings: Vec<&NonConformity> = result
                .non_conformities
                .iter()
                .filter(|n| n.severity == severity)
                .collect();
            if findings.is_empty() {
                continue;
            }
            println!("\n  {}:", severity);
            for finding in findings {
                println!("    - [{}] {}", finding.rule_code, finding.message);
                println!("      Reference: {}", finding.normative_reference);
                for remedy in &finding.remedies {
                    println!("      Remedy: {}", remedy.description);
                }
            }
        }
    }

    println!("\n  Summary:");
    println!("    Circuits:    {}", batch.total_circuits);
    println!("    Valid:       {}", batch.valid_circuits);
    println!("    With issues: {}", batch.circuits_with_issues);
    println!("    Critical:    {}", batch.critical_issues);
    println!("    Warnings:    {}", batch.warnings);
}

fn output_json(batch: &BatchValidationResult) {
    match serde_json::to_string_pretty(batch) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to serialize results: {}", e),
    }
}

fn severity_to_github(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "error",
        Severity::Warning => "warning",
        Severity::Info => "notice",
    }
}

fn output_github(batch: &BatchValidationResult, file: &Path) {
    for result in &batch.circuit_results {
        for finding in &result.non_conformities {
            println!(
                "::{} file={},title={}::{}: {}",
                severity_to_github(finding.severity),
                file.display(),
                finding.rule_code,
                result.circuit_id,
                finding.message.replace('\n', " ")
            );
        }
    }
}

fn handle_size(
    cable: &str,
    current: f64,
    method: &str,
    ambient: f64,
    grouping: u32,
    family: Option<char>,
) -> i32 {
    let method: InstallationMethod = match method.parse() {
        Ok(method) => method,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let cables = CableLibrary::new();
    let spec = match cables.get_cable(cable) {
        Some(spec) => spec,
        None => {
            eprintln!("Error: Unknown cable type: {}", cable);
            return 1;
        }
    };

    match cables.find_minimum_gauge(&spec.code, current, method, ambient, grouping) {
        Some(gauge) => {
            let ampacity = cables
                .get_ampacity(&spec.code, gauge, method, ambient, grouping)
                .map(|a| a.derated)
                .unwrap_or_default();
            println!(
                "Cable: {} {} (carries {} A, method {}, {} °C, {} grouped)",
                spec.code, gauge, ampacity, method, ambient, grouping
            );
        }
        None => {
            eprintln!(
                "Error: No {} gauge carries {} A with method {}",
                spec.code, current, method
            );
            return 1;
        }
    }

    if let Some(letter) = family {
        let family = match DeviceFamily::from_letter(letter) {
            Some(family) => family,
            None => {
                eprintln!("Error: Unknown tripping characteristic: {}", letter);
                return 1;
            }
        };
        match ProtectionLibrary::new().find_minimum_device(family, current) {
            Some(device) => println!("Device: {} ({} A)", device.code, device.rated_current),
            None => {
                eprintln!("Error: No {} device rated for {} A", family, current);
                return 1;
            }
        }
    }

    0
}

fn handle_rules(verbose: bool) {
    println!("Available validation rules:\n");

    let rules = RuleSet::standard();
    for rule in rules.iter() {
        if verbose {
            let triggers: Vec<&str> = rule.trigger_fields().iter().map(|f| f.as_str()).collect();
            println!("  {} ({})", rule.code(), rule.severity());
            println!("    {}", rule.name());
            println!("    Category:  {}", rule.category().as_str());
            println!("    Triggers:  {}", triggers.join(", "));
            println!("    Reference: {}", rule.normative_reference());
            println!();
        } else {
            println!("  {:40} {}", rule.code(), rule.name());
        }
    }
}
