//! nett CLI - command-line front end of the C style checker
//!
//! Application layer: turns arguments into a `RuleConfig` and a set of input
//! paths, runs the checks, then prints the report or writes `.styled` copies.
//! Exit status reflects invocation failures only, never style findings.

use clap::{Parser, Subcommand, ValueEnum};
use nett::{
    checks, AnalysisOptions, Category, ConfigBuilder, NettError, NettResult, NettValidator, OutputFormat,
    ReportFormatter, ReportOptions, RuleConfig,
};
use std::path::{Path, PathBuf};
use std::process;

/// nett - style checker for C source files
#[derive(Parser)]
#[command(name = "nett")]
#[command(version)]
#[command(about = "Style checker for C source files")]
#[command(
    long_about = "nett checks C sources and headers for naming, comment, brace, whitespace, indentation, line length and function length violations."
)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Files or directories to check
    paths: Vec<PathBuf>,

    /// Write a .styled copy of each input, annotated with its violations,
    /// instead of printing them
    #[arg(long)]
    generate_files: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormatArg,

    /// Override the maximum line length
    #[arg(long)]
    max_line_length: Option<u32>,

    /// Override the tab width used to expand tabs
    #[arg(long)]
    tab_width: Option<u32>,

    /// Additional exclude patterns for directory inputs
    #[arg(long, action = clap::ArgAction::Append)]
    exclude: Vec<String>,

    /// Disable parallel processing
    #[arg(long)]
    no_parallel: bool,

    /// Stop at the first file that cannot be checked cleanly
    #[arg(long)]
    fail_fast: bool,

    /// Print per-category totals after the report
    #[arg(long)]
    summary: bool,

    /// Show the license for the software
    #[arg(long)]
    license: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },

    /// List rule categories and the active thresholds
    Rules,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

async fn run_command(cli: Cli) -> NettResult<i32> {
    match cli.command {
        Some(Commands::ValidateConfig { ref config_file }) => {
            let path = config_file.clone().or_else(|| cli.config.clone());
            run_validate_config(path)
        }
        Some(Commands::Rules) => {
            let config = load_config(cli.config.as_deref())?;
            print!("{}", describe_rules(&config));
            Ok(0)
        }
        None if cli.license => {
            print!("{}", license_text());
            Ok(0)
        }
        None => run_check(cli).await,
    }
}

async fn run_check(cli: Cli) -> NettResult<i32> {
    if cli.paths.is_empty() {
        return Err(NettError::NoInput);
    }

    let mut builder = ConfigBuilder::from_config(load_config(cli.config.as_deref())?);
    if let Some(max) = cli.max_line_length {
        builder = builder.max_line_length(max);
    }
    if let Some(width) = cli.tab_width {
        builder = builder.tab_width(width);
    }
    let config = builder.build()?;

    let use_colors = !cli.no_color;
    if !use_colors {
        disable_colors();
    }

    let validator = NettValidator::with_config(config)?.with_report_formatter(ReportFormatter::new(ReportOptions {
        use_colors,
        show_summary: cli.summary,
    }));

    let options = AnalysisOptions {
        parallel: !cli.no_parallel,
        fail_fast: cli.fail_fast,
        exclude_patterns: cli.exclude,
        annotate: cli.generate_files,
    };
    let report = validator.check_paths(&cli.paths, &options)?;

    if cli.generate_files {
        let written = validator.generate_styled_files(&report).await?;
        for path in &written {
            tracing::info!("wrote {}", path.display());
        }
        for file in report.files.iter().filter(|f| f.failure.is_some()) {
            if let Some(reason) = &file.failure {
                eprintln!("Error: {reason}");
            }
        }
    } else {
        let formatted = validator.format_report(&report, cli.format.into())?;
        match cli.format {
            OutputFormatArg::Human => print!("{formatted}"),
            OutputFormatArg::Json => println!("{formatted}"),
        }
    }

    Ok(if report.has_failures() { 1 } else { 0 })
}

/// Explicit `--config`, else `nett.yaml` / `.nett.yaml` in the working
/// directory, else defaults
fn load_config(explicit: Option<&Path>) -> NettResult<RuleConfig> {
    if let Some(path) = explicit {
        return RuleConfig::load_from_file(path);
    }
    let cwd = std::env::current_dir()?;
    match RuleConfig::discover(&cwd) {
        Some(path) => {
            tracing::debug!("using configuration {}", path.display());
            RuleConfig::load_from_file(path)
        }
        None => Ok(RuleConfig::default()),
    }
}

fn run_validate_config(config_path: Option<PathBuf>) -> NettResult<i32> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            let cwd = std::env::current_dir()?;
            RuleConfig::discover(&cwd).unwrap_or_else(|| PathBuf::from("nett.yaml"))
        }
    };

    println!("Validating configuration: {}", config_path.display());

    match RuleConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("Configuration is valid");
            print!("{}", describe_rules(&config));
            Ok(0)
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {e}");
            Ok(1)
        }
    }
}

fn describe_rules(config: &RuleConfig) -> String {
    let mut out = String::from("Categories:\n");
    for category in Category::checked() {
        let state = if config.is_enabled(*category) { "enabled" } else { "disabled" };
        out.push_str(&format!("  {:<12} {}\n", category.as_str(), state));
    }

    out.push_str("Checks:\n");
    for check in checks::default_checks() {
        let categories: Vec<&str> = check.categories().iter().map(|c| c.as_str()).collect();
        out.push_str(&format!("  {:<12} {}\n", check.name(), categories.join(", ")));
    }

    out.push_str("Thresholds:\n");
    let thresholds = [
        ("indent width", config.indent_width as usize),
        ("continuation indent", config.continuation_width() as usize),
        ("tab width", config.tab_width as usize),
        ("max line length", config.max_line_length as usize),
        ("max function length", config.max_function_length as usize),
        ("annotation cap", config.max_annotations_per_category),
    ];
    for (name, value) in thresholds {
        out.push_str(&format!("  {name:<20} {value}\n"));
    }
    out.push_str(&format!(
        "  {:<20} {}\n",
        "hungarian notation",
        if config.hungarian.enabled { "rejected" } else { "allowed" }
    ));
    if !config.hungarian.extra_prefixes.is_empty() {
        out.push_str(&format!("  {:<20} {}\n", "extra prefixes", config.hungarian.extra_prefixes.join(", ")));
    }
    out
}

fn license_text() -> String {
    format!(
        "{} {}\n\nLicensed under the {} license.\nLicense details can be found at {}\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_LICENSE"),
        "https://opensource.org/licenses/MIT"
    )
}

#[cfg(feature = "colors")]
fn disable_colors() {
    colored::control::set_override(false);
}

#[cfg(not(feature = "colors"))]
fn disable_colors() {}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nett").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_argument_parsing() {
        let parsed = cli(&["--generate-files", "--tab-width", "8", "a.c", "src"]);
        assert!(parsed.command.is_none());
        assert!(parsed.generate_files);
        assert_eq!(parsed.tab_width, Some(8));
        assert_eq!(parsed.paths, vec![PathBuf::from("a.c"), PathBuf::from("src")]);

        let parsed = cli(&["rules", "--config", "nett.yaml"]);
        assert!(matches!(parsed.command, Some(Commands::Rules)));
        assert_eq!(parsed.config, Some(PathBuf::from("nett.yaml")));
    }

    #[tokio::test]
    async fn test_no_input_is_an_error() {
        let result = run_command(cli(&[])).await;
        assert!(matches!(result, Err(NettError::NoInput)));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = run_command(cli(&["/definitely/not/here.c"])).await;
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Unable to access file /definitely/not/here.c");
    }

    #[tokio::test]
    async fn test_missing_path_stops_the_whole_run() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.c");
        fs::write(&good, "/* entry point */\nint main(void) {\n    return 0;\n}\n").unwrap();
        let missing = temp_dir.path().join("nothere.c");
        let (first, second) = (missing.to_string_lossy().into_owned(), good.to_string_lossy().into_owned());

        let result = run_command(cli(&[first.as_str(), second.as_str()])).await;
        assert!(matches!(result, Err(NettError::InputNotFound { path }) if path == missing));
    }

    #[tokio::test]
    async fn test_check_and_generate_files() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("demo.c");
        fs::write(&source, "int Total;\n").unwrap();
        let path = source.to_string_lossy().into_owned();

        let code = run_command(cli(&["--no-color", &path])).await.unwrap();
        assert_eq!(code, 0);

        let code = run_command(cli(&["--generate-files", &path])).await.unwrap();
        assert_eq!(code, 0);
        let styled = fs::read_to_string(temp_dir.path().join("demo.c.styled")).unwrap();
        assert!(styled.contains("[NAMING] 'Total' misnamed."));
        assert!(styled.ends_with("int Total;\n"));
    }

    #[test]
    fn test_validate_config() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("nett.yaml");
        let bad = temp_dir.path().join("bad.yaml");
        fs::write(&good, "version: \"1.0\"\nmax_line_length: 100\n").unwrap();
        fs::write(&bad, "version: \"1.0\"\ntab_width: 0\n").unwrap();

        assert_eq!(run_validate_config(Some(good)).unwrap(), 0);
        assert_eq!(run_validate_config(Some(bad)).unwrap(), 1);
    }

    #[test]
    fn test_describe_rules() {
        let config = ConfigBuilder::new().disable(Category::Warning).build().unwrap();
        let text = describe_rules(&config);
        assert!(text.contains("  WARNING      disabled\n"));
        assert!(text.contains("  NAMING       enabled\n"));
        assert!(text.contains("  max line length      80\n"));
        assert!(text.contains("  indentation  INDENTATION, WHITESPACE\n"));
    }
}
