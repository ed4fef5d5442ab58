//! declmap CLI - List function and class declarations in Python source.

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use declmap::builder::Declmap;
use declmap::config::DeclmapConfig;
use declmap::errors::{exit_code, DeclmapError};
use declmap::logging::{self, verbosity_override};
use declmap::output::{format_output, OutputFormat, OutputOptions};
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "declmap")]
#[command(about = "List function and class declarations in Python source")]
#[command(version)]
struct Cli {
    /// Log debug events
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Extra TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List function, async function, and method declarations
    Functions(ExtractArgs),

    /// List class declarations with attributes, methods, and nested classes
    Classes(ExtractArgs),

    /// List classes and functions with a summary
    Report(ExtractArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct ExtractArgs {
    /// Python file or directory to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Omit declaration source text
    #[arg(long)]
    no_text: bool,

    /// Skip paths matching a glob, relative to PATH
    #[arg(long)]
    exclude: Vec<String>,

    /// Include hidden files and directories
    #[arg(long)]
    include_hidden: bool,

    /// Maximum directory depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Name of the instance parameter in methods
    #[arg(long)]
    self_name: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let json_output = json_flag(&cli.command);

    if let Err(e) = run(cli) {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Functions(args) | Commands::Classes(args) | Commands::Report(args) => args.json,
        Commands::Completions { .. } => false,
    }
}

fn run(cli: Cli) -> Result<(), DeclmapError> {
    if let Commands::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "declmap", &mut std::io::stdout());
        return Ok(());
    }

    let config = DeclmapConfig::load_with_dotenv(cli.config.as_deref())?;
    let _guard = logging::init(&config.log, verbosity_override(cli.quiet, cli.verbose))?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Functions(args) => run_extract(args, &config, OutputOptions::functions_only()),
        Commands::Classes(args) => run_extract(args, &config, OutputOptions::classes_only()),
        Commands::Report(args) => run_extract(args, &config, OutputOptions::default()),
        Commands::Completions { .. } => Ok(()),
    }
}

fn run_extract(
    args: ExtractArgs,
    config: &DeclmapConfig,
    mut output_options: OutputOptions,
) -> Result<(), DeclmapError> {
    let mut builder = Declmap::from_config(&args.path, &config.extract);
    if args.include_hidden {
        builder = builder.include_hidden(true);
    }
    for pattern in args.exclude {
        builder = builder.exclude(pattern);
    }
    if let Some(depth) = args.max_depth {
        builder = builder.max_depth(depth);
    }
    if let Some(name) = args.self_name {
        builder = builder.self_name(name);
    }

    let result = builder.build()?;

    output_options.format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    output_options.include_text = !args.no_text;

    let output = format_output(&result.reports, &result.failures, &output_options)?;
    print!("{output}");

    Ok(())
}
