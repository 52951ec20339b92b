use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use souschef::Category;
use souschef::cli::AppContext;
use souschef::cli::commands::chat::ChatOptions;

/// Parse category from string
fn parse_category(s: &str) -> Result<Category, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "souschef")]
#[command(
    version,
    about = "Conversational recipe assistant with retrieval-augmented answers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, env = "SOUSCHEF_CONFIG", help = "Config file (overrides .souschef/config.toml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively
    Chat {
        #[arg(long, value_parser = parse_category, help = "Starting category (default: from config)")]
        category: Option<Category>,
        #[arg(long, help = "Do not use chat history for rewrites or prompts")]
        no_history: bool,
        #[arg(long, help = "Print the pipeline trace after each answer")]
        trace: bool,
        #[arg(long, help = "Score each answer with the feedback judges")]
        evaluate: bool,
    },

    /// Ask a single question
    Ask {
        #[arg(value_parser = souschef::cli::commands::ask::parse_query, help = "Question, e.g. \"I have chicken and rice\"")]
        query: String,
        #[arg(long, value_parser = parse_category, help = "Category filter (default: from config)")]
        category: Option<Category>,
        #[arg(long, help = "Print the pipeline trace")]
        trace: bool,
        #[arg(long, help = "Score the answer with the feedback judges")]
        evaluate: bool,
    },

    /// List recipe categories
    Categories,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize project configuration
    Init {
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31msouschef encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "souschef=debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Chat {
            category,
            no_history,
            trace,
            evaluate,
        } => {
            let ctx = AppContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(souschef::cli::commands::chat::run(
                &ctx,
                ChatOptions {
                    category,
                    no_history,
                    trace,
                    evaluate,
                },
            ))?;
        }
        Commands::Ask {
            query,
            category,
            trace,
            evaluate,
        } => {
            let ctx = AppContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(souschef::cli::commands::ask::run(
                &ctx, &query, category, trace, evaluate,
            ))?;
        }
        Commands::Categories => {
            souschef::cli::commands::categories::run()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                souschef::cli::commands::config::show(config_path, &format)?;
            }
            ConfigAction::Path => {
                souschef::cli::commands::config::path()?;
            }
            ConfigAction::Init { force } => {
                souschef::cli::commands::config::init(force)?;
            }
        },
    }

    Ok(())
}
