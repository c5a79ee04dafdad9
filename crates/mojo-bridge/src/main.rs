//! mojo-bridge - Mojo SDK discovery and tool launching for editors.
//!
//! Every subcommand prints JSON on stdout; messages meant for the user go to
//! stderr.

mod commands;
mod host;
mod jsonc;
mod settings;

use clap::{Parser, Subcommand, ValueEnum};
use commands::Context;
use mojo_bridge_util::path::absolutize;
use settings::Settings;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "mojo-bridge")]
#[command(author, version, about = "Locate the Mojo SDK and prepare its tools for editors", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Python environment prefix (defaults to CONDA_PREFIX, then VIRTUAL_ENV)
    #[arg(long, global = true)]
    env_prefix: Option<PathBuf>,

    /// Workspace directory (defaults to the current directory)
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    /// Also write logs to this file (verbose runs default to the logs directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved SDK
    Resolve,
    /// Print the environment variables SDK tools are started with
    Env,
    /// Print a complete debug configuration
    DebugConfig {
        /// Debugger backend
        #[arg(long, value_enum, default_value_t = Backend::Lldb)]
        backend: Backend,
        /// Launch configuration file (a single configuration or a launch.json)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Configuration to pick from a launch.json
        #[arg(long)]
        name: Option<String>,
        /// File substituted for `${file}`
        #[arg(long)]
        file: Option<String>,
    },
    /// Print how to start the language server
    LspCommand {
        /// Also report the project root for this file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Format a Mojo source file in place
    Format {
        /// File to format
        file: PathBuf,
        /// Maximum line length
        #[arg(short, long)]
        line_length: Option<u32>,
        /// Report whether the file would change without writing it
        #[arg(long)]
        check: bool,
    },
    /// Print the merged settings
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// The SDK's LLDB debug adapter
    Lldb,
    /// cppdbg with GDB
    Gdb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let current_dir = std::env::current_dir()?;
    let cwd = match cli.cwd {
        Some(dir) => absolutize(&dir, &current_dir),
        None => current_dir,
    };

    let (settings, sources) = Settings::load(Some(&cwd)).await?;
    commands::logging::init_logging(cli.verbose, settings.log_level(), cli.log_file);
    debug!(cwd = %cwd.display(), ?sources, "Starting");

    let prefix = cli
        .env_prefix
        .or_else(|| settings.environment_prefix.clone())
        .map(|p| absolutize(&p, &cwd));

    let context = Context::new(cwd, prefix, settings);
    match cli.command {
        Commands::Resolve => commands::sdk::resolve(&context).await,
        Commands::Env => commands::sdk::env(&context).await,
        Commands::DebugConfig {
            backend,
            config,
            name,
            file,
        } => {
            commands::debug::debug_config(&context, backend, config, name.as_deref(), file)
                .await
        }
        Commands::LspCommand { file } => commands::lsp::lsp_command(&context, file).await,
        Commands::Format {
            file,
            line_length,
            check,
        } => commands::lsp::format(&context, &file, line_length, check).await,
        Commands::Settings => commands::print_json(&context.settings),
    }
}
