use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vitrine - preview schema-driven widgets against mock data
#[derive(Parser, Debug, Clone)]
#[command(name = "vitrine", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "VITRINE_CONFIG", default_value = "vitrine.toml", global = true)]
    pub config: PathBuf,

    /// Project root that relative paths are resolved against
    #[arg(long, env = "VITRINE_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Server host address
    #[arg(long, env = "VITRINE_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "VITRINE_PORT")]
    pub port: Option<u16>,

    /// Metadata map output path
    #[arg(long, env = "VITRINE_OUTPUT", global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the development server (default)
    Serve,
    /// Extract widget example metadata from source
    Extract {
        /// Re-run extraction whenever widget sources change
        #[arg(long)]
        watch: bool,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
