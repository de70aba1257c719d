use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "plinth",
    about = "Plinth — declarative upload-stack provisioning",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a plinth.toml scaffold for a new stack
    Init {
        /// Stack name
        #[arg(short, long, default_value = "upload-stack")]
        name: String,
        /// Cloud project id
        #[arg(short, long)]
        project: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        path: String,
    },
    /// Resolve and print the stack's creation order
    Plan {
        /// Path to plinth.toml
        #[arg(short, long, default_value = "plinth.toml")]
        config: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Check a plinth.toml without planning (roles, network policy)
    Validate {
        /// Path to plinth.toml
        #[arg(short, long, default_value = "plinth.toml")]
        config: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("plinth=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { name, project, path } => commands::init::init(&name, &project, &path),
        Commands::Plan { config, format } => commands::plan::plan(&config, &format),
        Commands::Validate { config } => commands::validate::validate(&config),
    }
}
