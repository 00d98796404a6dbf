//! airfuse - Main Entry Point

use airfuse::cli::{cmd_info, cmd_label, cmd_process, cmd_run, Cli, Commands};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airfuse=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process(args) => cmd_process(&args)?,
        Commands::Label(args) => cmd_label(&args)?,
        Commands::Run(args) => cmd_run(&args)?,
        Commands::Info { data } => cmd_info(&data)?,
    }

    Ok(())
}
