use clap::Parser;
use pickguard::cli::{self, output::OutputMode, Cli, Commands};
use pickguard::config::AppConfig;
use pickguard::logging::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    if let Err(errors) = config.validate() {
        anyhow::bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }

    // Keep the file appender guard alive for the whole run
    let _guard = match &cli.command {
        Commands::Serve { .. } | Commands::Grade { .. } => init_logging(&config.logging),
        _ => {
            init_logging_simple();
            None
        }
    };

    let mode = OutputMode::from_json_flag(cli.json);
    if let Err(e) = cli::commands::run(cli.command, &config, mode).await {
        cli::output::print_error(&format!("Error: {e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
