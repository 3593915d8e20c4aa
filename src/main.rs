mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, commands::Commands, dashboard::Dashboard, handlers};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { settings, text } => {
            handlers::handle_watch(&settings, text).await?;
        }
        Commands::Live { settings } => {
            let settings = settings.resolve()?;
            let monitor = handlers::system_monitor(&settings, "live")?;
            let mut dashboard = Dashboard::new(monitor, &settings);
            dashboard.run().await?;
        }
        Commands::Status {
            settings,
            measurement_duration,
            json,
        } => {
            handlers::handle_status(settings.resolve()?, measurement_duration, json).await?;
        }
        Commands::Levels { settings } => {
            handlers::handle_levels(&settings.resolve()?)?;
        }
    }

    Ok(())
}
