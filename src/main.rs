use clap::Parser;

mod cli;

use cli::{execute_command, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    file_share::logging::init(&config.log_filter);

    if let Some(command) = cli.command {
        execute_command(&config, command).await?;
    }

    Ok(())
}
