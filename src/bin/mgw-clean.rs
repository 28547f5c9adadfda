use anyhow::Result;
use mgw_cli::config::Config;
use mgw_cli::{logging, workflows};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logging::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = Config::locate()?;
    workflows::clean::run(&cfg).await
}
