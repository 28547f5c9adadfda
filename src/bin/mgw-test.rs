use anyhow::Result;
use mgw_cli::config::Config;
use mgw_cli::{logging, workflows};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Trailing arguments are forwarded verbatim to `php artisan test`.
    let test_args: Vec<String> = std::env::args().skip(1).collect();

    match run(&test_args).await {
        // The suite's exit code is this program's exit code.
        Ok(code) => match u8::try_from(code) {
            Ok(code) => ExitCode::from(code),
            Err(_) => ExitCode::FAILURE,
        },
        Err(err) => {
            logging::error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(test_args: &[String]) -> Result<i32> {
    let cfg = Config::locate()?;
    workflows::test_run::run(&cfg, test_args).await
}
