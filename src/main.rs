use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookcart::logging::init().context("init logging")?;

    let cli = bookcart::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        bookcart::cli::Command::Clean(args) => {
            bookcart::clean::run(args).context("clean")?;
        }
        bookcart::cli::Command::Browse(args) => {
            bookcart::browse::run(args).await.context("browse")?;
        }
        bookcart::cli::Command::Export(args) => {
            bookcart::export::run(args).await.context("export")?;
        }
    }

    Ok(())
}
