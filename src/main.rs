use anyhow::Result;
use clap::Parser;
use stockroom::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    stockroom::telemetry::init(cli.verbose);
    cli.run().await
}
