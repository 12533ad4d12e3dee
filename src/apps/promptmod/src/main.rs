use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = promptmod::cli::Cli::parse();
    cli.run().await
}
