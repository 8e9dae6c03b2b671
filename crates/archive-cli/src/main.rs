mod cli;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}
