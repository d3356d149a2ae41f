use anyhow::Result;
use tlsinventory::cli::start;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    start::start().await
}
