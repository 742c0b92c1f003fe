#[tokio::main]
async fn main() -> anyhow::Result<()> {
    index_sentiment_lib::run().await?;
    Ok(())
}
