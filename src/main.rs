use rask_firehose_forwarder::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::main().await
}
