#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aichart_server::start().await
}
