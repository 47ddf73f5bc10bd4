#[tokio::main]
async fn main() -> anyhow::Result<()> {
    smarthome_bridge::app::run().await
}
