#[tokio::main]
async fn main() -> anyhow::Result<()> {
    english_drills::run().await
}
