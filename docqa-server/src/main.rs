use clap::Parser;
use docqa_server::{ServerConfig, init_telemetry, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_telemetry(config.json_logs)?;
    run_server(config).await
}
