mod bot;
mod bridge;
mod config;
pub mod plugins;
mod storage;
mod systems;
#[cfg(test)]
mod testing;
mod world;

use config::Config;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load();
    config.tuning.validate()?;
    let address = format!("{}:{}", config.bridge_host, config.bridge_port);

    info!("Starting Warden...");
    info!("Bridge: {}", address);

    // Agent state outlives every bridge session.
    let mut agent = bot::Agent::from_config(&config);

    loop {
        info!("Connecting as {}...", config.bot_name);

        match TcpStream::connect(&address).await {
            Ok(stream) => {
                if let Err(e) = bridge::run(stream, &mut agent, config.shot_timeout).await {
                    error!("Bridge session failed: {}", e);
                }
                info!("Bot disconnected/stopped. Reconnecting in 5 seconds...");
            }
            Err(e) => warn!("Bridge unreachable: {}. Retrying in 5 seconds...", e),
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
