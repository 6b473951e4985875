use crate::adapter::ReceivedSink;
use crate::backend::SqlUserStore;
use crate::config::Config;
use crate::subscriber::RedisEventSubscriber;
use anyhow::Result;
use tracing::{info, warn};

pub async fn execute(config: &Config) -> Result<()> {
    let sink = SqlUserStore::connect(&config.relational).await?;
    let subscriber = RedisEventSubscriber::from_config(&config.events)?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let handled = subscriber.run(&sink, shutdown).await?;
    info!("Listener stopped, {} events recorded", handled);
    Ok(())
}

pub async fn list_received(config: &Config) -> Result<()> {
    let sink = SqlUserStore::connect(&config.relational).await?;
    let names = sink.list_received().await?;
    println!("{}", serde_json::to_string_pretty(&names)?);
    Ok(())
}
