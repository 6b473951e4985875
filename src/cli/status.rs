use crate::config::Config;
use crate::service::FanoutService;
use anyhow::{bail, Result};

pub async fn execute(config: &Config) -> Result<()> {
    let service = FanoutService::connect(config).await?;
    let report = service.status().await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_ready() {
        bail!("At least one durable store is down");
    }
    Ok(())
}
