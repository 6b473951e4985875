use crate::cli::PutArgs;
use crate::config::Config;
use crate::model::{UserRecord, WriteStatus};
use crate::service::FanoutService;
use anyhow::{bail, Result};

/// 解析 `key=value`，value 能解析为 JSON 时按 JSON 处理，否则视为字符串
pub(crate) fn parse_attribute(raw: &str) -> Result<(String, serde_json::Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("Attribute '{}' must have the form KEY=VALUE", raw);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Attribute '{}' has an empty key", raw);
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub async fn execute(config: &Config, args: &PutArgs) -> Result<()> {
    let mut record = UserRecord::new(args.username.clone());
    for raw in &args.attributes {
        let (key, value) = parse_attribute(raw)?;
        record.attributes.insert(key, value);
    }

    let service = FanoutService::connect(config).await?;
    let result = service.submit_write(record).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.overall == WriteStatus::Failed {
        bail!("Write failed on both durable stores");
    }
    Ok(())
}
