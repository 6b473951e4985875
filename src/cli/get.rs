use crate::cli::GetArgs;
use crate::config::Config;
use crate::service::FanoutService;
use anyhow::Result;

pub async fn execute(config: &Config, args: &GetArgs) -> Result<()> {
    let service = FanoutService::connect(config).await?;
    let result = service.submit_read(&args.username).await?;

    if args.verbose {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&result.merged)?);
    }
    Ok(())
}
