use anyhow::{Result, bail};

use crate::config::Config;
use crate::services::{Services, open_storage};

pub(crate) async fn run_sync() -> Result<()> {
    let config = Config::from_env();
    let services = Services::build(&config, open_storage(&config, false).await?)?;
    let Some(report) = services.sync.try_sync().await? else {
        bail!("a sync is already running");
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub(crate) async fn run_status() -> Result<()> {
    let config = Config::from_env();
    let services = Services::build(&config, open_storage(&config, false).await?)?;
    let status = services.sync.status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
