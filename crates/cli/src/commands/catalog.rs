use anyhow::Result;

use crate::config::Config;
use crate::services::{Services, open_storage};

pub(crate) async fn run_segments() -> Result<()> {
    let config = Config::from_env();
    let services = Services::build(&config, open_storage(&config, false).await?)?;
    let segments = services.catalog.segment_names().await?;
    println!("{}", serde_json::to_string_pretty(&segments)?);
    Ok(())
}

pub(crate) async fn run_attributes() -> Result<()> {
    let config = Config::from_env();
    let services = Services::build(&config, open_storage(&config, false).await?)?;
    let attributes = services.catalog.attributes().await?;
    println!("{}", serde_json::to_string_pretty(&attributes)?);
    Ok(())
}
