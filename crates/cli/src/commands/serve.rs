use std::sync::Arc;

use anyhow::Result;
use treewright_http::{create_router, start_sync_scheduler};

use crate::config::Config;
use crate::services::{Services, open_storage};

pub(crate) async fn run(port: u16, host: String, in_memory: bool, no_scheduler: bool) -> Result<()> {
    let config = Config::from_env();
    let storage = open_storage(&config, in_memory).await?;
    let services = Services::build(&config, storage)?;

    if no_scheduler {
        tracing::info!("sync scheduler disabled");
    } else {
        start_sync_scheduler(Arc::clone(&services.sync), config.sync_interval);
    }

    let router = create_router(Arc::new(services.into_app_state()));
    let addr = format!("{host}:{port}");
    tracing::info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
