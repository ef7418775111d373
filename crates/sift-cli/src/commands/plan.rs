//! `sift plan` command implementation.
//!
//! Connects to the upstream server, builds the instance cache with the stages
//! enabled in the configuration and prints either the dump plan or the whole
//! cache as JSON on stdout.

use anyhow::{Context, Result};
use sift_adapter_mysql::MySqlSession;
use sift_core::{InstanceCache, StagesConfig};
use sift_filter::Filters;
use sift_runtime::{DumpPlan, InstanceCacheBuilder, Session};
use std::path::Path;
use tracing::info;

pub async fn run(config_path: &Path, print_cache: bool, force: bool) -> Result<()> {
    let (config, filters) = super::load(config_path)?;
    if !force {
        super::check::run_pre_hook(&filters)?;
    }

    let mut session = MySqlSession::connect(&config.upstream)
        .await
        .with_context(|| format!("Failed to connect to {}", config.upstream.address()))?;

    let cache = build_cache(&mut session, filters, config.stages).await;
    session.close().await.context("Failed to close the connection")?;
    let cache = cache?;

    let output = if print_cache {
        serde_json::to_string_pretty(&cache)?
    } else {
        let plan = DumpPlan::from_cache(&cache);
        info!(
            tables = plan.tables.len(),
            unchunked = plan.unchunked().count(),
            "Planned table chunking"
        );
        serde_json::to_string_pretty(&plan)?
    };
    println!("{output}");

    Ok(())
}

/// Run the structural stage and every configured optional stage.
pub async fn build_cache<S: Session + ?Sized>(
    session: &mut S,
    filters: Filters,
    stages: StagesConfig,
) -> Result<InstanceCache> {
    let mut builder = InstanceCacheBuilder::new(session, filters)
        .await
        .context("Failed to enumerate instance objects")?;

    if stages.metadata {
        builder = builder
            .metadata()
            .await
            .context("Failed to fetch object metadata")?;
    }
    if stages.events {
        builder = builder.events().await.context("Failed to fetch events")?;
    }
    if stages.routines {
        builder = builder
            .routines()
            .await
            .context("Failed to fetch routines")?;
    }
    if stages.triggers {
        builder = builder
            .triggers()
            .await
            .context("Failed to fetch triggers")?;
    }
    if stages.users {
        builder = builder.users().await.context("Failed to fetch users")?;
    }

    Ok(builder.build())
}
