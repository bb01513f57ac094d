//! Subcommand handlers. Results go to stdout as JSON.

use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{info, warn};

use graphmem_config::{Config, ConfigValidator};
use graphmem_core::MemoryEngine;
use graphmem_protocols::Availability;
use graphmem_tools_graph::ToolRegistry;

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Validate `config`, logging warnings. Fails on the first error.
pub(crate) fn check_config(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config)?;
    for error in &result.errors {
        warn!(path = %error.path, "Config error: {}", error.message);
    }
    let warnings = result.into_result()?;
    for warning in &warnings {
        warn!(path = %warning.path, "Config warning: {}", warning.message);
    }
    Ok(())
}

pub(crate) fn list_tools(engine: Arc<MemoryEngine>, all: bool) -> anyhow::Result<()> {
    let mode = engine.mode();
    let registry = ToolRegistry::for_engine(engine)?;
    let definitions = if all {
        registry.list()
    } else {
        registry.list_for_mode(mode)
    };
    let listing: Vec<serde_json::Value> = definitions.iter().map(|d| d.to_listing()).collect();
    print_json(&serde_json::Value::Array(listing))
}

pub(crate) async fn call_tool(
    engine: Arc<MemoryEngine>,
    tool: &str,
    params: &str,
) -> anyhow::Result<()> {
    let params: serde_json::Value =
        serde_json::from_str(params).context("--params must be valid JSON")?;
    let registry = ToolRegistry::for_engine(engine)?;

    let result = registry.call(tool, params).await;
    print_json(&serde_json::to_value(&result)?)?;
    if !result.success {
        bail!("tool '{}' failed", tool);
    }
    Ok(())
}

pub(crate) async fn status(engine: &MemoryEngine) -> anyhow::Result<()> {
    let status = engine.status().await?;
    if status.availability == Availability::Unavailable {
        warn!(backend = %status.backend, detail = ?status.detail, "Backend unavailable");
    } else {
        info!(backend = %status.backend, "Backend available");
    }
    print_json(&serde_json::to_value(&status)?)
}
