use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use tracing::{info, warn};

use arcadia_core::modules::data_manager::Document;
use arcadia_core::Services;
use arcadia_types::AppConfig;

use crate::signals::shutdown_signal;

/// Bring the services up, wait for a shutdown signal, then tear everything down.
pub async fn run(config: AppConfig, warm_pool: bool) -> Result<()> {
    config.validate_required().context("Cannot start the bot")?;

    let services = Services::new(config);
    services.data.load_all().await;
    info!(data_dir = %services.data.data_dir().display(), "Data loaded");

    if warm_pool {
        services.browsers.initialize().await.context("Browser pool failed to start")?;
        let stats = services.browsers.stats();
        info!(created = stats.created, max = stats.max_resources, "Browser pool ready");
    }

    info!(
        limiters = ?services.limiters.names(),
        steam = services.steam.is_configured(),
        igdb = services.igdb.is_configured(),
        rawg = services.rawg.is_configured(),
        ai = services.ai.is_configured(),
        "Arcadia running"
    );

    shutdown_signal().await;

    let failed = services.shutdown().await;
    if failed > 0 {
        warn!(failed, "Some data files could not be saved");
        anyhow::bail!("{failed} data file(s) failed to save");
    }
    Ok(())
}

/// Entry counts for every stored document.
pub async fn data_stats(config: AppConfig, json: bool) -> Result<()> {
    let services = Services::new(config);
    services.data.load_all().await;
    let counts = services.data.counts();

    if json {
        let report: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(doc, n)| (doc.to_string(), serde_json::Value::from(*n)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "Data directory:".cyan().bold(), services.data.data_dir().display());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Document", "File", "Entries"]);
    for (doc, n) in &counts {
        table.add_row(vec![
            Cell::new(doc.to_string()),
            Cell::new(Document::file_name(doc)),
            Cell::new(n).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");

    let total: usize = counts.iter().map(|(_, n)| n).sum();
    println!("Total entries: {}", total.to_string().yellow());
    Ok(())
}
