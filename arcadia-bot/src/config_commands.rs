use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde::Serialize;

use arcadia_types::AppConfig;

#[derive(Debug, Serialize)]
pub struct CredentialRow {
    pub variable: &'static str,
    pub used_by: &'static str,
    pub required: bool,
    pub present: bool,
    pub preview: Option<String>,
    pub warnings: Vec<&'static str>,
}

/// One row per credential the bot reads from the environment.
pub fn credential_rows(config: &AppConfig) -> Vec<CredentialRow> {
    let creds = &config.credentials;
    let ai_var = config.ai.provider.key_variable();
    let entries: [(&'static str, &'static str, bool, Option<&String>); 6] = [
        ("DISCORD_TOKEN", "discord", true, creds.discord_token.as_ref()),
        ("STEAM_API_KEY", "steam", false, creds.steam_api_key.as_ref()),
        ("TWITCH_CLIENT_ID", "igdb", false, creds.twitch_client_id.as_ref()),
        ("TWITCH_CLIENT_SECRET", "igdb", false, creds.twitch_client_secret.as_ref()),
        ("RAWG_API_KEY", "rawg", false, creds.rawg_api_key.as_ref()),
        (ai_var, "ai", config.ai.enabled, config.ai.api_key.as_ref()),
    ];

    entries
        .into_iter()
        .map(|(variable, used_by, required, value)| {
            let value = value.map(String::as_str).filter(|v| !v.is_empty());
            CredentialRow {
                variable,
                used_by,
                required,
                present: value.is_some(),
                preview: value.map(mask_key),
                warnings: value.map(key_warnings).unwrap_or_default(),
            }
        })
        .collect()
}

/// Common copy-paste mistakes in secrets.
pub fn key_warnings(key: &str) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if key.starts_with(['"', '\'']) || key.ends_with(['"', '\'']) {
        warnings.push("wrapped in quotes");
    }
    if key.contains(char::is_whitespace) {
        warnings.push("contains whitespace");
    }
    warnings
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Print the credential table and validation result. Errors when the bot cannot start.
pub fn check_config(config: &AppConfig, json: bool) -> Result<()> {
    let rows = credential_rows(config);
    let validation = config.validate().and_then(|()| config.validate_required());

    if json {
        let report = serde_json::json!({
            "credentials": rows,
            "ai": {
                "enabled": config.ai.enabled,
                "provider": config.ai.provider.to_string(),
                "model": config.ai.effective_model(),
                "usable": config.ai.is_usable(),
            },
            "data_dir": config.data_dir,
            "error": validation.as_ref().err().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Variable", "Used by", "Status", "Preview", "Warnings"]);

        for row in &rows {
            let status = match (row.present, row.required) {
                (true, _) => Cell::new("Found").fg(Color::Green),
                (false, true) => Cell::new("Missing").fg(Color::Red),
                (false, false) => Cell::new("Not set").fg(Color::Yellow),
            };
            table.add_row(vec![
                Cell::new(row.variable),
                Cell::new(row.used_by),
                status,
                Cell::new(row.preview.as_deref().unwrap_or("-")),
                Cell::new(row.warnings.join(", ")),
            ]);
        }

        println!("{table}");
        println!(
            "\n{} {} (model {}, enabled: {})",
            "AI provider:".cyan().bold(),
            config.ai.provider,
            config.ai.effective_model(),
            config.ai.enabled
        );
        println!("{} {}", "Data directory:".cyan().bold(), config.data_dir.display());
    }

    match validation {
        Ok(()) => {
            if !json {
                println!("\n{} Configuration is valid", "✓".green());
            }
            Ok(())
        },
        Err(e) => anyhow::bail!(e),
    }
}
