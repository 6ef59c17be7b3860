//! Leak alert commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, LeakAlert};
use crate::output::{color_level, format_date, print_json, print_success, print_table, OutputFormat};

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Detected")]
    detected: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// List active alerts
pub async fn list_alerts(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let alerts: Vec<LeakAlert> = client.get("alerts").await?;

    match format {
        OutputFormat::Json => print_json(&alerts)?,
        OutputFormat::Table => {
            let rows: Vec<AlertRow> = alerts
                .iter()
                .map(|a| AlertRow {
                    id: a.id,
                    entity: format!("{} {}", a.entity_type, a.entity_id),
                    alert_type: a.alert_type.clone(),
                    severity: color_level(&a.severity),
                    detected: format_date(&a.detected_at),
                    description: a.description.clone().unwrap_or_default(),
                })
                .collect();
            print_table(rows, "No active alerts");
        }
    }

    Ok(())
}

pub async fn resolve_alert(client: &ApiClient, id: u64, format: OutputFormat) -> Result<()> {
    let alert: LeakAlert = client.post_empty(&format!("alerts/{}/resolve", id)).await?;

    match format {
        OutputFormat::Json => print_json(&alert)?,
        OutputFormat::Table => print_success(&format!(
            "Alert {} on {} {} resolved",
            alert.id, alert.entity_type, alert.entity_id
        )),
    }

    Ok(())
}
