//! Maintenance task commands

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tabled::Tabled;

use crate::client::{ApiClient, MaintenanceLog, MaintenanceUpdate, MessageResponse, NewMaintenance};
use crate::output::{
    color_status, format_date, print_info, print_json, print_success, print_table, OutputFormat,
};

#[derive(Tabled)]
struct MaintenanceRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Scheduled")]
    scheduled: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Technician")]
    technician: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Options for a new task
pub struct CreateOptions {
    pub entity_type: String,
    pub entity_id: String,
    pub scheduled: String,
    pub maintenance_type: Option<String>,
    pub technician: Option<String>,
    pub notes: Option<String>,
    pub cost: Option<f64>,
}

/// Accept `YYYY-MM-DD` or a full RFC 3339 timestamp
fn parse_schedule(value: &str) -> Result<String> {
    if chrono::DateTime::parse_from_rfc3339(value).is_ok() {
        return Ok(value.to_string());
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{}', expected YYYY-MM-DD", value))?;
    Ok(format!("{}T00:00:00Z", date))
}

/// List tasks, optionally for one (entity_type, entity_id)
pub async fn list_maintenance(
    client: &ApiClient,
    status: Option<String>,
    entity: Option<(String, String)>,
    format: OutputFormat,
) -> Result<()> {
    let logs: Vec<MaintenanceLog> = match &entity {
        Some((entity_type, entity_id)) => {
            client
                .get_query(
                    "maintenance",
                    &[("entity_type", entity_type.as_str()), ("entity_id", entity_id.as_str())],
                )
                .await?
        }
        None => client.get("maintenance").await?,
    };
    let filtered: Vec<_> = logs
        .into_iter()
        .filter(|l| {
            status
                .as_ref()
                .map(|s| l.status.eq_ignore_ascii_case(s))
                .unwrap_or(true)
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&filtered)?,
        OutputFormat::Table => {
            let total = filtered.len();
            let rows: Vec<MaintenanceRow> = filtered
                .iter()
                .map(|l| MaintenanceRow {
                    id: l.id,
                    entity: format!("{} {}", l.entity_type, l.entity_id),
                    scheduled: format_date(&l.scheduled_date),
                    kind: l.maintenance_type.clone().unwrap_or_else(|| "-".to_string()),
                    technician: l.technician.clone().unwrap_or_else(|| "-".to_string()),
                    cost: l.cost.map(|c| format!("${:.0}", c)).unwrap_or_else(|| "-".to_string()),
                    status: color_status(&l.status),
                })
                .collect();
            print_table(rows, "No maintenance tasks found");
            if total > 0 {
                println!("\nTotal: {} tasks", total);
            }
        }
    }

    Ok(())
}

pub async fn create_maintenance(
    client: &ApiClient,
    options: CreateOptions,
    format: OutputFormat,
) -> Result<()> {
    let request = NewMaintenance {
        entity_type: options.entity_type,
        entity_id: options.entity_id,
        scheduled_date: parse_schedule(&options.scheduled)?,
        maintenance_type: options.maintenance_type,
        technician: options.technician,
        notes: options.notes,
        cost: options.cost,
    };

    let log: MaintenanceLog = client.post("maintenance", &request).await?;

    match format {
        OutputFormat::Json => print_json(&log)?,
        OutputFormat::Table => {
            print_success(&format!("Maintenance task {} created", log.id));
            println!(
                "Entity: {} {}, scheduled {}",
                log.entity_type,
                log.entity_id,
                format_date(&log.scheduled_date)
            );
        }
    }

    Ok(())
}

/// Mark a task completed, performed now
pub async fn complete_maintenance(
    client: &ApiClient,
    id: u64,
    cost: Option<f64>,
    notes: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let update = MaintenanceUpdate {
        status: Some("completed".to_string()),
        performed_date: Some(Utc::now().to_rfc3339()),
        cost,
        notes,
    };

    let log: MaintenanceLog = client.put(&format!("maintenance/{}", id), &update).await?;

    match format {
        OutputFormat::Json => print_json(&log)?,
        OutputFormat::Table => print_success(&format!("Maintenance task {} completed", log.id)),
    }

    Ok(())
}

pub async fn delete_maintenance(client: &ApiClient, id: u64, format: OutputFormat) -> Result<()> {
    let response: MessageResponse = client.delete(&format!("maintenance/{}", id)).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_info(&response.message),
    }

    Ok(())
}
