//! Network overview commands

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, Node, Pipe, SystemStats};
use crate::output::{color_status, format_optional, print_json, print_table, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ComponentFilter {
    Pipe,
    Node,
}

#[derive(Tabled)]
struct PipeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "From")]
    source: String,
    #[tabled(rename = "To")]
    target: String,
    #[tabled(rename = "Material")]
    material: String,
    #[tabled(rename = "Flow")]
    flow: String,
    #[tabled(rename = "Capacity")]
    capacity: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Pressure")]
    pressure: String,
    #[tabled(rename = "Flow")]
    flow: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Show system statistics
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats: SystemStats = client.get("stats").await?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            println!("{}", "Network Statistics".bold());
            println!("{}", "=".repeat(40));
            println!(
                "Nodes:            {} total, {} active, {} down, {} unreported",
                stats.total_nodes,
                stats.active_nodes.to_string().green(),
                stats.down_nodes.to_string().red(),
                stats.unreported_nodes
            );
            println!(
                "Flow:             {:.0} / {:.0} L/min ({:.0} below ideal)",
                stats.total_flow, stats.ideal_flow, stats.flow_difference
            );
            println!("Average pressure: {:.2} bar", stats.avg_pressure);
            let leaks = if stats.current_leaks > 0 {
                stats.current_leaks.to_string().red().bold().to_string()
            } else {
                stats.current_leaks.to_string().green().to_string()
            };
            println!("Current leaks:    {}", leaks);
            println!("Most vulnerable:  {}", stats.most_vulnerable_pipe.cyan());
            println!("Sensors reporting: {:.1}%", stats.sensor_reporting_percentage);
        }
    }

    Ok(())
}

/// List pipes, nodes or both
pub async fn list_components(
    client: &ApiClient,
    filter: Option<ComponentFilter>,
    format: OutputFormat,
) -> Result<()> {
    let pipes: Vec<Pipe> = if filter != Some(ComponentFilter::Node) {
        client.get("pipes").await?
    } else {
        Vec::new()
    };
    let nodes: Vec<Node> = if filter != Some(ComponentFilter::Pipe) {
        client.get("nodes").await?
    } else {
        Vec::new()
    };

    match format {
        OutputFormat::Json => {
            print_json(&serde_json::json!({ "pipes": pipes, "nodes": nodes }))?;
        }
        OutputFormat::Table => {
            if filter != Some(ComponentFilter::Node) {
                println!("{}", "Pipes".bold());
                let rows: Vec<PipeRow> = pipes
                    .iter()
                    .map(|p| PipeRow {
                        id: p.id.clone(),
                        source: p.source_node_id.clone(),
                        target: p.target_node_id.clone(),
                        material: p.material.clone().unwrap_or_else(|| "-".to_string()),
                        flow: format_optional(p.current_flow, ""),
                        capacity: format_optional(p.flow_capacity, ""),
                        status: color_status(&p.status),
                    })
                    .collect();
                print_table(rows, "No pipes found");
            }
            if filter != Some(ComponentFilter::Pipe) {
                println!("{}", "Nodes".bold());
                let rows: Vec<NodeRow> = nodes
                    .iter()
                    .map(|n| NodeRow {
                        id: n.id.clone(),
                        name: n.name.clone().unwrap_or_default(),
                        kind: n.kind.clone(),
                        pressure: format_optional(n.pressure, " bar"),
                        flow: format_optional(n.flow_rate, ""),
                        status: color_status(&n.status),
                    })
                    .collect();
                print_table(rows, "No nodes found");
            }
        }
    }

    Ok(())
}
