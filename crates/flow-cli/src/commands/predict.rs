//! Maintenance prediction and leak risk commands

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, ComponentPrediction, LeakRiskAssessment};
use crate::output::{
    color_confidence, color_level, format_currency, format_date, format_percent, print_json,
    OutputFormat,
};

/// Show the maintenance prediction for a pipe, or a node with `node`
pub async fn show_prediction(
    client: &ApiClient,
    id: &str,
    node: bool,
    format: OutputFormat,
) -> Result<()> {
    let collection = if node { "nodes" } else { "pipes" };
    let path = format!("{}/{}/maintenance-prediction", collection, id);
    let prediction: ComponentPrediction = client.get(&path).await?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => {
            println!("{}", "Maintenance Prediction".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Component:   {} ({})",
                prediction.component_id.cyan(),
                prediction.component_type
            );
            println!(
                "Next due:    {} (in {} days)",
                format_date(&prediction.next_maintenance_date),
                prediction.days_until_maintenance
            );
            println!("Priority:    {}", color_level(&prediction.priority));
            println!("Type:        {}", prediction.maintenance_type);
            if let Some(risk) = &prediction.risk_if_delayed {
                println!("If delayed:  {} risk", color_level(risk));
            }
            println!("Est. cost:   {}", format_currency(prediction.estimated_cost));
            println!(
                "Confidence:  {} ({})",
                color_confidence(prediction.confidence),
                prediction.source
            );
            println!("\nContributing factors:");
            for factor in &prediction.contributing_factors {
                println!("  • {}", factor);
            }
        }
    }

    Ok(())
}

/// Show the leak risk assessment for a pipe
pub async fn show_leak_risk(client: &ApiClient, pipe_id: &str, format: OutputFormat) -> Result<()> {
    let risk: LeakRiskAssessment = client
        .post_query("predict/leak", &[("pipe_id", pipe_id)])
        .await?;

    match format {
        OutputFormat::Json => print_json(&risk)?,
        OutputFormat::Table => {
            println!("{}", "Leak Risk".bold());
            println!("{}", "=".repeat(50));
            println!("Pipe:        {}", risk.pipe_id.cyan());
            println!(
                "Risk:        {} ({})",
                color_level(&risk.risk_level),
                format_percent(risk.leak_probability)
            );
            println!("Confidence:  {}", color_confidence(risk.confidence));
            println!("Action:      {}", risk.recommendation);
            println!("\nContributing factors:");
            for factor in &risk.contributing_factors {
                println!("  • {}", factor);
            }
        }
    }

    Ok(())
}
