//! Flow Sentinel CLI
//!
//! A command-line tool for inspecting the pipeline network, maintenance
//! predictions, maintenance tasks and leak alerts.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{alerts, maintenance, network, predict};

/// Flow Sentinel CLI
#[derive(Parser)]
#[command(name = "fsctl")]
#[command(author, version, about = "CLI for Flow Sentinel pipeline monitoring", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FSCTL_API_URL env var)
    #[arg(long, env = "FSCTL_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show network statistics
    Stats,

    /// List pipes and nodes
    Components {
        /// Only list one kind of component
        #[arg(long, short)]
        kind: Option<network::ComponentFilter>,
    },

    /// Show the maintenance prediction for a component
    Predict {
        /// Pipe ID (or node ID with --node)
        id: String,

        /// Treat the ID as a node
        #[arg(long)]
        node: bool,
    },

    /// Manage maintenance tasks
    #[command(subcommand)]
    Maintenance(MaintenanceCommands),

    /// View and resolve leak alerts
    #[command(subcommand)]
    Alerts(AlertCommands),

    /// Assess leak risk for a pipe
    LeakRisk {
        /// Pipe ID
        pipe_id: String,
    },

    /// Show or change the saved CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum MaintenanceCommands {
    /// List maintenance tasks
    List {
        /// Filter by status (scheduled, in_progress, completed)
        #[arg(long)]
        status: Option<String>,

        /// Only tasks for this entity kind (pipe or node)
        #[arg(long, value_parser = ["pipe", "node"], requires = "entity_id")]
        entity_type: Option<String>,

        /// Only tasks for this pipe or node ID
        #[arg(long, requires = "entity_type")]
        entity_id: Option<String>,
    },

    /// Schedule a maintenance task
    Create {
        /// Entity kind (pipe or node)
        #[arg(long, value_parser = ["pipe", "node"])]
        entity_type: String,

        /// Pipe or node ID
        #[arg(long)]
        entity_id: String,

        /// Scheduled date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        scheduled: String,

        /// Maintenance type (inspection, repair, replacement, ...)
        #[arg(long = "type")]
        maintenance_type: Option<String>,

        #[arg(long)]
        technician: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Estimated cost
        #[arg(long)]
        cost: Option<f64>,
    },

    /// Mark a task completed
    Complete {
        /// Task ID
        id: u64,

        /// Actual cost
        #[arg(long)]
        cost: Option<f64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum AlertCommands {
    /// List active alerts
    List,

    /// Resolve an alert
    Resolve {
        /// Alert ID
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the saved configuration
    Show,

    /// Save the default API URL
    SetUrl { url: String },

    /// Save the default output format
    SetFormat { format: output::OutputFormat },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut saved = config::Config::load()?;

    let format = saved.resolve_format(cli.format);
    let api_url = saved.resolve_api_url(cli.api_url);

    // Connect lazily so config commands never need a valid URL
    let connect = || client::ApiClient::new(&api_url);

    // Execute command
    match cli.command {
        Commands::Stats => network::show_stats(&connect()?, format).await?,
        Commands::Components { kind } => {
            network::list_components(&connect()?, kind, format).await?;
        }
        Commands::Predict { id, node } => {
            predict::show_prediction(&connect()?, &id, node, format).await?;
        }
        Commands::LeakRisk { pipe_id } => {
            predict::show_leak_risk(&connect()?, &pipe_id, format).await?;
        }
        Commands::Maintenance(maintenance_cmd) => match maintenance_cmd {
            MaintenanceCommands::List {
                status,
                entity_type,
                entity_id,
            } => {
                let entity = entity_type.zip(entity_id);
                maintenance::list_maintenance(&connect()?, status, entity, format).await?;
            }
            MaintenanceCommands::Create {
                entity_type,
                entity_id,
                scheduled,
                maintenance_type,
                technician,
                notes,
                cost,
            } => {
                let options = maintenance::CreateOptions {
                    entity_type,
                    entity_id,
                    scheduled,
                    maintenance_type,
                    technician,
                    notes,
                    cost,
                };
                maintenance::create_maintenance(&connect()?, options, format).await?;
            }
            MaintenanceCommands::Complete { id, cost, notes } => {
                maintenance::complete_maintenance(&connect()?, id, cost, notes, format).await?;
            }
            MaintenanceCommands::Delete { id } => {
                maintenance::delete_maintenance(&connect()?, id, format).await?;
            }
        },
        Commands::Alerts(alert_cmd) => match alert_cmd {
            AlertCommands::List => alerts::list_alerts(&connect()?, format).await?,
            AlertCommands::Resolve { id } => alerts::resolve_alert(&connect()?, id, format).await?,
        },
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => {
                println!("Config file: {}", config::Config::config_path()?.display());
                println!("API URL:     {}", api_url);
                println!("Format:      {:?}", format);
            }
            ConfigCommands::SetUrl { url } => {
                url::Url::parse(&url)?;
                saved.api_url = Some(url);
                saved.save()?;
                output::print_success("API URL saved");
            }
            ConfigCommands::SetFormat { format } => {
                saved.default_format = Some(format);
                saved.save()?;
                output::print_success("Output format saved");
            }
        },
    }

    Ok(())
}
