//! Read models for the dashboard: graph layout and system statistics

use crate::models::{ComponentStatus, Node, NodeKind, Pipe};
use serde::{Deserialize, Serialize};

/// Edges at or above this fraction of capacity are drawn as "high"
pub const HIGH_FLOW_RATIO: f64 = 0.8;

/// Pipes above this fraction of capacity count as vulnerable
pub const VULNERABLE_FLOW_RATIO: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub pressure: Option<f64>,
    pub status: ComponentStatus,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLoad {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub length: Option<f64>,
    pub current_flow: Option<f64>,
    pub flow_capacity: Option<f64>,
    pub status: EdgeLoad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_nodes: usize,
    pub active_nodes: usize,
    pub down_nodes: usize,
    pub unreported_nodes: usize,
    pub total_flow: f64,
    pub ideal_flow: f64,
    pub flow_difference: f64,
    pub avg_pressure: f64,
    pub current_leaks: usize,
    pub most_vulnerable_pipe: String,
    pub sensor_reporting_percentage: f64,
}

/// Frontend coordinates: longitude and latitude scaled by 100
fn position(node: &Node) -> Position {
    Position {
        x: node.longitude.unwrap_or(0.0) * 100.0,
        y: node.latitude.unwrap_or(0.0) * 100.0,
    }
}

fn edge_load(pipe: &Pipe) -> EdgeLoad {
    let flow = pipe.current_flow.unwrap_or(0.0);
    let capacity = pipe.flow_capacity.unwrap_or(0.0);
    if flow < capacity * HIGH_FLOW_RATIO {
        EdgeLoad::Normal
    } else {
        EdgeLoad::High
    }
}

pub fn build_graph(nodes: &[Node], pipes: &[Pipe]) -> GraphData {
    GraphData {
        nodes: nodes
            .iter()
            .map(|n| GraphNode {
                id: n.id.clone(),
                name: n.name.clone(),
                kind: n.kind,
                pressure: n.pressure,
                status: n.status,
                position: position(n),
            })
            .collect(),
        edges: pipes
            .iter()
            .map(|p| GraphEdge {
                id: p.id.clone(),
                source: p.source_node_id.clone(),
                target: p.target_node_id.clone(),
                length: p.length,
                current_flow: p.current_flow,
                flow_capacity: p.flow_capacity,
                status: edge_load(p),
            })
            .collect(),
    }
}

/// Aggregate statistics. `pipes` is expected in id order.
pub fn system_stats(nodes: &[Node], pipes: &[Pipe]) -> SystemStats {
    let count = |status: ComponentStatus| nodes.iter().filter(|n| n.status == status).count();

    let total_nodes = nodes.len();
    let total_flow: f64 = pipes.iter().filter_map(|p| p.current_flow).sum();
    let ideal_flow: f64 = pipes.iter().filter_map(|p| p.flow_capacity).sum();

    let pressures: Vec<f64> = nodes.iter().filter_map(|n| n.pressure).collect();
    let avg_pressure = if pressures.is_empty() {
        0.0
    } else {
        pressures.iter().sum::<f64>() / pressures.len() as f64
    };

    let most_vulnerable_pipe = pipes
        .iter()
        .find(|p| match (p.current_flow, p.flow_capacity) {
            (Some(flow), Some(capacity)) => flow > capacity * VULNERABLE_FLOW_RATIO,
            _ => false,
        })
        .map(|p| p.id.clone())
        .unwrap_or_else(|| "None".to_string());

    let reporting = nodes
        .iter()
        .filter(|n| matches!(n.status, ComponentStatus::Active | ComponentStatus::Demand))
        .count();
    let sensor_reporting_percentage = if total_nodes > 0 {
        reporting as f64 / total_nodes as f64 * 100.0
    } else {
        0.0
    };

    SystemStats {
        total_nodes,
        active_nodes: count(ComponentStatus::Active),
        down_nodes: count(ComponentStatus::Offline),
        unreported_nodes: count(ComponentStatus::Unreported),
        total_flow,
        ideal_flow,
        flow_difference: ideal_flow - total_flow,
        avg_pressure,
        current_leaks: count(ComponentStatus::Leak),
        most_vulnerable_pipe,
        sensor_reporting_percentage,
    }
}
