//! Pipeline network storage and read models

mod seed;
mod store;
mod views;

pub use seed::{mock_nodes, mock_pipes, mock_readings, seed_mock_network, SeedSummary};
pub use store::{InMemoryNetworkStore, NetworkRepository, MAX_READINGS_PER_NODE};
pub use views::{
    build_graph, system_stats, EdgeLoad, GraphData, GraphEdge, GraphNode, Position, SystemStats,
    HIGH_FLOW_RATIO, VULNERABLE_FLOW_RATIO,
};
