//! Network persistence
//!
//! [`NetworkRepository`] is the seam between the HTTP layer and storage.
//! [`InMemoryNetworkStore`] keeps everything in `DashMap` shards.

use crate::models::{
    AlertType, EntityType, LeakAlert, MaintenanceLog, MaintenanceLogUpdate, NewLeakAlert, NewMaintenanceLog,
    NewSensorReading, Node, Pipe, SensorReading,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Upper bound on readings kept per node
pub const MAX_READINGS_PER_NODE: usize = 10_000;

#[async_trait]
pub trait NetworkRepository: Send + Sync {
    /// All pipes sorted by id
    async fn list_pipes(&self) -> Result<Vec<Pipe>>;
    async fn get_pipe(&self, id: &str) -> Result<Option<Pipe>>;
    async fn upsert_pipe(&self, pipe: Pipe) -> Result<()>;

    /// All nodes sorted by id
    async fn list_nodes(&self) -> Result<Vec<Node>>;
    async fn get_node(&self, id: &str) -> Result<Option<Node>>;
    async fn upsert_node(&self, node: Node) -> Result<()>;

    /// All tasks, most recently scheduled first
    async fn list_maintenance(&self) -> Result<Vec<MaintenanceLog>>;
    async fn get_maintenance(&self, id: u64) -> Result<Option<MaintenanceLog>>;
    async fn maintenance_for_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<MaintenanceLog>>;
    async fn create_maintenance(&self, new: NewMaintenanceLog) -> Result<MaintenanceLog>;
    /// Apply only the fields set in `update`; `None` if the task does not exist
    async fn update_maintenance(
        &self,
        id: u64,
        update: MaintenanceLogUpdate,
    ) -> Result<Option<MaintenanceLog>>;
    /// `false` if the task does not exist
    async fn delete_maintenance(&self, id: u64) -> Result<bool>;

    async fn record_reading(&self, new: NewSensorReading) -> Result<SensorReading>;
    /// Newest first, at most `limit`
    async fn readings_for_node(&self, node_id: &str, limit: usize) -> Result<Vec<SensorReading>>;

    async fn create_alert(&self, new: NewLeakAlert) -> Result<LeakAlert>;
    /// Store `new` unless the entity already has an unresolved alert of the
    /// same type. The check and the insert are atomic; `None` when skipped.
    async fn create_alert_unless_open(&self, new: NewLeakAlert) -> Result<Option<LeakAlert>>;
    /// Unresolved alerts, most recent first
    async fn active_alerts(&self) -> Result<Vec<LeakAlert>>;
    async fn alerts_for_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<LeakAlert>>;
    /// `None` if the alert does not exist
    async fn resolve_alert(&self, id: u64) -> Result<Option<LeakAlert>>;

    /// True when the store holds no nodes or pipes
    async fn is_empty(&self) -> Result<bool>;
}

#[derive(Debug)]
pub struct InMemoryNetworkStore {
    pipes: DashMap<String, Pipe>,
    nodes: DashMap<String, Node>,
    maintenance: DashMap<u64, MaintenanceLog>,
    readings: DashMap<String, Vec<SensorReading>>,
    alerts: DashMap<u64, LeakAlert>,
    /// Latest alert id per (entity_type, entity_id, alert_type)
    latest_alerts: DashMap<AlertKey, u64>,
    next_maintenance_id: AtomicU64,
    next_reading_id: AtomicU64,
    next_alert_id: AtomicU64,
}

impl InMemoryNetworkStore {
    pub fn new() -> Self {
        Self {
            pipes: DashMap::new(),
            nodes: DashMap::new(),
            maintenance: DashMap::new(),
            readings: DashMap::new(),
            alerts: DashMap::new(),
            latest_alerts: DashMap::new(),
            next_maintenance_id: AtomicU64::new(1),
            next_reading_id: AtomicU64::new(1),
            next_alert_id: AtomicU64::new(1),
        }
    }

    /// Counts of (nodes, pipes)
    pub fn component_counts(&self) -> (usize, usize) {
        (self.nodes.len(), self.pipes.len())
    }

    fn is_open(&self, alert_id: u64) -> bool {
        self.alerts
            .get(&alert_id)
            .is_some_and(|alert| !alert.is_resolved)
    }

    fn insert_alert(&self, new: NewLeakAlert) -> LeakAlert {
        let alert = LeakAlert {
            id: self.next_alert_id.fetch_add(1, Ordering::Relaxed),
            entity_type: new.entity_type,
            entity_id: new.entity_id,
            alert_type: new.alert_type,
            severity: new.severity,
            description: new.description,
            is_resolved: false,
            detected_at: new.detected_at.unwrap_or_else(Utc::now),
            resolved_at: None,
        };
        self.alerts.insert(alert.id, alert.clone());
        alert
    }
}

type AlertKey = (EntityType, String, AlertType);

fn alert_key(alert: &NewLeakAlert) -> AlertKey {
    (alert.entity_type, alert.entity_id.clone(), alert.alert_type)
}

impl Default for InMemoryNetworkStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_by_id<T: Clone>(map: &DashMap<String, T>) -> Vec<T> {
    let mut entries: Vec<(String, T)> = map
        .iter()
        .map(|e| (e.key().clone(), e.value().clone()))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.into_iter().map(|(_, v)| v).collect()
}

#[async_trait]
impl NetworkRepository for InMemoryNetworkStore {
    async fn list_pipes(&self) -> Result<Vec<Pipe>> {
        Ok(sorted_by_id(&self.pipes))
    }

    async fn get_pipe(&self, id: &str) -> Result<Option<Pipe>> {
        Ok(self.pipes.get(id).map(|p| p.clone()))
    }

    async fn upsert_pipe(&self, pipe: Pipe) -> Result<()> {
        self.pipes.insert(pipe.id.clone(), pipe);
        Ok(())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(sorted_by_id(&self.nodes))
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.nodes.get(id).map(|n| n.clone()))
    }

    async fn upsert_node(&self, node: Node) -> Result<()> {
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    async fn list_maintenance(&self) -> Result<Vec<MaintenanceLog>> {
        let mut logs: Vec<MaintenanceLog> = self.maintenance.iter().map(|e| e.value().clone()).collect();
        logs.sort_by(|a, b| b.scheduled_date.cmp(&a.scheduled_date).then(a.id.cmp(&b.id)));
        Ok(logs)
    }

    async fn get_maintenance(&self, id: u64) -> Result<Option<MaintenanceLog>> {
        Ok(self.maintenance.get(&id).map(|l| l.clone()))
    }

    async fn maintenance_for_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<MaintenanceLog>> {
        let logs = self.list_maintenance().await?;
        Ok(logs
            .into_iter()
            .filter(|l| l.entity_type == entity_type && l.entity_id == entity_id)
            .collect())
    }

    async fn create_maintenance(&self, new: NewMaintenanceLog) -> Result<MaintenanceLog> {
        let id = self.next_maintenance_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let log = MaintenanceLog {
            id,
            entity_type: new.entity_type,
            entity_id: new.entity_id,
            scheduled_date: new.scheduled_date,
            performed_date: new.performed_date,
            notes: new.notes,
            status: new.status.unwrap_or_default(),
            maintenance_type: new.maintenance_type,
            technician: new.technician,
            cost: new.cost,
            created_at: now,
            updated_at: now,
        };
        self.maintenance.insert(id, log.clone());
        debug!(id, entity_id = %log.entity_id, "Maintenance task created");
        Ok(log)
    }

    async fn update_maintenance(
        &self,
        id: u64,
        update: MaintenanceLogUpdate,
    ) -> Result<Option<MaintenanceLog>> {
        let Some(mut entry) = self.maintenance.get_mut(&id) else {
            return Ok(None);
        };
        let log = entry.value_mut();

        if let Some(date) = update.scheduled_date {
            log.scheduled_date = date;
        }
        if let Some(date) = update.performed_date {
            log.performed_date = Some(date);
        }
        if let Some(notes) = update.notes {
            log.notes = Some(notes);
        }
        if let Some(status) = update.status {
            log.status = status;
        }
        if let Some(kind) = update.maintenance_type {
            log.maintenance_type = Some(kind);
        }
        if let Some(technician) = update.technician {
            log.technician = Some(technician);
        }
        if let Some(cost) = update.cost {
            log.cost = Some(cost);
        }
        log.updated_at = Utc::now();

        Ok(Some(log.clone()))
    }

    async fn delete_maintenance(&self, id: u64) -> Result<bool> {
        Ok(self.maintenance.remove(&id).is_some())
    }

    async fn record_reading(&self, new: NewSensorReading) -> Result<SensorReading> {
        let reading = SensorReading {
            id: self.next_reading_id.fetch_add(1, Ordering::Relaxed),
            node_id: new.node_id,
            pressure: new.pressure,
            flow_rate: new.flow_rate,
            temperature: new.temperature,
            timestamp: new.timestamp.unwrap_or_else(Utc::now),
        };

        let mut history = self.readings.entry(reading.node_id.clone()).or_default();
        // Kept in timestamp order; late arrivals are inserted in place
        let pos = history.partition_point(|r| r.timestamp <= reading.timestamp);
        history.insert(pos, reading.clone());
        if history.len() > MAX_READINGS_PER_NODE {
            let excess = history.len() - MAX_READINGS_PER_NODE;
            history.drain(0..excess);
        }

        Ok(reading)
    }

    async fn readings_for_node(&self, node_id: &str, limit: usize) -> Result<Vec<SensorReading>> {
        Ok(self
            .readings
            .get(node_id)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_alert(&self, new: NewLeakAlert) -> Result<LeakAlert> {
        let entry = self.latest_alerts.entry(alert_key(&new));
        let alert = self.insert_alert(new);
        match entry {
            // An older alert is still open; keep pointing at it
            Entry::Occupied(latest) if self.is_open(*latest.get()) => {}
            entry => {
                entry.insert(alert.id);
            }
        }
        Ok(alert)
    }

    async fn create_alert_unless_open(&self, new: NewLeakAlert) -> Result<Option<LeakAlert>> {
        // The entry's shard lock is held until the new id is recorded
        let entry = self.latest_alerts.entry(alert_key(&new));
        if let Entry::Occupied(latest) = &entry {
            if self.is_open(*latest.get()) {
                return Ok(None);
            }
        }
        let alert = self.insert_alert(new);
        entry.insert(alert.id);
        Ok(Some(alert))
    }

    async fn active_alerts(&self) -> Result<Vec<LeakAlert>> {
        let mut alerts: Vec<LeakAlert> = self
            .alerts
            .iter()
            .filter(|e| !e.is_resolved)
            .map(|e| e.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.detected_at.cmp(&a.detected_at).then(a.id.cmp(&b.id)));
        Ok(alerts)
    }

    async fn alerts_for_entity(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Vec<LeakAlert>> {
        let mut alerts: Vec<LeakAlert> = self
            .alerts
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .map(|e| e.value().clone())
            .collect();
        alerts.sort_by(|a, b| b.detected_at.cmp(&a.detected_at).then(a.id.cmp(&b.id)));
        Ok(alerts)
    }

    async fn resolve_alert(&self, id: u64) -> Result<Option<LeakAlert>> {
        let Some(mut entry) = self.alerts.get_mut(&id) else {
            return Ok(None);
        };
        let alert = entry.value_mut();
        if !alert.is_resolved {
            alert.is_resolved = true;
            alert.resolved_at = Some(Utc::now());
        }
        Ok(Some(alert.clone()))
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.nodes.is_empty() && self.pipes.is_empty())
    }
}
