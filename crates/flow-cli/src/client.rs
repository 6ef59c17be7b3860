//! API client for the Flow Sentinel service

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the Flow Sentinel HTTP API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// `path` with each pair appended as an encoded query parameter
    fn url_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Send a request and decode the JSON body, surfacing the API's error message on failure
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.execute(self.client.get(url)).await
    }

    /// Make a GET request with query parameters
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url_with_query(path, query)?;
        self.execute(self.client.get(url)).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path)?;
        self.execute(self.client.post(url).json(body)).await
    }

    /// Make a POST request without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.execute(self.client.post(url)).await
    }

    /// Make a POST request with query parameters and no body
    pub async fn post_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url_with_query(path, query)?;
        self.execute(self.client.post(url)).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path)?;
        self.execute(self.client.put(url).json(body)).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        self.execute(self.client.delete(url)).await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_nodes: u64,
    pub active_nodes: u64,
    pub down_nodes: u64,
    pub unreported_nodes: u64,
    pub total_flow: f64,
    pub ideal_flow: f64,
    pub flow_difference: f64,
    pub avg_pressure: f64,
    pub current_leaks: u64,
    pub most_vulnerable_pipe: String,
    pub sensor_reporting_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipe {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub current_flow: Option<f64>,
    #[serde(default)]
    pub flow_capacity: Option<f64>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub flow_rate: Option<f64>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentPrediction {
    pub component_id: String,
    pub component_type: String,
    pub next_maintenance_date: String,
    pub days_until_maintenance: i64,
    pub priority: String,
    pub confidence: f64,
    pub source: String,
    pub maintenance_type: String,
    pub estimated_cost: f64,
    pub contributing_factors: Vec<String>,
    #[serde(default)]
    pub risk_if_delayed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceLog {
    pub id: u64,
    pub entity_type: String,
    pub entity_id: String,
    pub scheduled_date: String,
    #[serde(default)]
    pub performed_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: String,
    #[serde(default)]
    pub maintenance_type: Option<String>,
    #[serde(default)]
    pub technician: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMaintenance {
    pub entity_type: String,
    pub entity_id: String,
    pub scheduled_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakAlert {
    pub id: u64,
    pub entity_type: String,
    pub entity_id: String,
    pub alert_type: String,
    pub severity: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_resolved: bool,
    pub detected_at: String,
    #[serde(default)]
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakRiskAssessment {
    pub pipe_id: String,
    pub leak_probability: f64,
    pub risk_level: String,
    pub confidence: f64,
    pub contributing_factors: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub code: Option<u16>,
}
