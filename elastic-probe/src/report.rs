//! Cluster report built from the info endpoint.

use serde_json::Value;
use tracing::{info, warn};

use elastic_client::{JsonMap, SearchClient};

use crate::ProbeError;

/// What the probe learned about the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub node_name: String,
    pub cluster_name: String,
    pub version: String,
    pub connected: bool,
}

impl ProbeReport {
    /// Build a report from an info response.
    ///
    /// `cluster_name` and `version.number` are required; the node name is
    /// optional.
    pub fn from_info(info: &JsonMap, connected: bool) -> Result<Self, ProbeError> {
        let cluster_name = info
            .get("cluster_name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::report("info response has no cluster_name"))?;

        let version = info
            .get("version")
            .and_then(|v| v.get("number"))
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::report("info response has no version.number"))?;

        let node_name = info.get("name").and_then(Value::as_str).unwrap_or_default();

        Ok(Self {
            node_name: node_name.to_string(),
            cluster_name: cluster_name.to_string(),
            version: version.to_string(),
            connected,
        })
    }
}

/// Query the cluster and log the report.
pub async fn report(client: &dyn SearchClient) -> Result<ProbeReport, ProbeError> {
    let info = client.info().await?;
    let connected = client.is_connected().await;
    if !connected {
        warn!("Cluster answered info but not ping");
    }

    let report = ProbeReport::from_info(&info, connected)?;
    info!(
        node = %report.node_name,
        cluster = %report.cluster_name,
        version = %report.version,
        connected = report.connected,
        "Elasticsearch cluster reachable"
    );
    Ok(report)
}
