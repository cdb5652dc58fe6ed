// Read-only collaborator feeds: alerts, the immutable ledger and map layers.
//
// The visualization makes no assumption about where these records come from;
// a hardcoded mock array and a live JSON feed are interchangeable as long as
// the shapes below are preserved.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
    pub sector: String,
    pub timestamp: String,
    pub status: AlertStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_workers: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Confirmed,
    Pending,
}

/// One tamper-proof record from the alert ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub id: String,
    pub transaction_hash: String,
    pub block_number: u64,
    pub alert_id: String,
    pub alert_type: AlertKind,
    pub alert_title: String,
    pub timestamp: String,
    pub sector: String,
    pub gas_used: String,
    pub status: LedgerStatus,
    pub smart_contract_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// A named sector ring on the satellite map, as lon/lat coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSector {
    pub name: String,
    pub risk: RiskLevel,
    pub coordinates: Vec<[f64; 2]>,
}

/// Parses an alert feed from JSON, e.g. a snapshot of the live endpoint.
pub fn alerts_from_json(json: &str) -> anyhow::Result<Vec<Alert>> {
    Ok(serde_json::from_str(json)?)
}

/// Sample alert feed matching the reference dashboard.
pub fn mock_alerts() -> Vec<Alert> {
    vec![
        Alert {
            id: "1".into(),
            kind: AlertKind::Critical,
            title: "High Risk Rockfall Prediction".into(),
            description: "AI model predicts 85% probability of rockfall in Sector C".into(),
            sector: "Sector C".into(),
            timestamp: "2024-01-10 14:30:00".into(),
            status: AlertStatus::Active,
            affected_workers: Some(12),
        },
        Alert {
            id: "2".into(),
            kind: AlertKind::Warning,
            title: "Increased Vibration Detected".into(),
            description: "Seismic sensors report elevated vibration levels".into(),
            sector: "Sector B".into(),
            timestamp: "2024-01-10 13:45:00".into(),
            status: AlertStatus::Acknowledged,
            affected_workers: Some(8),
        },
        Alert {
            id: "3".into(),
            kind: AlertKind::Info,
            title: "Weather Alert".into(),
            description: "Heavy rainfall expected in the next 6 hours".into(),
            sector: "All Sectors".into(),
            timestamp: "2024-01-10 12:15:00".into(),
            status: AlertStatus::Active,
            affected_workers: None,
        },
    ]
}

/// Sample ledger feed matching the reference dashboard.
pub fn mock_ledger() -> Vec<LedgerRecord> {
    vec![
        LedgerRecord {
            id: "1".into(),
            transaction_hash:
                "0x1a2b3c4d5e6f7890abcdef1234567890abcdef1234567890abcdef1234567890".into(),
            block_number: 18_745_632,
            alert_id: "ALT-001".into(),
            alert_type: AlertKind::Critical,
            alert_title: "High Risk Rockfall Prediction".into(),
            timestamp: "2024-01-10 14:30:00".into(),
            sector: "Sector C".into(),
            gas_used: "21,000".into(),
            status: LedgerStatus::Confirmed,
            smart_contract_address: "0x742d35Cc8C4354c31E5c1d8b6dD8dE4C6aA77821".into(),
        },
        LedgerRecord {
            id: "2".into(),
            transaction_hash:
                "0x9876543210fedcba0987654321fedcba0987654321fedcba0987654321fedcba".into(),
            block_number: 18_745_598,
            alert_id: "ALT-002".into(),
            alert_type: AlertKind::Warning,
            alert_title: "Increased Vibration Detected".into(),
            timestamp: "2024-01-10 13:45:00".into(),
            sector: "Sector B".into(),
            gas_used: "21,000".into(),
            status: LedgerStatus::Confirmed,
            smart_contract_address: "0x742d35Cc8C4354c31E5c1d8b6dD8dE4C6aA77821".into(),
        },
    ]
}

/// Sample map layer feed: three sector rings around the pit.
pub fn mock_map_sectors() -> Vec<MapSector> {
    vec![
        MapSector {
            name: "Sector C".into(),
            risk: RiskLevel::High,
            coordinates: vec![
                [-110.81, 32.201],
                [-110.79, 32.201],
                [-110.79, 32.199],
                [-110.81, 32.199],
                [-110.81, 32.201],
            ],
        },
        MapSector {
            name: "Sector B".into(),
            risk: RiskLevel::Medium,
            coordinates: vec![
                [-110.82, 32.203],
                [-110.80, 32.203],
                [-110.80, 32.201],
                [-110.82, 32.201],
                [-110.82, 32.203],
            ],
        },
        MapSector {
            name: "Sector A".into(),
            risk: RiskLevel::Low,
            coordinates: vec![
                [-110.80, 32.199],
                [-110.78, 32.199],
                [-110.78, 32.197],
                [-110.80, 32.197],
                [-110.80, 32.199],
            ],
        },
    ]
}
