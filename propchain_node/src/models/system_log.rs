use crate::storage::{new_object_id, Document, Timestamps};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogType {
    Blockchain,
    Transaction,
    System,
    UserAction,
    Contract,
}

/// Public audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLog {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LogType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Wallet or user id that caused the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl SystemLog {
    /// An empty `action` is stored as absent
    pub fn new(kind: LogType, action: &str, details: impl Into<String>) -> Self {
        Self {
            id: new_object_id(),
            kind,
            action: (!action.is_empty()).then(|| action.to_string()),
            details: Some(details.into()),
            actor: None,
            tx_hash: None,
            timestamp: Utc::now(),
            timestamps: Timestamps::now(),
        }
    }

    pub fn actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn tx_hash(mut self, tx_hash: Option<String>) -> Self {
        self.tx_hash = tx_hash;
        self
    }
}

impl Document for SystemLog {
    const COLLECTION: &'static str = "system_logs";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
