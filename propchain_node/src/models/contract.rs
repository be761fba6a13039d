use crate::storage::{Document, Timestamps};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    #[default]
    Rent,
    Sale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Draft,
    PendingPayment,
    Active,
    Terminated,
    Completed,
}

/// Signed lease or sale agreement between a tenant/buyer and an owner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(rename = "_id")]
    pub id: String,
    pub contract_id: String,
    pub property_id: String,
    pub tenant_wallet: String,
    pub owner_wallet: String,
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    pub price: f64,
    #[serde(default)]
    pub status: ContractStatus,
    #[serde(default)]
    pub tenant_signed: bool,
    #[serde(default)]
    pub owner_signed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Contract {
    pub fn is_party(&self, wallet: &str) -> bool {
        self.tenant_wallet == wallet || self.owner_wallet == wallet
    }
}

impl Document for Contract {
    const COLLECTION: &'static str = "contracts";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn unique_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("contractId", Some(self.contract_id.clone()))]
    }
}
