use crate::storage::{Document, Timestamps};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Paid,
    Unpaid,
    Overdue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentPayment {
    #[serde(rename = "_id")]
    pub id: String,
    pub rent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub tenant_wallet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_wallet: Option<String>,
    /// Billing month, YYYY-MM
    pub month: String,
    pub amount: f64,
    pub payment_date: DateTime<Utc>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub late_fee: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Document for RentPayment {
    const COLLECTION: &'static str = "rent_payments";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn unique_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("rentId", Some(self.rent_id.clone()))]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePayment {
    #[serde(rename = "_id")]
    pub id: String,
    pub payment_id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment_no: Option<String>,
    pub tenant_wallet: String,
    pub month: String,
    pub amount: f64,
    pub payment_date: DateTime<Utc>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Document for MaintenancePayment {
    const COLLECTION: &'static str = "maintenance_payments";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn unique_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("paymentId", Some(self.payment_id.clone()))]
    }
}

