use crate::storage::{Document, Timestamps};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl DepositStatus {
    /// Pending and accepted deposits hold a place in the queue
    pub fn is_active(self) -> bool {
        matches!(self, DepositStatus::Pending | DepositStatus::Accepted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    #[serde(rename = "_id")]
    pub id: String,
    /// Transaction hash of the on-chain deposit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_id: Option<String>,
    pub property_id: String,
    pub depositor_wallet: String,
    pub anonymous_id: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    #[serde(default)]
    pub status: DepositStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Document for Deposit {
    const COLLECTION: &'static str = "deposits";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn unique_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("depositId", self.deposit_id.clone())]
    }
}

/// Order a property's deposits the way the public queue lists them:
/// by position, unpositioned entries last, ties by arrival
pub fn sort_queue(deposits: &mut [Deposit]) {
    deposits.sort_by(|a, b| {
        let pa = a.queue_position.unwrap_or(u32::MAX);
        let pb = b.queue_position.unwrap_or(u32::MAX);
        pa.cmp(&pb)
            .then(a.timestamps.created_at.cmp(&b.timestamps.created_at))
            .then(a.id.cmp(&b.id))
    });
}

/// Next free position after every deposit the property has ever received.
/// `None` once the highest position is `u32::MAX`.
pub fn next_queue_position(deposits: &[Deposit], property_id: &str) -> Option<u32> {
    deposits
        .iter()
        .filter(|d| d.property_id == property_id)
        .filter_map(|d| d.queue_position)
        .max()
        .unwrap_or(0)
        .checked_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::new_object_id;

    fn deposit(property: &str, position: Option<u32>) -> Deposit {
        Deposit {
            id: new_object_id(),
            deposit_id: None,
            property_id: property.to_string(),
            depositor_wallet: "0xaa".to_string(),
            anonymous_id: "anon".to_string(),
            amount: 10.0,
            queue_position: position,
            status: DepositStatus::Pending,
            blockchain_tx_hash: None,
            timestamps: Timestamps::now(),
        }
    }

    #[test]
    fn test_next_queue_position_is_per_property() {
        let deposits = vec![
            deposit("p1", Some(1)),
            deposit("p1", Some(4)),
            deposit("p2", Some(9)),
            deposit("p1", None),
        ];
        assert_eq!(next_queue_position(&deposits, "p1"), Some(5));
        assert_eq!(next_queue_position(&deposits, "p3"), Some(1));
    }

    #[test]
    fn test_next_queue_position_at_upper_bound() {
        let deposits = vec![deposit("p1", Some(u32::MAX)), deposit("p2", Some(u32::MAX - 1))];
        assert_eq!(next_queue_position(&deposits, "p1"), None);
        assert_eq!(next_queue_position(&deposits, "p2"), Some(u32::MAX));
    }

    #[test]
    fn test_sort_queue_puts_unpositioned_last() {
        let mut deposits = vec![deposit("p", None), deposit("p", Some(2)), deposit("p", Some(1))];
        sort_queue(&mut deposits);
        let positions: Vec<_> = deposits.iter().map(|d| d.queue_position).collect();
        assert_eq!(positions, vec![Some(1), Some(2), None]);
    }

    #[test]
    fn test_active_statuses() {
        assert!(DepositStatus::Pending.is_active());
        assert!(DepositStatus::Accepted.is_active());
        assert!(!DepositStatus::Rejected.is_active());
        assert!(!DepositStatus::Withdrawn.is_active());
    }
}
