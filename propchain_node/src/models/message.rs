use crate::storage::{new_object_id, Document, Timestamps};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

/// Chat message between two wallets, optionally carrying a price offer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub is_offer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_status: Option<OfferStatus>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Message {
    pub fn involves(&self, wallet: &str) -> bool {
        self.sender == wallet || self.receiver == wallet
    }

    pub fn between(&self, a: &str, b: &str) -> bool {
        (self.sender == a && self.receiver == b) || (self.sender == b && self.receiver == a)
    }
}

impl Document for Message {
    const COLLECTION: &'static str = "messages";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    /// Recipient wallet
    pub recipient: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationType,
    #[serde(default)]
    pub read: bool,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Notification {
    pub fn new(recipient: &str, title: impl Into<String>, message: impl Into<String>, kind: NotificationType) -> Self {
        Self {
            id: new_object_id(),
            recipient: recipient.to_string(),
            title: title.into(),
            message: message.into(),
            kind,
            read: false,
            timestamps: Timestamps::now(),
        }
    }
}

impl Document for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_matching() {
        let msg = Message {
            id: new_object_id(),
            sender: "0xaa".into(),
            receiver: "0xbb".into(),
            content: "hi".into(),
            read: false,
            is_offer: false,
            offer_amount: None,
            offer_status: None,
            timestamps: Timestamps::now(),
        };
        assert!(msg.involves("0xbb"));
        assert!(!msg.involves("0xcc"));
        assert!(msg.between("0xbb", "0xaa"));
        assert!(!msg.between("0xaa", "0xcc"));
    }

    #[test]
    fn test_notification_type_wire_name() {
        let n = Notification::new("0xaa", "t", "m", NotificationType::Success);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "success");
        assert_eq!(json["read"], false);
    }
}
