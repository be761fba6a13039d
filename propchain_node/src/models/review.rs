use crate::storage::{Document, Timestamps};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    pub property_id: String,
    pub user_wallet: String,
    /// 1 to 5 stars
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Document for Review {
    const COLLECTION: &'static str = "reviews";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }
}
