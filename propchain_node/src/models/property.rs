use crate::storage::{Document, Timestamps};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Rent,
    Sale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Available,
    Pending,
    Rented,
    Sold,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment_no: Option<String>,
}

impl PropertyAddress {
    /// "street, district, city", skipping empty parts
    pub fn location_line(&self) -> String {
        [&self.street, &self.district, &self.city]
            .iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub square_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub furnished: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(rename = "_id")]
    pub id: String,
    /// Identifier issued by the PropertyRegistry contract
    pub property_id: String,
    pub owner_wallet: String,
    pub property_type: String,
    #[serde(default)]
    pub address: PropertyAddress,
    #[serde(default)]
    pub details: PropertyDetails,
    pub listing_type: ListingType,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance_fee: Option<f64>,
    #[serde(default)]
    pub tenant_requirements: String,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Document for Property {
    const COLLECTION: &'static str = "properties";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamps_mut(&mut self) -> &mut Timestamps {
        &mut self.timestamps
    }

    fn unique_fields(&self) -> Vec<(&'static str, Option<String>)> {
        vec![("propertyId", Some(self.property_id.clone()))]
    }
}
