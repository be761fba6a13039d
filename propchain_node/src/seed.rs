//! Demo data loaded into an empty database
//!
//! Two accounts (`admin`/`admin` and `test`/`test`), each with a funded demo
//! wallet, plus six listings owned by the admin wallet. Listings are
//! registered in the PropertyRegistry when the chain is reachable; otherwise
//! they get an offline id so the catalogue is still browsable.

use crate::auth::{generate_wallet, hash_password, keccak_id, AuthError};
use crate::chain::{Ledger, PropertyListing};
use crate::db::Database;
use crate::models::{
    normalize_wallet, ListingType, LogType, Property, PropertyAddress, PropertyDetails,
    PropertyStatus, SystemLog, User, Wallet, WalletType,
};
use crate::storage::{new_object_id, StorageError, Timestamps};
use log::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub properties: usize,
    /// Listings that received a chain-issued id
    pub registered_on_chain: usize,
}

struct SeedListing {
    property_type: &'static str,
    city: &'static str,
    district: &'static str,
    street: &'static str,
    rooms: u32,
    square_meters: f64,
    floor: i32,
    furnished: bool,
    listing_type: ListingType,
    price: u64,
    maintenance_fee: u64,
}

const LISTINGS: [SeedListing; 6] = [
    SeedListing {
        property_type: "House",
        city: "Istanbul",
        district: "Sariyer",
        street: "Bosphorus View 1",
        rooms: 5,
        square_meters: 250.0,
        floor: 1,
        furnished: true,
        listing_type: ListingType::Sale,
        price: 15_000_000,
        maintenance_fee: 0,
    },
    SeedListing {
        property_type: "House",
        city: "Bodrum",
        district: "Kalkan",
        street: "Seaside Villa 4",
        rooms: 4,
        square_meters: 200.0,
        floor: 1,
        furnished: true,
        listing_type: ListingType::Sale,
        price: 12_000_000,
        maintenance_fee: 0,
    },
    SeedListing {
        property_type: "Apartment",
        city: "Ankara",
        district: "Cankaya",
        street: "Diplomatic St. 10",
        rooms: 3,
        square_meters: 140.0,
        floor: 3,
        furnished: true,
        listing_type: ListingType::Rent,
        price: 25_000,
        maintenance_fee: 1_500,
    },
    SeedListing {
        property_type: "Apartment",
        city: "Izmir",
        district: "Alsancak",
        street: "Kordon Boyu 5",
        rooms: 2,
        square_meters: 90.0,
        floor: 5,
        furnished: false,
        listing_type: ListingType::Rent,
        price: 18_000,
        maintenance_fee: 1_000,
    },
    // Cheap listings for trying purchases with demo funds
    SeedListing {
        property_type: "Tiny House",
        city: "Bursa",
        district: "Uludag",
        street: "Mountain Path 1",
        rooms: 1,
        square_meters: 30.0,
        floor: 0,
        furnished: true,
        listing_type: ListingType::Sale,
        price: 1_000,
        maintenance_fee: 0,
    },
    SeedListing {
        property_type: "Studio",
        city: "Eskisehir",
        district: "Odunpazari",
        street: "Student St. 4",
        rooms: 1,
        square_meters: 40.0,
        floor: 2,
        furnished: true,
        listing_type: ListingType::Rent,
        price: 1_000,
        maintenance_fee: 200,
    },
];

impl SeedListing {
    fn address(&self) -> PropertyAddress {
        PropertyAddress {
            city: Some(self.city.to_string()),
            district: Some(self.district.to_string()),
            street: Some(self.street.to_string()),
            ..Default::default()
        }
    }

    fn on_chain(&self) -> PropertyListing {
        PropertyListing {
            property_type: self.property_type.to_string(),
            location: self.address().location_line(),
            price: u128::from(self.price),
            maintenance_fee: u128::from(self.maintenance_fee),
        }
    }

    fn to_property(&self, property_id: String, owner: &str, tx_hash: Option<String>) -> Property {
        Property {
            id: new_object_id(),
            property_id,
            owner_wallet: owner.to_string(),
            property_type: self.property_type.to_string(),
            address: self.address(),
            details: PropertyDetails {
                rooms: Some(self.rooms),
                square_meters: Some(self.square_meters),
                floor: Some(self.floor),
                furnished: Some(self.furnished),
            },
            listing_type: self.listing_type,
            price: self.price as f64,
            maintenance_fee: Some(self.maintenance_fee as f64),
            tenant_requirements: String::new(),
            status: PropertyStatus::Available,
            blockchain_tx_hash: tx_hash,
            timestamps: Timestamps::now(),
        }
    }
}

/// Build a seed account with one funded demo wallet. Returns the user and
/// the wallet's private key.
async fn seed_user(
    ledger: &dyn Ledger,
    username: &str,
    password: &str,
    roles: &[&str],
    alias: &str,
) -> Result<(User, String), SeedError> {
    let generated = generate_wallet();
    match ledger.fund_wallet(&generated.address).await {
        Ok(tx_hash) => info!("[Seed] Funded {} ({})", generated.address, tx_hash),
        Err(e) => warn!("[Seed] Failed to fund {}: {}", generated.address, e),
    }

    let mut user = User::new(username, hash_password(password)?);
    user.roles = roles.iter().map(|r| r.to_string()).collect();
    user.add_wallet(Wallet {
        address: normalize_wallet(&generated.address),
        alias: alias.to_string(),
        wallet_type: WalletType::Demo,
        private_key: Some(generated.private_key.clone()),
    });
    Ok((user, generated.private_key))
}

/// Clear users and properties, then load the demo data
pub async fn seed_database(db: &Database, ledger: &dyn Ledger) -> Result<SeedSummary, SeedError> {
    info!("[Seed] Clearing and seeding database...");
    db.users.clear().await?;
    db.properties.clear().await?;

    let (admin, admin_key) = seed_user(
        ledger,
        "admin",
        "admin",
        &["admin", "owner", "manager"],
        "Super Admin Wallet",
    )
    .await?;
    let (tenant, _) = seed_user(ledger, "test", "test", &["tenant"], "Test Tenant Wallet").await?;
    let admin_wallet = admin.wallet_addresses().into_iter().next().unwrap_or_default();
    db.users.insert_many(vec![admin, tenant]).await?;
    info!("[Seed] Created 'admin' user (pass: admin).");
    info!("[Seed] Created 'test' user (pass: test).");

    let mut properties = Vec::with_capacity(LISTINGS.len());
    let mut registered_on_chain = 0;
    for listing in &LISTINGS {
        let property = match ledger.register_property(&admin_key, &listing.on_chain()).await {
            Ok(registration) => {
                info!(
                    "[Seed] Registered {} on chain: {}",
                    listing.property_type, registration.property_id
                );
                registered_on_chain += 1;
                listing.to_property(registration.property_id, &admin_wallet, Some(registration.tx_hash))
            }
            Err(e) => {
                let offline_id = keccak_id(&format!("seed:{}", listing.street));
                warn!(
                    "[Seed] Could not register {} on chain ({}); using offline id {}",
                    listing.property_type, e, offline_id
                );
                listing.to_property(offline_id, &admin_wallet, None)
            }
        };
        properties.push(property);
    }
    let properties = db.properties.insert_many(properties).await?;
    info!("[Seed] Saved {} properties to DB.", properties.len());

    let summary = SeedSummary {
        users: 2,
        properties: properties.len(),
        registered_on_chain,
    };
    db.record_log(SystemLog::new(
        LogType::System,
        "SEED_COMPLETED",
        format!(
            "Seeded {} users and {} properties ({} on chain)",
            summary.users, summary.properties, summary.registered_on_chain
        ),
    ))
    .await;
    info!("[Seed] Seeding process completed successfully!");
    Ok(summary)
}

/// Seed when the database has no users, or unconditionally with `force`
pub async fn ensure_seeded(
    db: &Database,
    ledger: &dyn Ledger,
    force: bool,
) -> Result<Option<SeedSummary>, SeedError> {
    if !force && db.users.count(|_| true).await? > 0 {
        info!("[Seed] Database already populated.");
        return Ok(None);
    }
    seed_database(db, ledger).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::chain::DisabledLedger;

    #[tokio::test]
    async fn test_offline_seed() {
        let db = Database::in_memory();
        let summary = seed_database(&db, &DisabledLedger).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                users: 2,
                properties: 6,
                registered_on_chain: 0
            }
        );

        let admin = db.users.find_one(|u| u.username == "admin").await.unwrap().unwrap();
        assert!(verify_password("admin", &admin.password));
        assert_eq!(admin.roles, vec!["admin", "owner", "manager"]);
        assert_eq!(admin.wallets[0].alias, "Super Admin Wallet");
        assert_eq!(admin.active_wallet.as_deref(), Some(admin.wallets[0].address.as_str()));

        let studio = db
            .properties
            .find_one(|p| p.property_type == "Studio")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(studio.property_id, keccak_id("seed:Student St. 4"));
        assert_eq!(studio.owner_wallet, admin.wallets[0].address);
        assert_eq!(studio.blockchain_tx_hash, None);

        let logs = db.system_logs.all().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action.as_deref(), Some("SEED_COMPLETED"));
    }

    #[tokio::test]
    async fn test_ensure_seeded_respects_existing_data() {
        let db = Database::in_memory();
        assert!(ensure_seeded(&db, &DisabledLedger, false).await.unwrap().is_some());
        assert!(ensure_seeded(&db, &DisabledLedger, false).await.unwrap().is_none());

        // Reseeding replaces rather than duplicates
        ensure_seeded(&db, &DisabledLedger, true).await.unwrap();
        assert_eq!(db.users.count(|_| true).await.unwrap(), 2);
        assert_eq!(db.properties.count(|_| true).await.unwrap(), 6);
    }
}
