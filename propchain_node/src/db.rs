//! Typed collections over a shared storage backend

use crate::models::{
    Contract, Deposit, MaintenancePayment, Message, Notification, Property, RentPayment, Review,
    SystemLog, Ticket, User,
};
use crate::storage::{Collection, Storage};
use log::error;
use std::sync::Arc;

pub struct Database {
    storage: Arc<dyn Storage>,
    pub users: Collection<User>,
    pub properties: Collection<Property>,
    pub deposits: Collection<Deposit>,
    pub rent_payments: Collection<RentPayment>,
    pub maintenance_payments: Collection<MaintenancePayment>,
    pub contracts: Collection<Contract>,
    pub messages: Collection<Message>,
    pub notifications: Collection<Notification>,
    pub system_logs: Collection<SystemLog>,
    pub tickets: Collection<Ticket>,
    pub reviews: Collection<Review>,
}

impl Database {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            users: Collection::new(storage.clone()),
            properties: Collection::new(storage.clone()),
            deposits: Collection::new(storage.clone()),
            rent_payments: Collection::new(storage.clone()),
            maintenance_payments: Collection::new(storage.clone()),
            contracts: Collection::new(storage.clone()),
            messages: Collection::new(storage.clone()),
            notifications: Collection::new(storage.clone()),
            system_logs: Collection::new(storage.clone()),
            tickets: Collection::new(storage.clone()),
            reviews: Collection::new(storage.clone()),
            storage,
        }
    }

    /// In-memory database, used by tests and by default
    pub fn in_memory() -> Self {
        Self::new(Arc::new(crate::storage::MemoryStorage::new()))
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Append an audit entry. Failures are logged and never surface to callers.
    pub async fn record_log(&self, entry: SystemLog) {
        if let Err(e) = self.system_logs.insert(entry).await {
            error!("[LOG] Logging failed: {}", e);
        }
    }
}
