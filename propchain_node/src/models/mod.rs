//! Marketplace records
//!
//! Every record serialises with camelCase field names and its id as `_id`, so
//! clients written against the Mongo-era API keep working unchanged.

pub mod contract;
pub mod deposit;
pub mod message;
pub mod payment;
pub mod property;
pub mod review;
pub mod system_log;
pub mod ticket;
pub mod user;

pub use contract::{Contract, ContractStatus, ContractType};
pub use deposit::{Deposit, DepositStatus};
pub use message::{Message, Notification, NotificationType, OfferStatus};
pub use payment::{MaintenancePayment, PaymentStatus, RentPayment};
pub use property::{ListingType, Property, PropertyAddress, PropertyDetails, PropertyStatus};
pub use review::Review;
pub use system_log::{LogType, SystemLog};
pub use ticket::{Ticket, TicketPriority, TicketResponse, TicketStatus};
pub use user::{User, UserView, Wallet, WalletType, WalletView};

use serde::de::DeserializeOwned;

/// Parse a client-supplied enum value, producing the validation message the
/// API reports for an unknown value
pub fn parse_enum<T: DeserializeOwned>(path: &str, value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| format!("`{}` is not a valid enum value for path `{}`.", value, path))
}

/// Wallet addresses are stored and compared in lowercase
pub fn normalize_wallet(address: &str) -> String {
    address.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enum_accepts_wire_names() {
        let status: DepositStatus = parse_enum("status", "withdrawn").unwrap();
        assert_eq!(status, DepositStatus::Withdrawn);
        let status: ContractStatus = parse_enum("status", "pending_payment").unwrap();
        assert_eq!(status, ContractStatus::PendingPayment);
        let kind: LogType = parse_enum("type", "USER_ACTION").unwrap();
        assert_eq!(kind, LogType::UserAction);
    }

    #[test]
    fn test_parse_enum_reports_path() {
        let err = parse_enum::<PropertyStatus>("status", "demolished").unwrap_err();
        assert_eq!(err, "`demolished` is not a valid enum value for path `status`.");
    }

    #[test]
    fn test_normalize_wallet() {
        assert_eq!(normalize_wallet(" 0xABCdef "), "0xabcdef");
    }
}
