//! Domain types for the shared-account inventory: the static service
//! catalog, account records and the inventory mapping persisted to disk.

pub mod account;
pub mod catalog;
pub mod errors;
pub mod inventory;

pub use account::{Account, NewAccountInput, DEFAULT_MAX_USERS};
pub use catalog::{Catalog, Service};
pub use inventory::Inventory;
