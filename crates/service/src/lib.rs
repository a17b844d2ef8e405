//! Service layer for the account panel.
//! - `storage`: durable inventory file with serialized writers.
//! - `availability`: pure capacity metrics over an inventory snapshot.
//! - `accounts`: admin operations (list/add/delete, slots, search).
//! - `auth`: single-admin session gateway.
//! - `proxy`: authenticated forwarding to the upstream account API.

pub mod accounts;
pub mod auth;
pub mod availability;
pub mod errors;
pub mod metrics;
pub mod pagination;
pub mod proxy;
pub mod runtime;
pub mod storage;
#[cfg(test)]
pub mod test_support;
