//! Capacity metrics derived from an inventory snapshot.
//!
//! Everything here is a pure function of its inputs. The catalog decides
//! which services appear in availability; raw totals in [`compute_stats`]
//! come from the inventory, so accounts filed under a service the catalog
//! does not know still count.

use std::collections::BTreeMap;

use models::{Account, Catalog, Inventory};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAvailability {
    pub id: String,
    pub name: String,
    pub price: u32,
    pub available: bool,
    pub available_accounts: usize,
    pub total_accounts: usize,
    pub used_slots: u64,
    pub total_slots: u64,
    pub available_slots: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub count: usize,
    pub available: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_accounts: usize,
    pub services: usize,
    pub service_stats: BTreeMap<String, ServiceStats>,
}

/// Slots in use on one account, never above its capacity.
fn used_slots(acc: &Account) -> u64 {
    u64::from(acc.current_users.min(acc.max_users))
}

fn summarize(id: &str, name: &str, price: u32, accounts: &[Account]) -> ServiceAvailability {
    let available_accounts = accounts.iter().filter(|a| a.is_available()).count();
    let total_slots: u64 = accounts.iter().map(|a| u64::from(a.max_users)).sum();
    let used: u64 = accounts.iter().map(used_slots).sum();
    ServiceAvailability {
        id: id.to_string(),
        name: name.to_string(),
        price,
        available: available_accounts > 0,
        available_accounts,
        total_accounts: accounts.len(),
        used_slots: used,
        total_slots,
        available_slots: total_slots.saturating_sub(used),
    }
}

/// One entry per catalog service, in catalog order.
pub fn compute_availability(inventory: &Inventory, catalog: &Catalog) -> Vec<ServiceAvailability> {
    catalog
        .services()
        .iter()
        .map(|svc| {
            let accounts = inventory.get(&svc.id).map(Vec::as_slice).unwrap_or(&[]);
            summarize(&svc.id, &svc.name, svc.price, accounts)
        })
        .collect()
}

pub fn compute_stats(inventory: &Inventory) -> InventoryStats {
    let service_stats = inventory
        .iter()
        .map(|(service, accounts)| {
            let stats = ServiceStats {
                count: accounts.len(),
                available: accounts.iter().filter(|a| a.is_available()).count(),
            };
            (service.clone(), stats)
        })
        .collect();
    InventoryStats {
        total_accounts: models::inventory::total_accounts(inventory),
        services: inventory.len(),
        service_stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{NewAccountInput, Service};

    fn account(service: &str, id: &str, current: u32, max: u32) -> Account {
        let mut acc = NewAccountInput {
            service: Some(service.into()),
            email: Some("x@example.com".into()),
            password: Some("pw".into()),
            ..Default::default()
        }
        .into_account(id.into(), service, chrono::Utc::now())
        .unwrap();
        acc.current_users = current;
        acc.max_users = max;
        acc
    }

    fn netflix_catalog() -> Catalog {
        Catalog::new([Service::new("netflix", "Netflix", 150)])
    }

    #[test]
    fn full_account_is_unavailable_even_with_stale_flag() {
        let mut acc = account("netflix", "n1", 5, 5);
        acc.fully_used = false;
        let mut inv = Inventory::new();
        inv.insert("netflix".into(), vec![acc]);

        let out = compute_availability(&inv, &netflix_catalog());
        assert_eq!(out.len(), 1);
        let n = &out[0];
        assert!(!n.available);
        assert_eq!(n.available_accounts, 0);
        assert_eq!(n.available_slots, 0);
        assert_eq!(n.used_slots, 5);
        assert_eq!(n.total_slots, 5);
        assert_eq!(n.price, 150);
    }

    #[test]
    fn slots_add_up_and_never_go_negative() {
        let mut inv = Inventory::new();
        inv.insert(
            "netflix".into(),
            vec![account("netflix", "a", 2, 5), account("netflix", "b", 9, 4), account("netflix", "c", 0, 3)],
        );
        let n = &compute_availability(&inv, &netflix_catalog())[0];
        assert_eq!(n.total_slots, 12);
        assert_eq!(n.used_slots, 6);
        assert_eq!(n.available_slots, n.total_slots - n.used_slots);
        assert_eq!(n.available_accounts, 2);
        assert!(n.available);
    }

    #[test]
    fn catalog_services_without_accounts_report_zero() {
        let inv = Inventory::new();
        let out = compute_availability(&inv, Catalog::builtin());
        assert_eq!(out.len(), Catalog::builtin().len());
        assert!(out.iter().all(|s| !s.available && s.total_slots == 0 && s.available_slots == 0));
        assert_eq!(out[0].id, "netflix");
    }

    #[test]
    fn unknown_services_count_in_stats_only() {
        let mut inv = Inventory::new();
        inv.insert("netflix".into(), vec![account("netflix", "n1", 0, 5), account("netflix", "n2", 5, 5)]);
        inv.insert("mystery".into(), vec![account("mystery", "m1", 0, 5)]);

        let avail = compute_availability(&inv, &netflix_catalog());
        assert!(avail.iter().all(|s| s.id != "mystery"));

        let stats = compute_stats(&inv);
        assert_eq!(stats.total_accounts, 3);
        assert_eq!(stats.services, 2);
        assert_eq!(stats.service_stats["netflix"], ServiceStats { count: 2, available: 1 });
        assert_eq!(stats.service_stats["mystery"], ServiceStats { count: 1, available: 1 });
    }

    #[test]
    fn availability_is_deterministic() {
        let mut inv = Inventory::new();
        inv.insert("netflix".into(), vec![account("netflix", "n1", 1, 5)]);
        let catalog = Catalog::builtin();
        assert_eq!(compute_availability(&inv, catalog), compute_availability(&inv, catalog));
        assert_eq!(compute_stats(&inv), compute_stats(&inv));
    }
}
