use std::collections::{BTreeMap, HashSet};

use crate::account::Account;
use crate::catalog::Catalog;

/// Service id -> accounts in insertion order.
pub type Inventory = BTreeMap<String, Vec<Account>>;

pub fn total_accounts(inventory: &Inventory) -> usize {
    inventory.values().map(Vec::len).sum()
}

pub fn contains_id(inventory: &Inventory, id: &str) -> bool {
    inventory.values().flatten().any(|a| a.id == id)
}

pub fn find<'a>(inventory: &'a Inventory, service: &str, id: &str) -> Option<&'a Account> {
    inventory.get(service)?.iter().find(|a| a.id == id)
}

pub fn find_mut<'a>(inventory: &'a mut Inventory, service: &str, id: &str) -> Option<&'a mut Account> {
    inventory.get_mut(service)?.iter_mut().find(|a| a.id == id)
}

/// Replacement id for the record at `pos` of `service`: a pure function of
/// the inventory, so every read of the same file agrees on it.
fn repaired_id(service: &str, pos: usize, taken: &HashSet<String>) -> String {
    let base = format!("{service}_{pos}");
    let mut candidate = base.clone();
    let mut n = 1;
    while taken.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    candidate
}

/// Bring every record back in line with the account invariants.
///
/// Records missing an id, or repeating one already seen, get a replacement
/// id so ids stay unique across the whole inventory. Returns how many ids
/// were replaced.
pub fn reconcile(inventory: &mut Inventory, catalog: &Catalog) -> usize {
    let mut taken: HashSet<String> = inventory
        .values()
        .flatten()
        .filter(|a| !a.id.is_empty())
        .map(|a| a.id.clone())
        .collect();
    let mut seen = HashSet::new();
    let mut repaired = 0;
    for (service, accounts) in inventory.iter_mut() {
        let name = catalog.display_name(service).to_string();
        for (pos, acc) in accounts.iter_mut().enumerate() {
            acc.reconcile(service, &name);
            if acc.id.is_empty() || !seen.insert(acc.id.clone()) {
                acc.id = repaired_id(service, pos, &taken);
                taken.insert(acc.id.clone());
                seen.insert(acc.id.clone());
                repaired += 1;
            }
        }
    }
    repaired
}
