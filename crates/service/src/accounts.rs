use std::sync::Arc;

use chrono::Utc;
use models::{account::generate_account_id, inventory, Account, Catalog, Inventory, NewAccountInput, Service};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::availability::{self, InventoryStats, ServiceAvailability};
use crate::errors::ServiceError;
use crate::pagination::{paginate, Page, Pagination};
use crate::storage::InventoryStore;

/// Occupancy filter used by the admin table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Available,
    Full,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AccountFilter {
    pub service: Option<String>,
    pub status: Option<StatusFilter>,
    /// Case-insensitive substring of email, username or notes
    pub q: Option<String>,
}

impl AccountFilter {
    pub fn is_empty(&self) -> bool {
        self.service.is_none() && matches!(self.status, None | Some(StatusFilter::All)) && self.q.is_none()
    }

    fn keeps_service(&self, service: &str) -> bool {
        match self.service.as_deref() {
            None | Some("") | Some("all") => true,
            Some(s) => s == service,
        }
    }

    fn keeps(&self, acc: &Account) -> bool {
        let status_ok = match self.status {
            None | Some(StatusFilter::All) => true,
            Some(StatusFilter::Available) => acc.is_available(),
            Some(StatusFilter::Full) => acc.is_full(),
        };
        let text_ok = match self.q.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(q) => acc.matches_text(q),
        };
        status_ok && text_ok
    }

    /// Filter inside groups; services left without accounts are dropped
    /// unless no filter is active.
    pub fn apply(&self, inv: Inventory) -> Inventory {
        if self.is_empty() {
            return inv;
        }
        inv.into_iter()
            .filter(|(service, _)| self.keeps_service(service))
            .map(|(service, accounts)| {
                let kept: Vec<Account> = accounts.into_iter().filter(|a| self.keeps(a)).collect();
                (service, kept)
            })
            .filter(|(_, accounts)| !accounts.is_empty())
            .collect()
    }
}

/// Full inventory plus the aggregate counts shown next to it.
#[derive(Clone, Debug)]
pub struct AccountListing {
    pub stats: InventoryStats,
    pub accounts: Inventory,
}

/// Admin operations over the inventory store.
///
/// Callers are expected to have passed the session gate before invoking
/// any mutating method.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<InventoryStore>,
}

impl AccountService {
    pub fn new(store: Arc<InventoryStore>) -> Self {
        Self { store }
    }

    pub fn catalog(&self) -> &Catalog {
        self.store.catalog()
    }

    /// Static catalog; never touches the store.
    pub fn list_services(&self) -> &[Service] {
        self.store.catalog().services()
    }

    pub async fn snapshot(&self) -> Result<Inventory, ServiceError> {
        self.store.load().await
    }

    /// Grouped inventory with stats. Stats always describe the whole
    /// inventory, the account groups honour `filter`.
    pub async fn list_accounts(&self, filter: &AccountFilter) -> Result<AccountListing, ServiceError> {
        let inv = self.store.load().await?;
        let stats = availability::compute_stats(&inv);
        Ok(AccountListing { stats, accounts: filter.apply(inv) })
    }

    /// Flat, filtered, paginated listing in service then insertion order.
    pub async fn search_accounts(&self, filter: &AccountFilter, pagination: Pagination) -> Result<Page<Account>, ServiceError> {
        let inv = filter.apply(self.store.load().await?);
        let flat: Vec<Account> = inv.into_values().flatten().collect();
        Ok(paginate(flat, pagination))
    }

    pub async fn availability(&self) -> Result<Vec<ServiceAvailability>, ServiceError> {
        let inv = self.store.load().await?;
        Ok(availability::compute_availability(&inv, self.store.catalog()))
    }

    pub async fn stats(&self) -> Result<InventoryStats, ServiceError> {
        let inv = self.store.load().await?;
        Ok(availability::compute_stats(&inv))
    }

    #[instrument(skip(self, input), fields(service = input.service.as_deref().unwrap_or_default()))]
    pub async fn add_account(&self, input: NewAccountInput) -> Result<Account, ServiceError> {
        let service = input.validate()?.to_string();
        if !self.catalog().contains(&service) {
            warn!(event = "unknown_service", service = %service, "account filed under a service outside the catalog");
        }
        let service_name = self.catalog().display_name(&service).to_string();

        let created = self
            .store
            .update(move |inv| {
                let now = Utc::now();
                let mut id = generate_account_id(&service, now);
                while inventory::contains_id(inv, &id) {
                    id = generate_account_id(&service, now);
                }
                let account = input.into_account(id, &service_name, now)?;
                inv.entry(service).or_default().push(account.clone());
                Ok(account)
            })
            .await?;

        info!(event = "account_added", service = %created.service, account_id = %created.id, "account added");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&self, service: &str, account_id: &str) -> Result<Account, ServiceError> {
        let removed = self
            .store
            .update(|inv| {
                let accounts = inv.get_mut(service).ok_or_else(|| ServiceError::not_found("service"))?;
                let idx = accounts
                    .iter()
                    .position(|a| a.id == account_id)
                    .ok_or_else(|| ServiceError::not_found("account"))?;
                Ok(accounts.remove(idx))
            })
            .await?;

        info!(event = "account_removed", service, account_id, "account removed");
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn assign_slot(&self, service: &str, account_id: &str, consumer: &str) -> Result<Account, ServiceError> {
        let updated = self
            .store
            .update(|inv| {
                let acc = inventory::find_mut(inv, service, account_id).ok_or_else(|| ServiceError::not_found("account"))?;
                acc.assign_slot(consumer)?;
                Ok(acc.clone())
            })
            .await?;

        info!(
            event = "slot_assigned",
            service,
            account_id,
            current_users = updated.current_users,
            max_users = updated.max_users,
            "slot assigned"
        );
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn release_slot(&self, service: &str, account_id: &str, consumer: &str) -> Result<Account, ServiceError> {
        let updated = self
            .store
            .update(|inv| {
                let acc = inventory::find_mut(inv, service, account_id).ok_or_else(|| ServiceError::not_found("account"))?;
                acc.release_slot(consumer)?;
                Ok(acc.clone())
            })
            .await?;

        info!(event = "slot_released", service, account_id, current_users = updated.current_users, "slot released");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryBackend;
    use std::collections::HashSet;

    fn service() -> (AccountService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::default());
        let store = InventoryStore::with_backend(backend.clone(), Arc::new(Catalog::builtin().clone()));
        (AccountService::new(Arc::new(store)), backend)
    }

    fn service_over(raw: &str) -> AccountService {
        let backend = Arc::new(MemoryBackend::with_bytes(raw.as_bytes()));
        let store = InventoryStore::with_backend(backend, Arc::new(Catalog::builtin().clone()));
        AccountService::new(Arc::new(store))
    }

    fn input(service: &str, email: &str) -> NewAccountInput {
        NewAccountInput {
            service: Some(service.into()),
            email: Some(email.into()),
            password: Some("pw".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_then_list_includes_new_account() -> Result<(), anyhow::Error> {
        let (svc, _) = service();
        let created = svc.add_account(input("netflix", "jane@example.com")).await?;
        assert!(created.id.starts_with("netflix_"));
        assert_eq!(created.current_users, 0);
        assert_eq!(created.service_name, "Netflix");

        let listing = svc.list_accounts(&AccountFilter::default()).await?;
        assert_eq!(listing.stats.total_accounts, 1);
        assert_eq!(listing.accounts["netflix"][0], created);
        Ok(())
    }

    #[tokio::test]
    async fn add_rejects_missing_fields_without_writing() {
        let (svc, backend) = service();
        let mut bad = input("netflix", "a@b.c");
        bad.password = Some("   ".into());
        assert!(matches!(svc.add_account(bad).await, Err(ServiceError::Validation(_))));
        assert!(backend.snapshot().is_none());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found_and_byte_identical() -> Result<(), anyhow::Error> {
        let (svc, backend) = service();
        let created = svc.add_account(input("netflix", "a@example.com")).await?;
        let before = backend.snapshot();

        assert!(matches!(svc.delete_account("netflix", "nope").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.delete_account("spotify", &created.id).await, Err(ServiceError::NotFound(_))));
        assert_eq!(backend.snapshot(), before);

        let removed = svc.delete_account("netflix", &created.id).await?;
        assert_eq!(removed.id, created.id);
        let listing = svc.list_accounts(&AccountFilter::default()).await?;
        assert!(listing.accounts.values().flatten().all(|a| a.id != created.id));
        assert!(matches!(svc.delete_account("netflix", &created.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_ids_list_stably_and_delete_by_listed_id() -> Result<(), anyhow::Error> {
        let svc = service_over(
            r#"{"netflix":[{"id":"dup","email":"n@example.com"}],"spotify":[{"id":"dup","email":"s@example.com"}]}"#,
        );
        let first = svc.list_accounts(&AccountFilter::default()).await?;
        let second = svc.list_accounts(&AccountFilter::default()).await?;
        let listed = first.accounts["spotify"][0].id.clone();
        assert_ne!(listed, "dup");
        assert_eq!(second.accounts["spotify"][0].id, listed);

        let removed = svc.delete_account("spotify", &listed).await?;
        assert_eq!(removed.email, "s@example.com");
        assert_eq!(svc.snapshot().await?["netflix"][0].id, "dup");
        Ok(())
    }

    #[tokio::test]
    async fn count_only_full_account_can_be_freed() -> Result<(), anyhow::Error> {
        let svc = service_over(r#"{"netflix":[{"id":"n1","email":"a@example.com","currentUsers":3,"maxUsers":3}]}"#);
        assert!(matches!(svc.assign_slot("netflix", "n1", "new").await, Err(ServiceError::Conflict(_))));

        let freed = svc.release_slot("netflix", "n1", "someone").await?;
        assert_eq!(freed.current_users, 2);
        assert!(!freed.fully_used);

        let taken = svc.assign_slot("netflix", "n1", "new").await?;
        assert_eq!(taken.used_by, vec!["new".to_string()]);
        assert!(taken.fully_used);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_adds_are_all_kept() -> Result<(), anyhow::Error> {
        let (svc, _) = service();
        let n = 24;
        let mut handles = Vec::new();
        for i in 0..n {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.add_account(input("spotify", &format!("user{i}@example.com"))).await
            }));
        }
        let mut ids = HashSet::new();
        for h in handles {
            ids.insert(h.await??.id);
        }
        assert_eq!(ids.len(), n);
        let inv = svc.snapshot().await?;
        assert_eq!(inv["spotify"].len(), n);
        Ok(())
    }

    #[tokio::test]
    async fn slots_update_availability() -> Result<(), anyhow::Error> {
        let (svc, _) = service();
        let mut i = input("netflix", "a@example.com");
        i.max_users = Some(1);
        let acc = svc.add_account(i).await?;

        let updated = svc.assign_slot("netflix", &acc.id, "customer-1").await?;
        assert!(updated.fully_used);
        assert!(matches!(svc.assign_slot("netflix", &acc.id, "customer-2").await, Err(ServiceError::Conflict(_))));

        let netflix = svc.availability().await?.into_iter().find(|s| s.id == "netflix").unwrap();
        assert!(!netflix.available);
        assert_eq!(netflix.available_slots, 0);

        svc.release_slot("netflix", &acc.id, "customer-1").await?;
        assert!(matches!(svc.release_slot("netflix", &acc.id, "customer-1").await, Err(ServiceError::NotFound(_))));
        let netflix = svc.availability().await?.into_iter().find(|s| s.id == "netflix").unwrap();
        assert!(netflix.available);
        Ok(())
    }

    #[tokio::test]
    async fn filters_and_search() -> Result<(), anyhow::Error> {
        let (svc, _) = service();
        let mut full = input("netflix", "full@example.com");
        full.max_users = Some(1);
        let full = svc.add_account(full).await?;
        svc.assign_slot("netflix", &full.id, "c").await?;
        svc.add_account(input("netflix", "open@example.com")).await?;
        let mut noted = input("spotify", "s@example.com");
        noted.notes = Some("Family plan".into());
        svc.add_account(noted).await?;

        let only_full = AccountFilter { status: Some(StatusFilter::Full), ..Default::default() };
        let listing = svc.list_accounts(&only_full).await?;
        assert_eq!(listing.stats.total_accounts, 3);
        assert_eq!(listing.accounts.len(), 1);
        assert_eq!(listing.accounts["netflix"][0].id, full.id);

        let text = AccountFilter { q: Some("family".into()), ..Default::default() };
        let page = svc.search_accounts(&text, Pagination::default()).await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].service, "spotify");

        let by_service = AccountFilter { service: Some("netflix".into()), ..Default::default() };
        let page = svc.search_accounts(&by_service, Pagination::new(Some(1), Some(1))).await?;
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 2);
        Ok(())
    }

    #[test]
    fn list_services_is_catalog() {
        let (svc, backend) = service();
        assert_eq!(svc.list_services().len(), 36);
        assert!(backend.snapshot().is_none());
    }
}
