//! Pagination utilities for service layer
//!
//! Provides a simple `Pagination` struct and helpers to normalize inputs.

use serde::Serialize;

/// Pagination parameters
#[derive(Clone, Copy, Debug)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    /// items per page
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        let d = Self::default();
        Self { page: page.unwrap_or(d.page), per_page: per_page.unwrap_or(d.per_page) }
    }

    /// Clamp to sane defaults; returns `(page, per_page)`, page 1-based.
    pub fn normalize(self) -> (u32, u32) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, 100);
        (page, per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: 10 } }
}

/// One page of results
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

pub fn paginate<T>(items: Vec<T>, pagination: Pagination) -> Page<T> {
    let (page, per_page) = pagination.normalize();
    let total = items.len();
    let total_pages = total.div_ceil(per_page as usize).max(1) as u32;
    let start = (page as usize - 1).saturating_mul(per_page as usize);
    let items = items.into_iter().skip(start).take(per_page as usize).collect();
    Page { items, total, page, per_page, total_pages }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (page, per) = Pagination { page: 0, per_page: 0 }.normalize();
        assert_eq!(page, 1);
        assert_eq!(per, 1);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (page, per) = Pagination { page: 5, per_page: 1000 }.normalize();
        assert_eq!(page, 5);
        assert_eq!(per, 100);
    }

    #[test]
    fn default_values_are_sane() {
        let d = Pagination::default();
        assert_eq!(d.page, 1);
        assert_eq!(d.per_page, 10);
    }

    #[test]
    fn paginate_slices_and_counts_pages() {
        let items: Vec<u32> = (1..=23).collect();
        let p = paginate(items.clone(), Pagination::new(Some(3), None));
        assert_eq!(p.items, vec![21, 22, 23]);
        assert_eq!(p.total, 23);
        assert_eq!(p.total_pages, 3);

        let beyond = paginate(items, Pagination::new(Some(9), Some(10)));
        assert!(beyond.items.is_empty());

        let empty = paginate(Vec::<u32>::new(), Pagination::default());
        assert_eq!(empty.total_pages, 1);
    }
}
