//! Pagination and listing filters shared by the store traits.
//!
//! List endpoints page through results with 1-based `page` / `limit`
//! parameters and return the total row count alongside each page so
//! clients can render page controls without a second round trip.

use serde::{Deserialize, Serialize};

use stockyard_core::{LocationId, ProductId};
use stockyard_ledger::{CountStatus, MovementStatus, MovementType};

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Hard ceiling on page size. Requests above this are clamped, not rejected.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// 1-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Builds a pagination window, clamping `page` to at least 1 and
    /// `limit` into `1..=MAX_PAGE_LIMIT`.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Number of rows to skip before this page starts.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// One page of results plus the totals needed to page further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    /// Total matching rows across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination, total: u64) -> Self {
        Self {
            items,
            page: pagination.page,
            limit: pagination.limit,
            total,
        }
    }

    /// Total number of pages at the current limit. Zero rows is one empty page.
    pub fn total_pages(&self) -> u64 {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(u64::from(self.limit))
        }
    }

    pub fn has_more(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    /// Converts the items while keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}

/// Filter for movement listings. All fields are optional and ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub movement_type: Option<MovementType>,
    pub status: Option<MovementStatus>,
    /// Matches movements touching this location on either endpoint.
    pub location_id: Option<LocationId>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &stockyard_ledger::Movement) -> bool {
        if let Some(t) = self.movement_type {
            if movement.movement_type != t {
                return false;
            }
        }
        if let Some(s) = self.status {
            if movement.status != s {
                return false;
            }
        }
        if let Some(location_id) = self.location_id {
            let touches = movement.from_location_id == Some(location_id)
                || movement.to_location_id == Some(location_id);
            if !touches {
                return false;
            }
        }
        true
    }
}

/// Filter for count listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountFilter {
    pub status: Option<CountStatus>,
    pub location_id: Option<LocationId>,
}

impl CountFilter {
    pub fn matches(&self, count: &stockyard_ledger::InventoryCount) -> bool {
        if let Some(s) = self.status {
            if count.status != s {
                return false;
            }
        }
        if let Some(location_id) = self.location_id {
            if count.location_id != location_id {
                return false;
            }
        }
        true
    }
}

/// Filter for balance listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceFilter {
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
}

impl BalanceFilter {
    pub fn matches(&self, balance: &stockyard_ledger::StockBalance) -> bool {
        if let Some(product_id) = self.product_id {
            if balance.product_id != product_id {
                return false;
            }
        }
        if let Some(location_id) = self.location_id {
            if balance.location_id != location_id {
                return false;
            }
        }
        true
    }
}
