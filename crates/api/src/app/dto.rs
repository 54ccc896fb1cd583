use serde::{Deserialize, Serialize};

use stockyard_core::{LocationId, ProductId};
use stockyard_infra::query::{
    BalanceFilter, CountFilter, MovementFilter, Page, Pagination, DEFAULT_PAGE_LIMIT,
};
use stockyard_ledger::{CountStatus, MovementStatus, MovementType, PickedLine};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: MovementStatus,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPickRequest {
    #[serde(default)]
    pub picked_lines: Vec<PickedLine>,
}

// -------------------------
// Query DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListMovementsQuery {
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub status: Option<MovementStatus>,
    pub location_id: Option<LocationId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListMovementsQuery {
    pub fn filter(&self) -> MovementFilter {
        MovementFilter {
            movement_type: self.movement_type,
            status: self.status,
            location_id: self.location_id,
        }
    }

    pub fn pagination(&self) -> Pagination {
        pagination(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListCountsQuery {
    pub status: Option<CountStatus>,
    pub location_id: Option<LocationId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListCountsQuery {
    pub fn filter(&self) -> CountFilter {
        CountFilter {
            status: self.status,
            location_id: self.location_id,
        }
    }

    pub fn pagination(&self) -> Pagination {
        pagination(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBalancesQuery {
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListBalancesQuery {
    pub fn filter(&self) -> BalanceFilter {
        BalanceFilter {
            product_id: self.product_id,
            location_id: self.location_id,
        }
    }

    pub fn pagination(&self) -> Pagination {
        pagination(self.page, self.limit)
    }
}

fn pagination(page: Option<u32>, limit: Option<u32>) -> Pagination {
    Pagination::new(page.unwrap_or(1), limit.unwrap_or(DEFAULT_PAGE_LIMIT))
}

// -------------------------
// JSON mapping helpers
// -------------------------

/// List envelope: `{ "data": [...], "meta": { page, limit, total, total_pages } }`.
pub fn page_to_json<T: Serialize>(page: Page<T>) -> serde_json::Value {
    let total_pages = page.total_pages();
    serde_json::json!({
        "data": page.items,
        "meta": {
            "page": page.page,
            "limit": page.limit,
            "total": page.total,
            "total_pages": total_pages,
        }
    })
}
