use serde::{Deserialize, Serialize};

use crate::account::models::AccountResponse;
use crate::catalog::models::PackageModel;
use crate::post::models::PostView;
use crate::room::RoomModel;
use crate::shared::{ListParams, Page};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// One result group of the global search
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchGroup<T: Serialize> {
    pub results: Vec<T>,
    pub total: i64,
    pub total_pages: i64,
}

impl<T: Serialize> SearchGroup<T> {
    pub fn from_page(page: Page<T>, params: &ListParams) -> Self {
        Self {
            total_pages: params.pagination(page.total).total_pages,
            total: page.total,
            results: page.items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub packages: SearchGroup<PackageModel>,
    pub rooms: SearchGroup<RoomModel>,
    pub coaches: SearchGroup<AccountResponse>,
    pub posts: SearchGroup<PostView>,
}

impl SearchResults {
    pub fn total(&self) -> i64 {
        self.packages.total + self.rooms.total + self.coaches.total + self.posts.total
    }

    /// Largest group size; pages beyond it are empty in every group
    pub fn widest(&self) -> i64 {
        self.packages
            .total
            .max(self.rooms.total)
            .max(self.coaches.total)
            .max(self.posts.total)
    }
}
