use serde::Deserialize;

/// Body of add-package and update-package. Every field is optional on update.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageRequest {
    pub package_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub duration_in_days: Option<i32>,
    pub features: Option<Vec<String>>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    pub new_status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub display_order: Option<i32>,
}
