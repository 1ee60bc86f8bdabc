use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReviewRequest {
    pub package_id: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}
