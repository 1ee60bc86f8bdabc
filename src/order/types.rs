use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub package_id: Option<String>,
    pub quantity: Option<i32>,
    pub payment_method: Option<String>,
}

/// Order-only query parameters, read next to the shared list query
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub payment_status: Option<String>,
}
