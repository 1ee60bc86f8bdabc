use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::listing::Pagination;

/// JSON envelope shared by every endpoint:
/// `{success, message?, token?, data?, pagination?}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: None,
            token: None,
            data: Some(data),
            pagination: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    /// Unsuccessful envelope that still carries data, e.g. the record that blocked the request
    pub fn failure(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status,
            success: false,
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl ApiResponse<()> {
    /// Success envelope that carries only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: Some(message.into()),
            token: None,
            data: None,
            pagination: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_fields_are_omitted() {
        let json = serde_json::to_value(ApiResponse::message("Deleted")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "Deleted"}));
    }

    #[test]
    fn test_pagination_uses_camel_case() {
        let response = ApiResponse::ok(vec![1, 2]).with_pagination(Pagination {
            total_results: 12,
            total_pages: 2,
            current_page: 1,
            limit: 10,
        });
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["pagination"]["totalResults"], 12);
        assert_eq!(json["pagination"]["totalPages"], 2);
        assert_eq!(json["pagination"]["currentPage"], 1);
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created("x").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_failure_keeps_data() {
        let response = ApiResponse::failure(StatusCode::BAD_REQUEST, "Already enrolled", 7);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["data"], 7);
        assert_eq!(response.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
