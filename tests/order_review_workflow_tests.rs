use axum::http::{Method, StatusCode};
use rstest::rstest;
use serde_json::{json, Value};

mod utils;

use utils::*;

async fn place_order(app: &TestApp, token: &str, package_id: impl ToString) -> String {
    let placed = send(
        &app.router,
        Method::POST,
        "/api/client/order",
        Some(token),
        Some(json!({"packageId": package_id.to_string(), "quantity": 2})),
    )
    .await;
    placed.assert_status(StatusCode::CREATED);
    placed.data()["id"].as_str().unwrap().to_string()
}

fn review_body(package_id: impl ToString, rating: Value) -> Value {
    json!({
        "packageId": package_id.to_string(),
        "rating": rating,
        "comment": "  Great coaches  "
    })
}

#[tokio::test]
async fn test_purchase_review_and_moderation_workflow() {
    let app = TestApp::new();
    let (_, client) = app.client("Ann", "ann@gym.io").await;
    let (_, root) = app.super_admin().await;
    let package = app.package("Gold", 500_000).await;

    let order_id = place_order(&app, &client, package.id).await;

    // Pending orders do not count as a purchase
    send(
        &app.router,
        Method::POST,
        "/api/client/review-package",
        Some(&client),
        Some(review_body(package.id, json!(5))),
    )
    .await
    .assert_status(StatusCode::FORBIDDEN);

    let confirmed = send(
        &app.router,
        Method::PUT,
        &format!("/api/admin/check-order/{order_id}"),
        Some(&root),
        None,
    )
    .await;
    confirmed.assert_status(StatusCode::OK);
    assert_eq!(confirmed.data()["status"], "completed");
    assert_eq!(confirmed.data()["paymentStatus"], "paid");
    assert_eq!(confirmed.data()["totalAmount"], 1_000_000);

    let reviewed = send(
        &app.router,
        Method::POST,
        "/api/client/review-package",
        Some(&client),
        Some(review_body(package.id, json!(5))),
    )
    .await;
    reviewed.assert_status(StatusCode::CREATED);
    assert_eq!(reviewed.data()["status"], "pending");
    assert_eq!(reviewed.data()["comment"], "Great coaches");
    let review_id = reviewed.data()["id"].as_str().unwrap().to_string();

    send(
        &app.router,
        Method::POST,
        "/api/client/review-package",
        Some(&client),
        Some(review_body(package.id, json!(3))),
    )
    .await
    .assert_status(StatusCode::BAD_REQUEST);

    let check = send(
        &app.router,
        Method::GET,
        &format!("/api/client/check-review/{}", package.id),
        Some(&client),
        None,
    )
    .await;
    check.assert_status(StatusCode::OK);
    assert_eq!(check.data()["hasReviewed"], true);
    assert_eq!(check.data()["review"]["id"], review_id.as_str());

    let approved = send(
        &app.router,
        Method::PUT,
        &format!("/api/admin/approve-review/{review_id}"),
        Some(&root),
        None,
    )
    .await;
    approved.assert_status(StatusCode::OK);
    assert_eq!(approved.data()["status"], "approved");

    // Moderation only moves pending reviews
    send(
        &app.router,
        Method::PUT,
        &format!("/api/admin/reject-review/{review_id}"),
        Some(&root),
        None,
    )
    .await
    .assert_status(StatusCode::BAD_REQUEST);

    let listed = send(
        &app.router,
        Method::GET,
        "/api/admin/package-reviews?status=approved",
        Some(&root),
        None,
    )
    .await;
    listed.assert_status(StatusCode::OK);
    let items = listed.data().as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["clientInfo"]["fullname"], "Ann");
    assert_eq!(items[0]["packageInfo"]["packageName"], "Gold");
}

#[tokio::test]
async fn test_terminal_orders_refuse_transitions() {
    let app = TestApp::new();
    let (_, client) = app.client("Ann", "ann@gym.io").await;
    let (_, root) = app.super_admin().await;
    let package = app.package("Silver", 300_000).await;

    let completed = place_order(&app, &client, package.id).await;
    let cancelled = place_order(&app, &client, package.id).await;

    send(
        &app.router,
        Method::PUT,
        &format!("/api/admin/check-order/{completed}"),
        Some(&root),
        None,
    )
    .await
    .assert_status(StatusCode::OK);
    send(
        &app.router,
        Method::PUT,
        &format!("/api/admin/cancel-order/{cancelled}"),
        Some(&root),
        None,
    )
    .await
    .assert_status(StatusCode::OK);

    for (verb, id) in [
        ("cancel-order", &completed),
        ("check-order", &completed),
        ("check-order", &cancelled),
        ("cancel-order", &cancelled),
    ] {
        send(
            &app.router,
            Method::PUT,
            &format!("/api/admin/{verb}/{id}"),
            Some(&root),
            None,
        )
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    }

    send(
        &app.router,
        Method::PUT,
        &format!("/api/admin/check-order/{}", uuid::Uuid::new_v4()),
        Some(&root),
        None,
    )
    .await
    .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_only_sees_own_orders() {
    let app = TestApp::new();
    let (_, ann) = app.client("Ann", "ann@gym.io").await;
    let (_, bob) = app.client("Bob", "bob@gym.io").await;
    let package = app.package("Bronze", 100_000).await;

    place_order(&app, &ann, package.id).await;

    let mine = send(&app.router, Method::GET, "/api/client/orders", Some(&ann), None).await;
    mine.assert_status(StatusCode::OK);
    assert_eq!(mine.data().as_array().unwrap().len(), 1);
    assert_eq!(mine.data()[0]["lines"][0]["packageInfo"]["packageName"], "Bronze");

    let theirs = send(&app.router, Method::GET, "/api/client/orders", Some(&bob), None).await;
    theirs.assert_status(StatusCode::OK);
    assert!(theirs.data().as_array().unwrap().is_empty());
}

#[rstest]
#[case::zero(json!(0))]
#[case::six(json!(6))]
#[case::missing(Value::Null)]
#[tokio::test]
async fn test_rating_out_of_range_is_rejected(#[case] rating: Value) {
    let app = TestApp::new();
    let (_, client) = app.client("Ann", "ann@gym.io").await;
    let package = app.package("Gold", 500_000).await;

    let response = send(
        &app.router,
        Method::POST,
        "/api/client/review-package",
        Some(&client),
        Some(review_body(package.id, rating)),
    )
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}
