//! HTTP surface tests.

use axum::http::StatusCode;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = TestApp::new();
    let course = app.publish(1).await;
    let booking = app.book(&course).await;

    let response = app
        .request("GET", &format!("/api/course/v1/bookings/{booking}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "created");
    assert_eq!(response.body["course"], course.as_str());

    let response = app
        .request("POST", &format!("/api/course/v1/bookings/{booking}/reserve"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "reserved");

    let response = app
        .request("GET", &format!("/api/course/v1/courses/{course}"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["reserved"], 1);
    assert_eq!(response.body["available"], 0);

    let response = app
        .request("POST", &format!("/api/course/v1/bookings/{booking}/expire"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "expired");

    let response = app
        .request("POST", &format!("/api/course/v1/bookings/{booking}/expire"), None)
        .await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(response.body["error"], "ALREADY_EXPIRED");
    assert_eq!(response.body["retryable"], false);
}

#[tokio::test]
async fn test_full_course_is_conflict() {
    let app = TestApp::new();
    let course = app.publish(1).await;
    let first = app.book(&course).await;
    let second = app.book(&course).await;

    let response = app
        .request("POST", &format!("/api/course/v1/bookings/{first}/reserve"), None)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("POST", &format!("/api/course/v1/bookings/{second}/reserve"), None)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"], "CAPACITY_EXHAUSTED");
}

#[tokio::test]
async fn test_unknown_booking_is_not_found() {
    let app = TestApp::new();
    let response = app
        .request(
            "GET",
            &format!("/api/course/v1/bookings/{}", uuid::Uuid::now_v7()),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new();
    let response = app
        .request(
            "POST",
            "/api/course/v1/bookings",
            Some(serde_json::json!({ "price": "free" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_listing_follows_page_tokens() {
    let app = TestApp::new();
    let course = app.publish(10).await;
    let mut created = Vec::new();
    for _ in 0..3 {
        created.push(app.book(&course).await);
    }

    let mut listed = Vec::new();
    let mut uri = format!("/api/course/v1/bookings?course={course}&page_size=2");
    loop {
        let response = app.request("GET", &uri, None).await;
        assert_eq!(response.status, StatusCode::OK);
        for booking in response.body["bookings"].as_array().unwrap() {
            listed.push(booking["id"].as_str().unwrap().to_string());
        }
        let token = response.body["next_page_token"].as_str().unwrap();
        if token.is_empty() {
            break;
        }
        uri = format!("/api/course/v1/bookings?course={course}&page_size=2&page_token={token}");
    }
    assert_eq!(listed, created);
}

#[tokio::test]
async fn test_course_listing_and_bad_status_filter() {
    let app = TestApp::new();
    app.publish(5).await;
    app.publish(7).await;

    let response = app.request("GET", "/api/course/v1/courses", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["courses"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["next_page_token"], "");

    let response = app
        .request("GET", "/api/course/v1/bookings?status=pending", None)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_probes() {
    let app = TestApp::new();
    let response = app.request("GET", "/healthz", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");

    let response = app.request("GET", "/readyz", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ready");
}
