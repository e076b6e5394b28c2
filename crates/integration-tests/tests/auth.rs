//! End-to-end tests for sign-in, refresh and sign-out.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use mealplan_integration_tests::{TEST_PASSWORD, TEST_USERNAME, TestApp};

#[tokio::test]
async fn test_sign_in_returns_token_pair() {
    let app = TestApp::new().await;
    let body = app.sign_in_tokens().await;

    assert!(body["accessToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refreshToken"].as_str().is_some_and(|t| !t.is_empty()));
    assert_ne!(body["accessToken"], body["refreshToken"]);
    assert!(body["accessExpiresAt"].is_string());
    assert!(body["refreshExpiresAt"].is_string());
}

#[tokio::test]
async fn test_sign_in_rejects_bad_credentials() {
    let app = TestApp::new().await;

    for (username, password) in [
        (TEST_USERNAME, "wrong password"),
        ("nobody", TEST_PASSWORD),
        ("", ""),
    ] {
        let res = app
            .post(
                "/signin",
                &json!({ "username": username, "password": password }),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.error(), Some("invalid credentials"));
    }
}

#[tokio::test]
async fn test_sign_in_malformed_body_is_400() {
    let app = TestApp::new().await;

    let res = app
        .post("/signin", &json!({ "username": TEST_USERNAME }), None)
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_issues_working_access_token() {
    let app = TestApp::new().await;
    let tokens = app.sign_in_tokens().await;

    let res = app
        .post(
            "/refresh",
            &json!({ "refreshToken": tokens["refreshToken"] }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let access = res.body["accessToken"].as_str().unwrap().to_owned();
    assert!(res.body["expiresAt"].is_string());

    let res = app
        .post("/mealplans", &json!({ "customer": "Ivy" }), Some(&access))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_access_token_and_garbage() {
    let app = TestApp::new().await;
    let tokens = app.sign_in_tokens().await;

    for candidate in [tokens["accessToken"].clone(), json!("not.a.jwt")] {
        let res = app
            .post("/refresh", &json!({ "refreshToken": candidate }), None)
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.error(), Some("invalid or expired token"));
    }
}

#[tokio::test]
async fn test_refresh_token_cannot_authorize_writes() {
    let app = TestApp::new().await;
    let tokens = app.sign_in_tokens().await;
    let refresh = tokens["refreshToken"].as_str().unwrap();

    let res = app
        .post("/mealplans", &json!({ "customer": "Jo" }), Some(refresh))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_out_revokes_both_tokens() {
    let app = TestApp::new().await;
    let tokens = app.sign_in_tokens().await;
    let access = tokens["accessToken"].as_str().unwrap();

    let res = app.post("/signout", &json!({}), Some(access)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "signed out");

    let res = app
        .post("/mealplans", &json!({ "customer": "Kai" }), Some(access))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.error(), Some("invalid or expired token"));

    let res = app
        .post(
            "/refresh",
            &json!({ "refreshToken": tokens["refreshToken"] }),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_out_leaves_other_sessions_alone() {
    let app = TestApp::new().await;
    let first = app.sign_in().await;
    let second = app.sign_in().await;

    let res = app.post("/signout", &json!({}), Some(&first)).await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .post("/mealplans", &json!({ "customer": "Lou" }), Some(&second))
        .await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_out_twice_succeeds() {
    let app = TestApp::new().await;
    let access = app.sign_in().await;

    for _ in 0..2 {
        let res = app.post("/signout", &json!({}), Some(&access)).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["message"], "signed out");
    }

    let res = app.get("/mealplans").await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_sign_out_rejects_refresh_and_garbage_tokens() {
    let app = TestApp::new().await;
    let tokens = app.sign_in_tokens().await;

    for token in [tokens["refreshToken"].as_str().unwrap(), "not.a.jwt"] {
        let res = app.post("/signout", &json!({}), Some(token)).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.error(), Some("invalid or expired token"));
    }
}

#[tokio::test]
async fn test_sign_out_requires_a_token() {
    let app = TestApp::new().await;

    let res = app.post("/signout", &json!({}), None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
