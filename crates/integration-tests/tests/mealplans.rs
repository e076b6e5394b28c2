//! End-to-end tests for meal plan CRUD and tag search.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use mealplan_core::MealPlan;
use mealplan_integration_tests::TestApp;

fn ids(body: &Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn test_create_list_search_delete_scenario() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let created = app
        .post(
            "/mealplans",
            &json!({ "customer": "Ana", "tags": ["vegan"] }),
            Some(&token),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    let plan: MealPlan = serde_json::from_value(created.body).unwrap();
    let id = plan.id.to_string();
    assert_eq!(plan.customer, "Ana");

    let listed = app.get("/mealplans").await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(ids(&listed.body), vec![id.clone()]);

    let found = app.get("/mealplans/search?tag=VEGAN").await;
    assert_eq!(found.status, StatusCode::OK);
    assert_eq!(ids(&found.body), vec![id.clone()]);

    let deleted = app.delete(&format!("/mealplans/{id}"), Some(&token)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "meal plan deleted");

    let listed = app.get("/mealplans").await;
    assert_eq!(listed.status, StatusCode::OK);
    assert!(ids(&listed.body).is_empty());
}

#[tokio::test]
async fn test_create_ignores_client_identity_fields() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let res = app
        .post(
            "/mealplans",
            &json!({
                "id": "00000000-0000-0000-0000-000000000001",
                "createdAt": "2001-01-01T00:00:00Z",
                "customer": "Ben",
            }),
            Some(&token),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_ne!(res.body["id"], "00000000-0000-0000-0000-000000000001");
    assert_ne!(res.body["createdAt"], "2001-01-01T00:00:00Z");
    assert_eq!(res.body["deliveryMonday"], "0001-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_get_returns_record_or_404() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let created = app
        .post("/mealplans", &json!({ "customer": "Cleo" }), Some(&token))
        .await;
    let id = created.body["id"].as_str().unwrap().to_owned();

    let res = app.get(&format!("/mealplans/{id}")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, created.body);

    let res = app
        .get("/mealplans/7c9e6679-7425-40de-944b-e07fc1f90ae7")
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.error(), Some("meal plan not found"));

    let res = app.get("/mealplans/not-a-uuid").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_merges_only_supplied_fields() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let created = app
        .post(
            "/mealplans",
            &json!({ "customer": "Dara", "diet": "keto", "allergies": ["peanut"] }),
            Some(&token),
        )
        .await;
    let id = created.body["id"].as_str().unwrap().to_owned();

    let res = app
        .put(
            &format!("/mealplans/{id}"),
            &json!({ "diet": "paleo" }),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["diet"], "paleo");
    assert_eq!(res.body["customer"], "Dara");
    assert_eq!(res.body["allergies"], json!(["peanut"]));
    assert_eq!(res.body["createdAt"], created.body["createdAt"]);

    // The cached list view reflects the update.
    let listed = app.get("/mealplans").await;
    assert_eq!(listed.body[0]["diet"], "paleo");
}

#[tokio::test]
async fn test_update_and_delete_unknown_id_return_404() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;
    let uri = "/mealplans/7c9e6679-7425-40de-944b-e07fc1f90ae7";

    let res = app.put(uri, &json!({ "diet": "vegan" }), Some(&token)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.delete(uri, Some(&token)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_payloads_return_400() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    let res = app
        .request(
            Method::POST,
            "/mealplans",
            Some("{not json".to_string()),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.error().is_some());

    let res = app
        .post("/mealplans", &json!({ "diet": "vegan" }), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), Some("customer is required"));

    let res = app
        .post(
            "/mealplans",
            &json!({ "customer": "Eli", "tags": ["  "] }),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let created = app
        .post("/mealplans", &json!({ "customer": "Eli" }), Some(&token))
        .await;
    let id = created.body["id"].as_str().unwrap().to_owned();
    let res = app
        .put(&format!("/mealplans/{id}"), &json!({}), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.store.len().await, 1);
}

#[tokio::test]
async fn test_search_matching_and_missing_tag() {
    let app = TestApp::new().await;
    let token = app.sign_in().await;

    for (customer, tags) in [
        ("Fay", json!(["Vegan", "weekly"])),
        ("Gus", json!(["keto"])),
    ] {
        let res = app
            .post(
                "/mealplans",
                &json!({ "customer": customer, "tags": tags }),
                Some(&token),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    let res = app.get("/mealplans/search?tag=vegan").await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["customer"], "Fay");

    let res = app.get("/mealplans/search?tag=halal").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!([]));

    let res = app.get("/mealplans/search").await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), Some("tag query parameter is required"));
}

#[tokio::test]
async fn test_writes_require_a_token() {
    let app = TestApp::new().await;
    let uri = "/mealplans/7c9e6679-7425-40de-944b-e07fc1f90ae7";

    let responses = [
        app.post("/mealplans", &json!({ "customer": "Hal" }), None)
            .await,
        app.put(uri, &json!({ "diet": "vegan" }), None).await,
        app.delete(uri, None).await,
        app.post("/mealplans", &json!({ "customer": "Hal" }), Some("garbage"))
            .await,
    ];

    for res in responses {
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.error(), Some("invalid or expired token"));
    }
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_unsupported_methods_are_405_without_a_token() {
    let app = TestApp::new().await;

    let res = app
        .request(Method::PATCH, "/mealplans", Some("{}".to_string()), None)
        .await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);

    let res = app
        .request(
            Method::PATCH,
            "/mealplans/7c9e6679-7425-40de-944b-e07fc1f90ae7",
            None,
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);

    let res = app.request(Method::DELETE, "/mealplans", None, None).await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    let res = app.get("/health").await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get("/health/ready").await;
    assert_eq!(res.status, StatusCode::OK);
}
