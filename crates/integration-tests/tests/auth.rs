//! Registration, login, organization switching, and session lifecycle.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use stallfront_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::spawn().await;

    let resp = app.register("joes-coffee", "joe").await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["organization"]["slug"], "joes-coffee");

    let client = app.client();
    let resp = client
        .post(app.url("/api/joes-coffee/auth/login"))
        .json(&json!({ "username": "joe", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(app.url("/api/joes-coffee/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = resp.json().await.unwrap();
    assert_eq!(me["username"], "joe");
    assert_eq!(me["role"], "owner");
    assert_eq!(me["organization"]["slug"], "joes-coffee");
}

#[tokio::test]
async fn test_register_duplicate_slug_conflicts() {
    let app = TestApp::spawn().await;

    assert_eq!(app.register("taco-cart", "ana").await.status(), 201);

    let resp = app.register("taco-cart", "bob").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("slug"));
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let app = TestApp::spawn().await;

    assert_eq!(app.register("stall-one", "casey").await.status(), 201);
    assert_eq!(
        app.register("stall-two", "casey").await.status(),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::spawn().await;
    let client = app.client();

    // Slug with invalid characters
    let resp = client
        .post(app.url("/api/register"))
        .json(&json!({
            "orgName": "Bad Slug",
            "orgSlug": "not a slug!",
            "username": "someone",
            "password": PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Password too short
    let resp = client
        .post(app.url("/api/register"))
        .json(&json!({
            "orgName": "Short Pass",
            "orgSlug": "short-pass",
            "username": "someone",
            "password": "12345",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let app = TestApp::spawn().await;
    app.register("joes-coffee", "joe").await;

    let wrong_password = app
        .client()
        .post(app.url("/api/joes-coffee/auth/login"))
        .json(&json!({ "username": "joe", "password": "wrong-pass" }))
        .send()
        .await
        .unwrap();

    let unknown_user = app
        .client()
        .post(app.url("/api/joes-coffee/auth/login"))
        .json(&json!({ "username": "nobody", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    let unknown_org = app
        .client()
        .post(app.url("/api/no-such-org/auth/login"))
        .json(&json!({ "username": "joe", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_org.status(), StatusCode::UNAUTHORIZED);

    // Identical body for all three failure modes
    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_user.json().await.unwrap();
    let c: Value = unknown_org.json().await.unwrap();
    assert_eq!(a, b);
    assert_eq!(b, c);
}

#[tokio::test]
async fn test_global_login_single_org_issues_session() {
    let app = TestApp::spawn().await;
    app.register("joes-coffee", "joe").await;

    let client = app.client();
    let resp = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": "joe", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["orgSlug"], "joes-coffee");

    // The cookie works against the org's admin surface
    let resp = client
        .get(app.url("/api/joes-coffee/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_global_login_multiple_orgs_needs_selection() {
    let app = TestApp::spawn().await;
    app.register("joes-coffee", "joe").await;
    app.register("anas-tacos", "ana").await;
    app.add_membership("joe", "anas-tacos", "staff").await;

    let client = app.client();
    let resp = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": "joe", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["needsOrgSelection"], true);
    assert_eq!(body["orgs"].as_array().unwrap().len(), 2);

    // No session was issued
    let resp = client
        .get(app.url("/api/joes-coffee/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Re-submitting credentials with the chosen organization completes it
    let resp = client
        .post(app.url("/api/auth/login"))
        .json(&json!({
            "username": "joe",
            "password": PASSWORD,
            "organization": "anas-tacos",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["orgSlug"], "anas-tacos");

    let resp = client
        .get(app.url("/api/anas-tacos/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_select_org_requires_session_and_membership() {
    let app = TestApp::spawn().await;
    app.register("joes-coffee", "joe").await;
    app.register("anas-tacos", "ana").await;

    // No session at all
    let resp = app
        .client()
        .post(app.url("/api/auth/select-org"))
        .json(&json!({ "orgSlug": "joes-coffee" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Valid session, but no membership in the target org
    let client = app.register_and_login("bobs-crepes", "bob").await;
    let resp = client
        .post(app.url("/api/auth/select-org"))
        .json(&json!({ "orgSlug": "joes-coffee" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_select_org_switches_session() {
    let app = TestApp::spawn().await;
    app.register("joes-coffee", "joe").await;
    app.register("anas-tacos", "ana").await;
    app.add_membership("joe", "anas-tacos", "staff").await;

    let client = app.client();
    client
        .post(app.url("/api/joes-coffee/auth/login"))
        .json(&json!({ "username": "joe", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(app.url("/api/auth/select-org"))
        .json(&json!({ "orgSlug": "anas-tacos" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // The session now belongs to the other organization
    let resp = client
        .get(app.url("/api/anas-tacos/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = client
        .get(app.url("/api/joes-coffee/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_orgs_listing() {
    let app = TestApp::spawn().await;
    app.register("joes-coffee", "joe").await;
    app.register("anas-tacos", "ana").await;
    app.add_membership("joe", "anas-tacos", "staff").await;

    let client = app.client();
    client
        .post(app.url("/api/joes-coffee/auth/login"))
        .json(&json!({ "username": "joe", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    let resp = client.get(app.url("/api/auth/orgs")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let orgs = body["orgs"].as_array().unwrap();
    assert_eq!(orgs.len(), 2);
    // Ordered by organization name
    assert_eq!(orgs[0]["slug"], "anas-tacos");
    assert_eq!(orgs[1]["slug"], "joes-coffee");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;

    let resp = client
        .post(app.url("/api/joes-coffee/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(app.url("/api/joes-coffee/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let resp = client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(app.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
