//! Order placement, pricing, numbering, and lifecycle.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use stallfront_integration_tests::TestApp;

/// Create a latte (450) with a Size modifier whose Large option adds 100.
/// Returns (item id, large option id).
async fn seed_latte(app: &TestApp, client: &reqwest::Client, slug: &str) -> (Value, Value) {
    let created = app
        .create_item(
            client,
            slug,
            &json!({
                "name": "Latte",
                "price": 450,
                "modifiers": [
                    {
                        "name": "Size",
                        "options": [
                            { "name": "Small", "priceAdjustment": 0 },
                            { "name": "Large", "priceAdjustment": 100 },
                        ],
                    },
                ],
            }),
        )
        .await;

    let item_id = created["id"].clone();
    let large_id = created["modifiers"][0]["options"][1]["id"].clone();
    (item_id, large_id)
}

#[tokio::test]
async fn test_order_priced_server_side() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;
    let (item_id, large_id) = seed_latte(&app, &client, "joes-coffee").await;

    let resp = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Sam",
                "items": [
                    {
                        "menuItemId": item_id,
                        "quantity": 2,
                        "modifiers": [{ "optionId": large_id }],
                    },
                ],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["orderNumber"], 1);
    assert_eq!(order["status"], "RECEIVED");
    assert_eq!(order["total"], 1100);

    let items = order["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Latte");
    assert_eq!(items[0]["unitPrice"], 550);
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(items[0]["modifiers"][0]["name"], "Large");
    assert_eq!(items[0]["modifiers"][0]["priceAdjustment"], 100);
}

#[tokio::test]
async fn test_client_submitted_prices_are_ignored() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;
    let (item_id, _) = seed_latte(&app, &client, "joes-coffee").await;

    // Price fields smuggled into the payload have no schema slot and no
    // effect on the computed total
    let resp = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Mallory",
                "total": 1,
                "items": [
                    {
                        "menuItemId": item_id,
                        "quantity": 1,
                        "unitPrice": 1,
                        "price": 1,
                        "modifiers": [],
                    },
                ],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let order: Value = resp.json().await.unwrap();
    assert_eq!(order["total"], 450);
    assert_eq!(order["items"][0]["unitPrice"], 450);
}

#[tokio::test]
async fn test_malformed_carts_rejected() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;
    let (item_id, _) = seed_latte(&app, &client, "joes-coffee").await;

    // Empty cart
    let resp = app
        .place_order(
            "joes-coffee",
            &json!({ "customerName": "Sam", "items": [] }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Blank customer name
    let resp = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "   ",
                "items": [{ "menuItemId": item_id, "quantity": 1, "modifiers": [] }],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Zero quantity
    let resp = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Sam",
                "items": [{ "menuItemId": item_id, "quantity": 0, "modifiers": [] }],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Unknown organization
    let resp = app
        .place_order(
            "no-such-org",
            &json!({
                "customerName": "Sam",
                "items": [{ "menuItemId": item_id, "quantity": 1, "modifiers": [] }],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_absurd_quantities_and_totals_rejected() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;
    let (item_id, _) = seed_latte(&app, &client, "joes-coffee").await;

    // A quantity that would overflow the total is a 400, not a crash
    let resp = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Mallory",
                "items": [{ "menuItemId": item_id, "quantity": i64::MAX, "modifiers": [] }],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Anything over the line-quantity cap is rejected even when the
    // arithmetic would fit
    let resp = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Sam",
                "items": [{ "menuItemId": item_id, "quantity": 1001, "modifiers": [] }],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // An in-cap quantity against an extreme price still can't wrap the total
    let pricey = app
        .create_item(
            &client,
            "joes-coffee",
            &json!({ "name": "Everything", "price": i64::MAX }),
        )
        .await;
    let resp = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Mallory",
                "items": [{ "menuItemId": pricey["id"], "quantity": 2, "modifiers": [] }],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // None of the rejected carts persisted anything
    let orders: Vec<Value> = client
        .get(app.url("/api/joes-coffee/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_unresolvable_references_fail_the_whole_order() {
    let app = TestApp::spawn().await;
    let joe = app.register_and_login("joes-coffee", "joe").await;
    let ana = app.register_and_login("anas-tacos", "ana").await;

    let (joe_item, joe_large) = seed_latte(&app, &joe, "joes-coffee").await;

    // Hidden item: rejected
    let hidden = app
        .create_item(
            &joe,
            "joes-coffee",
            &json!({ "name": "Off Menu", "price": 100, "available": false }),
        )
        .await;
    let resp = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Sam",
                "items": [{ "menuItemId": hidden["id"], "quantity": 1, "modifiers": [] }],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Cross-tenant item in Ana's shop: reads like an unknown id
    let resp = app
        .place_order(
            "anas-tacos",
            &json!({
                "customerName": "Sam",
                "items": [{ "menuItemId": joe_item, "quantity": 1, "modifiers": [] }],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Cross-tenant modifier option on Ana's own item
    let (ana_item, _) = seed_latte(&app, &ana, "anas-tacos").await;
    let resp = app
        .place_order(
            "anas-tacos",
            &json!({
                "customerName": "Sam",
                "items": [
                    {
                        "menuItemId": ana_item,
                        "quantity": 1,
                        "modifiers": [{ "optionId": joe_large }],
                    },
                ],
            }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Nothing was persisted by any of the failed attempts
    let orders: Vec<Value> = ana
        .get(app.url("/api/anas-tacos/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_order_numbers_are_per_organization() {
    let app = TestApp::spawn().await;
    let joe = app.register_and_login("joes-coffee", "joe").await;
    let ana = app.register_and_login("anas-tacos", "ana").await;
    let (joe_item, _) = seed_latte(&app, &joe, "joes-coffee").await;
    let (ana_item, _) = seed_latte(&app, &ana, "anas-tacos").await;

    let order = |slug: &str, item: &Value| {
        json!({
            "customerName": "Sam",
            "items": [{ "menuItemId": item, "quantity": 1, "modifiers": [] }],
            "slug": slug,
        })
    };

    for expected in 1..=3 {
        let placed: Value = app
            .place_order("joes-coffee", &order("joes-coffee", &joe_item))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(placed["orderNumber"], expected);
    }

    // Ana's counter is independent
    let placed: Value = app
        .place_order("anas-tacos", &order("anas-tacos", &ana_item))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(placed["orderNumber"], 1);
}

#[tokio::test]
async fn test_concurrent_orders_get_unique_numbers() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;
    let (item_id, _) = seed_latte(&app, &client, "joes-coffee").await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let app_url = app.url("/api/joes-coffee/orders");
        let body = json!({
            "customerName": format!("Customer {i}"),
            "items": [{ "menuItemId": item_id, "quantity": 1, "modifiers": [] }],
        });
        handles.push(tokio::spawn(async move {
            let resp = reqwest::Client::new()
                .post(app_url)
                .json(&body)
                .send()
                .await
                .expect("order request failed");
            assert_eq!(resp.status(), StatusCode::CREATED);
            let order: Value = resp.json().await.expect("order response was not JSON");
            order["orderNumber"].as_i64().expect("missing order number")
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap());
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_status_lifecycle() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;
    let (item_id, _) = seed_latte(&app, &client, "joes-coffee").await;

    let order: Value = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Sam",
                "items": [{ "menuItemId": item_id, "quantity": 1, "modifiers": [] }],
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let id = order["id"].clone();
    let status_url = app.url(&format!("/api/joes-coffee/orders/{id}/status"));

    // Forward
    for target in ["PREPARING", "READY"] {
        let updated: Value = client
            .patch(&status_url)
            .json(&json!({ "status": target }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(updated["status"], target);
    }

    // Reverse transition is allowed
    let updated: Value = client
        .patch(&status_url)
        .json(&json!({ "status": "RECEIVED" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["status"], "RECEIVED");

    // Junk status is a 400 and leaves the row unchanged
    let resp = client
        .patch(&status_url)
        .json(&json!({ "status": "DELIVERED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let orders: Vec<Value> = client
        .get(app.url("/api/joes-coffee/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders[0]["status"], "RECEIVED");
}

#[tokio::test]
async fn test_order_queue_is_tenant_scoped() {
    let app = TestApp::spawn().await;
    let joe = app.register_and_login("joes-coffee", "joe").await;
    let ana = app.register_and_login("anas-tacos", "ana").await;
    let (item_id, _) = seed_latte(&app, &joe, "joes-coffee").await;

    let order: Value = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Sam",
                "items": [{ "menuItemId": item_id, "quantity": 1, "modifiers": [] }],
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let id = order["id"].clone();

    // Ana's session on Joe's queue: 401
    let resp = ana
        .get(app.url("/api/joes-coffee/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Joe's order id through Ana's own org path: 404
    let resp = ana
        .patch(app.url(&format!("/api/anas-tacos/orders/{id}/status")))
        .json(&json!({ "status": "READY" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clearing_orders_keeps_the_counter() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;
    let (item_id, _) = seed_latte(&app, &client, "joes-coffee").await;

    let body = json!({
        "customerName": "Sam",
        "items": [{ "menuItemId": item_id, "quantity": 1, "modifiers": [] }],
    });
    app.place_order("joes-coffee", &body).await;
    app.place_order("joes-coffee", &body).await;

    let resp = client
        .delete(app.url("/api/joes-coffee/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared: Value = resp.json().await.unwrap();
    assert_eq!(cleared["deleted"], 2);

    // Numbers keep counting; nothing is reused
    let placed: Value = app
        .place_order("joes-coffee", &body)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(placed["orderNumber"], 3);
}

#[tokio::test]
async fn test_snapshots_survive_item_deletion() {
    let app = TestApp::spawn().await;
    let client = app.register_and_login("joes-coffee", "joe").await;
    let (item_id, large_id) = seed_latte(&app, &client, "joes-coffee").await;

    let order: Value = app
        .place_order(
            "joes-coffee",
            &json!({
                "customerName": "Sam",
                "items": [
                    {
                        "menuItemId": item_id,
                        "quantity": 1,
                        "modifiers": [{ "optionId": large_id }],
                    },
                ],
            }),
        )
        .await
        .json()
        .await
        .unwrap();

    let resp = client
        .delete(app.url(&format!("/api/joes-coffee/admin/menu/{}", order["items"][0]["menuItemId"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let orders: Vec<Value> = client
        .get(app.url("/api/joes-coffee/orders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Snapshots are intact; the live reference is gone
    let line = &orders[0]["items"][0];
    assert_eq!(line["name"], "Latte");
    assert_eq!(line["unitPrice"], 550);
    assert!(line["menuItemId"].is_null());
    assert_eq!(line["modifiers"][0]["name"], "Large");
    assert_eq!(line["modifiers"][0]["priceAdjustment"], 100);
    assert!(line["modifiers"][0]["modifierOptionId"].is_null());
}
