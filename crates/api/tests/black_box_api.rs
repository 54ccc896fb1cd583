use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // The production router, bound to an ephemeral port.
        let app = stockyard_api::app::build_app().await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn user_id() -> String {
    Uuid::new_v4().to_string()
}

/// Drive a freshly created movement along DRAFT -> WAITING -> READY.
async fn make_ready(client: &reqwest::Client, base_url: &str, user: &str, id: &str) {
    for status in ["WAITING", "READY"] {
        let res = client
            .put(format!("{}/movements/{}/status", base_url, id))
            .header("x-user-id", user)
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "transition to {status}");
    }
}

/// Receive `quantity` of `product` into `location` and complete the movement.
async fn receive_stock(
    client: &reqwest::Client,
    base_url: &str,
    user: &str,
    product: &str,
    location: &str,
    quantity: i64,
) -> serde_json::Value {
    let res = client
        .post(format!("{}/movements/receipts", base_url))
        .header("x-user-id", user)
        .json(&json!({
            "to_location_id": location,
            "supplier_id": Uuid::new_v4().to_string(),
            "lines": [{ "product_id": product, "quantity": quantity }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    make_ready(client, base_url, user, &id).await;

    let res = client
        .post(format!("{}/movements/{}/complete", base_url, id))
        .header("x-user-id", user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn balance_quantity(
    client: &reqwest::Client,
    base_url: &str,
    product: &str,
    location: &str,
) -> Option<i64> {
    let res = client
        .get(format!(
            "{}/balances?product_id={}&location_id={}",
            base_url, product, location
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["data"]
        .as_array()
        .unwrap()
        .first()
        .map(|b| b["quantity"].as_i64().unwrap())
}

#[tokio::test]
async fn health_needs_no_identity() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn mutations_require_a_user_header() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/movements/receipts", srv.base_url))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "missing_user");
}

#[tokio::test]
async fn whoami_echoes_identity_headers() {
    let srv = TestServer::spawn().await;
    let user = user_id();

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .header("x-user-id", &user)
        .header("x-user-role", "STOCKMASTER")
        .header("x-forwarded-for", "10.0.0.9, 172.16.0.1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user);
    assert_eq!(body["role"], "STOCKMASTER");
    assert_eq!(body["ip_address"], "10.0.0.9");
}

#[tokio::test]
async fn receipt_lifecycle_credits_the_destination() {
    let srv = TestServer::spawn().await;
    let user = user_id();
    let product = Uuid::new_v4().to_string();
    let location = Uuid::new_v4().to_string();

    let client = reqwest::Client::new();
    let done = receive_stock(&client, &srv.base_url, &user, &product, &location, 40).await;

    assert_eq!(done["status"], "DONE");
    assert_eq!(done["movement_type"], "RECEIPT");
    assert!(done["reference_no"].as_str().unwrap().starts_with("RCP-"));
    assert!(!done["completed_at"].is_null());

    let quantity = balance_quantity(&client, &srv.base_url, &product, &location).await;
    assert_eq!(quantity, Some(40));
}

#[tokio::test]
async fn validation_lists_every_missing_field() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/movements/receipts", srv.base_url))
        .header("x-user-id", user_id())
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let details: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d.as_str().unwrap())
        .collect();
    assert!(details.iter().any(|d| d.contains("to_location_id")));
    assert!(details.iter().any(|d| d.contains("supplier_id")));
    assert!(details.iter().any(|d| d.contains("at least one line")));
}

#[tokio::test]
async fn delivery_without_stock_is_unprocessable() {
    let srv = TestServer::spawn().await;
    let user = user_id();

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/movements/deliveries", srv.base_url))
        .header("x-user-id", &user)
        .json(&json!({
            "from_location_id": Uuid::new_v4().to_string(),
            "lines": [{ "product_id": Uuid::new_v4().to_string(), "quantity": 5 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    make_ready(&client, &srv.base_url, &user, &id).await;

    let res = client
        .post(format!("{}/movements/{}/complete", srv.base_url, id))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["details"]["available"], 0);

    // The failed completion must not advance the movement.
    let res = client
        .get(format!("{}/movements/{}", srv.base_url, id))
        .send()
        .await
        .unwrap();
    let movement: serde_json::Value = res.json().await.unwrap();
    assert_eq!(movement["status"], "READY");
}

#[tokio::test]
async fn transfer_moves_stock_between_locations() {
    let srv = TestServer::spawn().await;
    let user = user_id();
    let product = Uuid::new_v4().to_string();
    let source = Uuid::new_v4().to_string();
    let destination = Uuid::new_v4().to_string();

    let client = reqwest::Client::new();
    receive_stock(&client, &srv.base_url, &user, &product, &source, 50).await;

    let res = client
        .post(format!("{}/movements/transfers", srv.base_url))
        .header("x-user-id", &user)
        .json(&json!({
            "from_location_id": source,
            "to_location_id": destination,
            "lines": [{ "product_id": product, "quantity": 20 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert!(created["reference_no"].as_str().unwrap().starts_with("TRN-"));

    make_ready(&client, &srv.base_url, &user, &id).await;
    let res = client
        .post(format!("{}/movements/{}/complete", srv.base_url, id))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let at_source = balance_quantity(&client, &srv.base_url, &product, &source).await;
    let at_destination = balance_quantity(&client, &srv.base_url, &product, &destination).await;
    assert_eq!(at_source, Some(30));
    assert_eq!(at_destination, Some(20));
}

#[tokio::test]
async fn illegal_transition_is_rejected() {
    let srv = TestServer::spawn().await;
    let user = user_id();

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/movements/receipts", srv.base_url))
        .header("x-user-id", &user)
        .json(&json!({
            "to_location_id": Uuid::new_v4().to_string(),
            "supplier_id": Uuid::new_v4().to_string(),
            "lines": [{ "product_id": Uuid::new_v4().to_string(), "quantity": 1 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    // DRAFT -> DONE skips the pipeline.
    let res = client
        .put(format!("{}/movements/{}/status", srv.base_url, id))
        .header("x-user-id", &user)
        .json(&json!({ "status": "DONE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn movement_lookups_diagnose_bad_ids() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .get(format!("{}/movements/{}", srv.base_url, Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client
        .get(format!("{}/movements/not-a-uuid", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn count_reconcile_sets_the_balance() {
    let srv = TestServer::spawn().await;
    let user = user_id();
    let product = Uuid::new_v4().to_string();
    let location = Uuid::new_v4().to_string();

    let client = reqwest::Client::new();
    receive_stock(&client, &srv.base_url, &user, &product, &location, 40).await;

    // Open a count sheet expecting the booked 40.
    let res = client
        .post(format!("{}/counts", srv.base_url))
        .header("x-user-id", &user)
        .json(&json!({
            "location_id": location,
            "lines": [{ "product_id": product, "expected_quantity": 40 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let count: serde_json::Value = res.json().await.unwrap();
    assert_eq!(count["status"], "DRAFT");
    assert!(count["reference_no"].as_str().unwrap().starts_with("CNT-"));
    let count_id = count["id"].as_str().unwrap().to_string();
    let line_id = count["lines"][0]["id"].as_str().unwrap().to_string();

    // The shelf only holds 34.
    let res = client
        .put(format!(
            "{}/counts/{}/lines/{}",
            srv.base_url, count_id, line_id
        ))
        .header("x-user-id", &user)
        .json(&json!({ "counted_quantity": 34 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let line: serde_json::Value = res.json().await.unwrap();
    assert_eq!(line["counted_quantity"], 34);
    assert_eq!(line["status"], "COUNTED");

    let res = client
        .post(format!("{}/counts/{}/reconcile", srv.base_url, count_id))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome: serde_json::Value = res.json().await.unwrap();
    assert_eq!(outcome["count"]["status"], "RECONCILED");
    assert_eq!(outcome["count"]["total_variance"], 6);
    assert_eq!(outcome["adjustments"][0]["variance"], -6);

    let quantity = balance_quantity(&client, &srv.base_url, &product, &location).await;
    assert_eq!(quantity, Some(34));

    // Reconciliation happens at most once.
    let res = client
        .post(format!("{}/counts/{}/reconcile", srv.base_url, count_id))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "already_reconciled");
}

#[tokio::test]
async fn count_requires_a_location() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/counts", srv.base_url))
        .header("x-user-id", user_id())
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn movement_list_filters_and_pages() {
    let srv = TestServer::spawn().await;
    let user = user_id();
    let location = Uuid::new_v4().to_string();

    let client = reqwest::Client::new();
    for _ in 0..3 {
        let res = client
            .post(format!("{}/movements/receipts", srv.base_url))
            .header("x-user-id", &user)
            .json(&json!({
                "to_location_id": location,
                "supplier_id": Uuid::new_v4().to_string(),
                "lines": [{ "product_id": Uuid::new_v4().to_string(), "quantity": 1 }],
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(format!(
            "{}/movements?type=RECEIPT&location_id={}&page=1&limit=2",
            srv.base_url, location
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["total_pages"], 2);

    // No deliveries were booked.
    let res = client
        .get(format!("{}/movements?type=DELIVERY", srv.base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["meta"]["total"], 0);
}
