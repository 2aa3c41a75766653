//! Integration test harness for Stallfront.
//!
//! [`TestApp::spawn`] starts a real server on an ephemeral port backed by
//! a throwaway `SQLite` file, so tests exercise the full HTTP stack —
//! routing, extractors, cookies, and persistence — with no external
//! services and no cross-test interference.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};
use tempfile::TempDir;

use stallfront_server::config::ServerConfig;
use stallfront_server::{app, build_state, db};

/// Signing secret for test sessions. Only ever used against throwaway
/// databases.
const TEST_AUTH_SECRET: &str = "kx9v2mQ7rL4tWz8nB3jY6fD1sG5hP0cEuA-test";

/// Password used by the registration helpers.
pub const PASSWORD: &str = "hunter22";

/// A running server instance with its own database and upload directory.
pub struct TestApp {
    pub base_url: String,
    /// Direct handle to the server's database, for fixtures the public
    /// API cannot express (e.g. adding a user to a second organization).
    pub pool: sqlx::SqlitePool,
    _tmp: TempDir,
}

impl TestApp {
    /// Start a fresh server on an ephemeral port.
    pub async fn spawn() -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = tmp.path().join("stallfront-test.db");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has no local addr");
        let base_url = format!("http://{addr}");

        let config = ServerConfig {
            database_url: SecretString::from(format!(
                "sqlite:{}?mode=rwc",
                db_path.display()
            )),
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            auth_secret: SecretString::from(TEST_AUTH_SECRET),
            upload_dir: tmp.path().join("uploads"),
            cookie_secure: false,
        };

        let pool = db::create_pool(&config.database_url)
            .await
            .expect("failed to open test database");
        db::MIGRATOR
            .run(&pool)
            .await
            .expect("failed to run migrations");

        let state = build_state(config, pool.clone());
        tokio::spawn(async move {
            axum::serve(listener, app(state))
                .await
                .expect("test server exited");
        });

        Self {
            base_url,
            pool,
            _tmp: tmp,
        }
    }

    /// Add an existing user to an existing organization, bypassing the
    /// API (which has no invite flow).
    pub async fn add_membership(&self, username: &str, slug: &str, role: &str) {
        sqlx::query(
            r"
            INSERT INTO organization_member (user_id, organization_id, role, created_at)
            SELECT u.id, o.id, ?, datetime('now')
            FROM user u, organization o
            WHERE u.username = ? AND o.slug = ?
            ",
        )
        .bind(role)
        .bind(username)
        .bind(slug)
        .execute(&self.pool)
        .await
        .expect("failed to insert membership fixture");
    }

    /// A client with its own cookie store.
    #[must_use]
    pub fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to build HTTP client")
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register an organization with an owner account.
    pub async fn register(&self, slug: &str, username: &str) -> reqwest::Response {
        self.client()
            .post(self.url("/api/register"))
            .json(&json!({
                "orgName": format!("{slug} test org"),
                "orgSlug": slug,
                "username": username,
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("register request failed")
    }

    /// Register an organization and return a client logged in as its
    /// owner.
    pub async fn register_and_login(&self, slug: &str, username: &str) -> Client {
        let resp = self.register(slug, username).await;
        assert_eq!(resp.status(), 201, "registration failed");

        let client = self.client();
        let resp = client
            .post(self.url(&format!("/api/{slug}/auth/login")))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("login request failed");
        assert_eq!(resp.status(), 200, "login failed");

        client
    }

    /// Create a menu item as an authenticated admin and return its JSON.
    pub async fn create_item(&self, client: &Client, slug: &str, body: &Value) -> Value {
        let resp = client
            .post(self.url(&format!("/api/{slug}/admin/menu")))
            .json(body)
            .send()
            .await
            .expect("create item request failed");
        assert_eq!(resp.status(), 201, "item creation failed");
        resp.json().await.expect("item response was not JSON")
    }

    /// Place a public order and return the raw response.
    pub async fn place_order(&self, slug: &str, body: &Value) -> reqwest::Response {
        self.client()
            .post(self.url(&format!("/api/{slug}/orders")))
            .json(body)
            .send()
            .await
            .expect("order request failed")
    }
}
