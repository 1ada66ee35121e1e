//! Common test utilities for E2E tests

#![allow(dead_code)]

use horizon::{AppState, config};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A registered account and its tokens
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
        },
        database: config::DatabaseConfig::at(temp_dir.path().join("test.db")),
        auth: config::AuthConfig {
            provider: config::AuthProviderKind::Local,
            token_secret: "test-secret-key-that-is-32-bytes!".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 604800,
            leeway_seconds: 2,
            hosted: config::HostedAuthConfig::default(),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        horizon::metrics::init_metrics();

        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = horizon::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register an account through the API
    pub async fn register(&self, username: &str) -> TestUser {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": TEST_PASSWORD,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "registration of {username} failed");

        let json: Value = response.json().await.unwrap();
        TestUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            username: username.to_string(),
            access_token: json["access_token"].as_str().unwrap().to_string(),
            refresh_token: json["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create a post and return its JSON
    pub async fn create_post(&self, user: &TestUser, body: Value) -> Value {
        let response = self
            .client
            .post(self.url("/api/posts"))
            .header("Authorization", user.bearer())
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    /// GET a path, optionally authenticated, returning status and JSON body
    pub async fn get_json(&self, path: &str, user: Option<&TestUser>) -> (u16, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(user) = user {
            request = request.header("Authorization", user.bearer());
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}
