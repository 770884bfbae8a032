//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use website_tools::config::AppConfig;
use website_tools::http::HttpServer;
use website_tools::lifecycle::Shutdown;
use website_tools::store::MemoryStore;

pub const ADMIN_KEY: &str = "test-admin-key";

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub updates: mpsc::UnboundedSender<AppConfig>,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

/// Config with a known admin key and no random sweeps.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.admin.api_key = ADMIN_KEY.into();
    config.rate_limit.sweep_probability = 0.0;
    config
}

/// Boot a server on an ephemeral port.
pub async fn spawn_server(config: AppConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let store = Arc::new(MemoryStore::new(None));
    let server = HttpServer::new(config, store.clone());
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    TestServer {
        addr,
        shutdown,
        updates,
        store,
        client,
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Register a user and return their id.
    pub async fn signup(&self, name: &str, email: &str) -> String {
        let res = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&serde_json::json!({ "name": name, "email": email }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 201);
        let body: Value = res.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn submit(&self, user_id: &str, name: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/submissions"))
            .header("x-user-id", user_id)
            .json(&serde_json::json!({
                "name": name,
                "url": format!("https://{}.example", name.to_lowercase()),
                "description": "An AI site builder",
                "scores": { "contentQuality": 8 }
            }))
            .send()
            .await
            .unwrap()
    }

    pub fn admin(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(ADMIN_KEY)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
