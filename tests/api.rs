//! End-to-end tests against a live server.

use std::time::Duration;

use serde_json::Value;
use website_tools::config::ActionLimit;
use website_tools::store::{SettingsStore, TOTAL_SUBMISSIONS_KEY};

mod common;

use common::{spawn_server, test_config};

#[tokio::test]
async fn test_health_carries_request_id() {
    let server = spawn_server(test_config()).await;

    let res = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_promotional_then_first_free_then_payment() {
    let mut config = test_config();
    config.quota.default_free_threshold = 1;
    let server = spawn_server(config).await;
    let user = server.signup("Ada Lovelace", "ada@example.com").await;

    // Global count 0 < 1: promotional, does not consume the free submission.
    let res = server.submit(&user, "Alpha").await;
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["eligibility"], "promotionalPeriod");
    assert_eq!(body["userTotalSubmissions"], 1);

    // Promotion over, first free submission still available.
    let res = server.submit(&user, "Beta").await;
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["eligibility"], "firstFreeSubmission");

    let res = server.submit(&user, "Gamma").await;
    assert_eq!(res.status(), 402);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "E-PAYMENT-REQUIRED");
    assert_eq!(body["checkout"]["amountCents"], 900);
    let checkout_id = body["checkout"]["id"].as_str().unwrap().to_string();

    let status: Value = server
        .client
        .get(server.url("/api/submissions/status"))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["requiresPayment"], true);
    assert_eq!(status["globalSubmissionsCount"], 2);

    let complete_url = server.url(&format!("/admin/checkout/{checkout_id}/complete"));
    let res = server.admin(server.client.post(&complete_url)).send().await.unwrap();
    assert_eq!(res.status(), 201);
    let tool: Value = res.json().await.unwrap();
    assert_eq!(tool["name"], "Gamma");

    let res = server.admin(server.client.post(&complete_url)).send().await.unwrap();
    assert_eq!(res.status(), 409);

    let stats: Value = server
        .client
        .get(server.url("/api/submissions/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalSubmissions"], 3);
    assert_eq!(stats["isPromotionalPeriod"], false);
    assert!(stats.get("user").is_none());

    let tools: Value = server
        .client
        .get(server.url("/api/tools"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tools.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_failed_checkout_completion_can_be_retried() {
    let mut config = test_config();
    config.quota.default_free_threshold = 0;
    let server = spawn_server(config).await;
    let user = server.signup("Edsger Dijkstra", "edsger@example.com").await;

    assert_eq!(server.submit(&user, "Free").await.status(), 201);
    let res = server.submit(&user, "Paid").await;
    assert_eq!(res.status(), 402);
    let body: Value = res.json().await.unwrap();
    let checkout_id = body["checkout"]["id"].as_str().unwrap().to_string();
    let complete_url = server.url(&format!("/admin/checkout/{checkout_id}/complete"));

    server.store.put_setting(TOTAL_SUBMISSIONS_KEY, "garbage").unwrap();
    let res = server.admin(server.client.post(&complete_url)).send().await.unwrap();
    assert_eq!(res.status(), 500);

    server.store.put_setting(TOTAL_SUBMISSIONS_KEY, "1").unwrap();
    let res = server.admin(server.client.post(&complete_url)).send().await.unwrap();
    assert_eq!(res.status(), 201);
    let tool: Value = res.json().await.unwrap();
    assert_eq!(tool["name"], "Paid");
    assert_eq!(server.store.get_setting(TOTAL_SUBMISSIONS_KEY).unwrap().as_deref(), Some("2"));

    let tools: Value = server
        .client
        .get(server.url("/api/tools"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tools.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_raising_threshold_reopens_promotion() {
    let mut config = test_config();
    config.quota.default_free_threshold = 0;
    let server = spawn_server(config).await;
    let user = server.signup("Grace Hopper", "grace@example.com").await;

    assert_eq!(server.submit(&user, "One").await.status(), 201);
    assert_eq!(server.submit(&user, "Two").await.status(), 402);

    let res = server
        .admin(server.client.put(server.url("/admin/settings/free-threshold")))
        .json(&serde_json::json!({ "threshold": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let stats: Value = res.json().await.unwrap();
    assert_eq!(stats["remainingPromotionalSubmissions"], 9);

    let res = server.submit(&user, "Three").await;
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["eligibility"], "promotionalPeriod");
}

#[tokio::test]
async fn test_login_lockout() {
    let mut config = test_config();
    config.rate_limit.login = ActionLimit {
        max_attempts: 2,
        window_secs: 60,
        lockout_secs: Some(600),
    };
    let server = spawn_server(config).await;
    let login = |key: &'static str| {
        server
            .client
            .post(server.url("/api/auth/login"))
            .json(&serde_json::json!({ "apiKey": key }))
            .send()
    };

    assert_eq!(login("wrong").await.unwrap().status(), 401);
    assert_eq!(login("wrong").await.unwrap().status(), 401);

    let res = login("wrong").await.unwrap();
    assert_eq!(res.status(), 429);
    let retry_after: u64 = res.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!(retry_after > 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["details"]["isLockedOut"], true);

    // The correct key does not help during a lockout.
    assert_eq!(login(common::ADMIN_KEY).await.unwrap().status(), 429);

    // Neither does the admin API.
    let res = server
        .admin(server.client.get(server.url("/admin/status")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);
}

#[tokio::test]
async fn test_successful_login_resets_bucket() {
    let mut config = test_config();
    config.rate_limit.login = ActionLimit {
        max_attempts: 2,
        window_secs: 60,
        lockout_secs: Some(600),
    };
    let server = spawn_server(config).await;
    let login = |key: &'static str| {
        server
            .client
            .post(server.url("/api/auth/login"))
            .json(&serde_json::json!({ "apiKey": key }))
            .send()
    };

    assert_eq!(login("wrong").await.unwrap().status(), 401);
    assert_eq!(login(common::ADMIN_KEY).await.unwrap().status(), 200);
    assert_eq!(login("wrong").await.unwrap().status(), 401);
    assert_eq!(login("wrong").await.unwrap().status(), 401);
}

#[tokio::test]
async fn test_api_rate_limit_headers() {
    let mut config = test_config();
    config.rate_limit.api = ActionLimit {
        max_attempts: 3,
        window_secs: 60,
        lockout_secs: None,
    };
    let server = spawn_server(config).await;

    for expected in ["2", "1", "0"] {
        let res = server.client.get(server.url("/api/tools")).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.headers()["x-ratelimit-remaining"], expected);
        assert!(res.headers().contains_key("x-ratelimit-reset"));
    }

    let res = server.client.get(server.url("/api/tools")).send().await.unwrap();
    assert_eq!(res.status(), 429);
    assert!(res.headers().contains_key("retry-after"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["details"]["isLockedOut"], false);

    // Different client, different bucket.
    let res = server
        .client
        .get(server.url("/api/tools"))
        .header("x-forwarded-for", "198.51.100.4, 10.0.0.1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Health is outside the limited routes.
    let res = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_admin_requires_key() {
    let server = spawn_server(test_config()).await;

    let res = server.client.get(server.url("/admin/status")).send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = server
        .client
        .get(server.url("/admin/status"))
        .bearer_auth("nope")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = server
        .admin(server.client.get(server.url("/admin/status")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "operational");
    assert_eq!(body["totalSubmissions"], 0);
}

#[tokio::test]
async fn test_score_resolution_through_admin() {
    let server = spawn_server(test_config()).await;
    let user = server.signup("Alan Turing", "alan@example.com").await;
    let tool: Value = server.submit(&user, "Scored").await.json().await.unwrap();
    let id = tool["tool"]["id"].as_str().unwrap().to_string();

    let scores_url = server.url(&format!("/api/tools/{id}/scores"));
    let res = server.client.get(&scores_url).send().await.unwrap();
    assert_eq!(res.headers()["cache-control"], "public, s-maxage=300, stale-while-revalidate=600");
    let scores: Value = res.json().await.unwrap();
    assert_eq!(scores["recommended"], "default");
    assert_eq!(scores["defaults"]["contentQuality"], 8.0);
    assert_eq!(scores["defaults"]["speedEfficiency"], 5.0);

    let res = server
        .admin(server.client.put(server.url(&format!("/admin/tools/{id}/editorial"))))
        .json(&serde_json::json!({
            "contentQuality": 7, "speedEfficiency": 7, "creativeFeatures": 7,
            "integrationOptions": 7, "learningCurve": 7, "valueForMoney": 7,
            "isActive": true
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let aggregated_url = server.url(&format!("/admin/tools/{id}/aggregated"));
    let aggregated = |confidence: f64| {
        serde_json::json!({
            "contentQuality": 9, "speedEfficiency": 9, "creativeFeatures": 9,
            "integrationOptions": 9, "learningCurve": 9, "valueForMoney": 9,
            "confidenceScore": confidence, "totalReviews": 4
        })
    };

    let res = server
        .admin(server.client.put(&aggregated_url))
        .json(&aggregated(20.0))
        .send()
        .await
        .unwrap();
    let resolution: Value = res.json().await.unwrap();
    assert_eq!(resolution["recommended"], "editorial");
    assert_eq!(resolution["fallbackReason"], "Low confidence score");

    let res = server
        .admin(server.client.put(&aggregated_url))
        .json(&aggregated(30.0))
        .send()
        .await
        .unwrap();
    let resolution: Value = res.json().await.unwrap();
    assert_eq!(resolution["recommended"], "aggregated");
    assert!(resolution.get("fallbackReason").is_none());

    let res = server
        .admin(server.client.put(&aggregated_url))
        .json(&aggregated(140.0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let missing = server.url("/api/tools/00000000-0000-0000-0000-000000000000/scores");
    assert_eq!(server.client.get(&missing).send().await.unwrap().status(), 404);
}

#[tokio::test]
async fn test_signup_validation_and_conflict() {
    let server = spawn_server(test_config()).await;
    server.signup("Katherine Johnson", "kj@example.com").await;

    let res = server
        .client
        .post(server.url("/api/auth/signup"))
        .json(&serde_json::json!({ "name": "Bad", "email": "not-an-email" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "E-VALIDATION");

    let res = server
        .client
        .post(server.url("/api/auth/signup"))
        .json(&serde_json::json!({ "name": "Again", "email": "KJ@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 409);

    // Three attempts used: the signup bucket is exhausted.
    let res = server
        .client
        .post(server.url("/api/auth/signup"))
        .json(&serde_json::json!({ "name": "Late", "email": "late@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);
}

#[tokio::test]
async fn test_submission_requires_known_user() {
    let server = spawn_server(test_config()).await;

    let res = server.submit("no-such-user", "Ghost").await;
    assert_eq!(res.status(), 401);

    let res = server
        .client
        .post(server.url("/api/submissions"))
        .json(&serde_json::json!({ "name": "Ghost", "url": "https://ghost.example" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn test_cache_control_presets() {
    let server = spawn_server(test_config()).await;
    let user = server.signup("Hedy Lamarr", "hedy@example.com").await;

    let res = server.client.get(server.url("/api/tools")).send().await.unwrap();
    assert_eq!(res.headers()["cache-control"], "public, s-maxage=60, stale-while-revalidate=300");

    let res = server
        .client
        .get(server.url("/api/submissions/status"))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["cache-control"], "private, no-cache");

    let res = server
        .client
        .get(server.url("/api/submissions/stats"))
        .header("x-user-id", &user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["cache-control"], "private, no-cache");
    let stats: Value = res.json().await.unwrap();
    assert_eq!(stats["user"]["eligibility"], "promotionalPeriod");
}

#[tokio::test]
async fn test_config_reload_disables_rate_limit() {
    let server = spawn_server(test_config()).await;

    let res = server.client.get(server.url("/api/tools")).send().await.unwrap();
    assert!(res.headers().contains_key("x-ratelimit-remaining"));

    let mut config = test_config();
    config.rate_limit.enabled = false;
    server.updates.send(config).unwrap();

    let mut applied = false;
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let res = server.client.get(server.url("/api/tools")).send().await.unwrap();
        if !res.headers().contains_key("x-ratelimit-remaining") {
            applied = true;
            break;
        }
    }
    assert!(applied, "reloaded config should disable the api limiter");
}
