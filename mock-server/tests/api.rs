use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

const KEY: &str = "test-key";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, KEY)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, KEY)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn staff() -> Value {
    json!({
        "name": "Staff",
        "targets": [
            {
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@example.com",
                "position": "Analyst"
            },
            {
                "first_name": "Alan",
                "last_name": "Turing",
                "email": "alan@example.com",
                "position": "Engineer"
            }
        ]
    })
}

// --- auth ---

#[tokio::test]
async fn missing_key_is_401() {
    let resp = app(KEY)
        .oneshot(Request::builder().uri("/api/groups/").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid API Key");
}

#[tokio::test]
async fn wrong_key_is_401() {
    let resp = app("other-key")
        .oneshot(request("GET", "/api/pages/"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- collections ---

#[tokio::test]
async fn list_empty() {
    for collection in mock_server::COLLECTIONS {
        let resp = app(KEY)
            .oneshot(request("GET", &format!("/api/{collection}/")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!([]));
    }
}

#[tokio::test]
async fn create_assigns_id_and_modified_date() {
    let resp = app(KEY)
        .oneshot(json_request("POST", "/api/groups/", staff()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let group = body_json(resp).await;
    assert_eq!(group["id"], 1);
    assert_eq!(group["name"], "Staff");
    assert!(group["modified_date"].is_string());
}

#[tokio::test]
async fn create_without_name_is_400() {
    let resp = app(KEY)
        .oneshot(json_request("POST", "/api/templates/", json!({"subject": "Hi"})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Template name not specified");
}

#[tokio::test]
async fn duplicate_name_is_409() {
    let app = app(KEY);
    let first = app
        .clone()
        .oneshot(json_request("POST", "/api/pages/", json!({"name": "Login", "html": "<html/>"})))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(json_request("POST", "/api/pages/", json!({"name": "Login", "html": "<html/>"})))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["message"], "Page name already in use");
}

#[tokio::test]
async fn fetch_missing_is_404() {
    let resp = app(KEY)
        .oneshot(request("GET", "/api/smtp/99"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["message"], "SMTP not found");
}

#[tokio::test]
async fn update_merges_fields() {
    let app = app(KEY);
    app.clone()
        .oneshot(json_request("POST", "/api/groups/", staff()))
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(json_request("PUT", "/api/groups/1/", json!({"id": 1, "name": "Everyone"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let group = body_json(app.oneshot(request("GET", "/api/groups/1")).await.unwrap()).await;
    assert_eq!(group["name"], "Everyone");
    assert_eq!(group["targets"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn update_id_mismatch_is_400() {
    let app = app(KEY);
    app.clone()
        .oneshot(json_request("POST", "/api/groups/", staff()))
        .await
        .unwrap();

    let resp = app
        .oneshot(json_request("PUT", "/api/groups/1/", json!({"id": 2, "name": "x"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_missing_is_404() {
    let resp = app(KEY)
        .oneshot(json_request("PUT", "/api/pages/7/", json!({"id": 7, "name": "x"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_then_fetch_is_404() {
    let app = app(KEY);
    app.clone()
        .oneshot(json_request("POST", "/api/groups/", staff()))
        .await
        .unwrap();

    let resp = app.clone().oneshot(request("DELETE", "/api/groups/1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Group deleted successfully!");

    let resp = app.clone().oneshot(request("GET", "/api/groups/1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.oneshot(request("DELETE", "/api/groups/1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- campaigns ---

async fn seed_campaign_dependencies(app: &axum::Router) {
    let bodies = [
        ("/api/groups/", staff()),
        ("/api/templates/", json!({"name": "Reset", "subject": "Reset", "text": "{{.URL}}"})),
        ("/api/pages/", json!({"name": "Login", "html": "<html/>"})),
        (
            "/api/smtp/",
            json!({"name": "Relay", "host": "smtp:25", "from_address": "it@example.com"}),
        ),
    ];
    for (uri, body) in bodies {
        let resp = app.clone().oneshot(json_request("POST", uri, body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}

fn campaign_body() -> Value {
    json!({
        "name": "Q3 Awareness",
        "template": {"name": "Reset"},
        "page": {"name": "Login"},
        "smtp": {"name": "Relay"},
        "groups": [{"name": "Staff"}],
        "url": "http://phish.example.com"
    })
}

#[tokio::test]
async fn campaign_with_unknown_group_is_400() {
    let app = app(KEY);
    seed_campaign_dependencies(&app).await;
    let mut body = campaign_body();
    body["groups"] = json!([{"name": "Nobody"}]);

    let resp = app
        .oneshot(json_request("POST", "/api/campaigns/", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Group not found");
}

#[tokio::test]
async fn campaign_launch_results_summary_complete() {
    let app = app(KEY);
    seed_campaign_dependencies(&app).await;

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/campaigns/", campaign_body()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let campaign = body_json(resp).await;
    let id = campaign["id"].as_i64().unwrap();
    assert_eq!(campaign["status"], "In progress");
    assert_eq!(campaign["template"]["subject"], "Reset");
    assert_eq!(campaign["results"].as_array().unwrap().len(), 2);

    let results = body_json(
        app.clone()
            .oneshot(request("GET", &format!("/api/campaigns/{id}/results")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(results["name"], "Q3 Awareness");
    assert_eq!(results["timeline"][0]["message"], "Campaign Created");

    let summary = body_json(
        app.clone()
            .oneshot(request("GET", &format!("/api/campaigns/{id}/summary")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(summary["stats"]["total"], 2);
    assert_eq!(summary["stats"]["sent"], 2);
    assert_eq!(summary["stats"]["clicked"], 0);

    let resp = app
        .clone()
        .oneshot(request("GET", &format!("/api/campaigns/{id}/complete")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], true);

    let campaign = body_json(
        app.oneshot(request("GET", &format!("/api/campaigns/{id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(campaign["status"], "Completed");
    assert!(campaign["completed_date"].is_string());
}

#[tokio::test]
async fn summary_of_missing_campaign_is_404() {
    let resp = app(KEY)
        .oneshot(request("GET", "/api/campaigns/3/summary"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- imports ---

#[tokio::test]
async fn import_email_plain_text() {
    let content = "Subject: Password reset\nFrom: it@example.com\n\nClick here to reset.";
    let resp = app(KEY)
        .oneshot(json_request("POST", "/api/import/email", json!({"content": content})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["subject"], "Password reset");
    assert_eq!(body["text"], "Click here to reset.");
    assert_eq!(body["html"], "");
}

#[tokio::test]
async fn import_email_converts_links() {
    let content = "Subject: Hi\n\n<html><a href=\"https://real.example\">go</a></html>";
    let resp = app(KEY)
        .oneshot(json_request(
            "POST",
            "/api/import/email",
            json!({"content": content, "convert_links": true}),
        ))
        .await
        .unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["html"], "<html><a href=\"{{.URL}}\">go</a></html>");
}

#[tokio::test]
async fn import_email_without_body_is_400() {
    let resp = app(KEY)
        .oneshot(json_request("POST", "/api/import/email", json!({"content": "garbage"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_site_returns_html() {
    let resp = app(KEY)
        .oneshot(json_request(
            "POST",
            "/api/import/site",
            json!({"url": "https://login.example.com", "include_resources": false}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_json(resp).await["html"].as_str().unwrap().to_string();
    assert!(html.contains("https://login.example.com"));
}

#[tokio::test]
async fn import_site_rejects_bad_url() {
    let resp = app(KEY)
        .oneshot(json_request("POST", "/api/import/site", json!({"url": "ftp://x"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Invalid URL");
}
