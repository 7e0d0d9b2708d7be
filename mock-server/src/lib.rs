use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Collections served under `/api/{collection}/`.
pub const COLLECTIONS: [&str; 5] = ["groups", "templates", "pages", "smtp", "campaigns"];

/// In-memory server state: JSON documents keyed by id, per collection.
#[derive(Default)]
pub struct Store {
    next_id: i64,
    collections: HashMap<&'static str, BTreeMap<i64, Value>>,
}

impl Store {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn items(&self, collection: &str) -> Vec<Value> {
        self.collections
            .get(collection)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default()
    }

    fn get(&self, collection: &str, id: i64) -> Option<&Value> {
        self.collections.get(collection)?.get(&id)
    }

    fn find_by_name(&self, collection: &str, name: &str) -> Option<&Value> {
        self.collections
            .get(collection)?
            .values()
            .find(|item| item["name"] == name)
    }

    fn insert(&mut self, collection: &'static str, id: i64, item: Value) {
        self.collections.entry(collection).or_default().insert(id, item);
    }

    fn remove(&mut self, collection: &str, id: i64) -> Option<Value> {
        self.collections.get_mut(collection)?.remove(&id)
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    db: Db,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Db {
        state.db.clone()
    }
}

pub fn app(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        db: Db::default(),
    };

    let mut router = Router::new();
    for collection in COLLECTIONS {
        router = router
            .route(
                &format!("/api/{collection}/"),
                get(move |State(db): State<Db>| list(db, collection)).post(
                    move |State(db): State<Db>, Json(body): Json<Value>| {
                        create(db, collection, body)
                    },
                ),
            )
            .route(
                &format!("/api/{collection}/{{id}}"),
                get(move |State(db): State<Db>, Path(id): Path<i64>| fetch(db, collection, id))
                    .delete(move |State(db): State<Db>, Path(id): Path<i64>| {
                        remove(db, collection, id)
                    }),
            )
            .route(
                &format!("/api/{collection}/{{id}}/"),
                put(
                    move |State(db): State<Db>, Path(id): Path<i64>, Json(body): Json<Value>| {
                        update(db, collection, id, body)
                    },
                ),
            );
    }

    router
        .route("/api/campaigns/{id}/results", get(campaign_results))
        .route("/api/campaigns/{id}/summary", get(campaign_summary))
        .route("/api/campaigns/{id}/complete", get(complete_campaign))
        .route("/api/import/email", post(import_email))
        .route("/api/import/site", post(import_site))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented != Some(&*state.api_key) {
        return failure(StatusCode::UNAUTHORIZED, "Invalid API Key");
    }
    next.run(request).await
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body = json!({ "success": false, "message": message.into(), "data": null });
    (status, Json(body)).into_response()
}

fn success(message: impl Into<String>) -> Response {
    let body = json!({ "success": true, "message": message.into(), "data": null });
    (StatusCode::OK, Json(body)).into_response()
}

fn singular(collection: &str) -> &'static str {
    match collection {
        "groups" => "Group",
        "templates" => "Template",
        "pages" => "Page",
        "smtp" => "SMTP",
        _ => "Campaign",
    }
}

fn name_of(item: &Value) -> &str {
    item.get("name").and_then(Value::as_str).unwrap_or_default()
}

async fn list(db: Db, collection: &'static str) -> Response {
    Json(db.read().await.items(collection)).into_response()
}

async fn fetch(db: Db, collection: &'static str, id: i64) -> Response {
    match db.read().await.get(collection, id) {
        Some(item) => Json(item.clone()).into_response(),
        None => failure(StatusCode::NOT_FOUND, format!("{} not found", singular(collection))),
    }
}

async fn create(db: Db, collection: &'static str, mut body: Value) -> Response {
    if !body.is_object() {
        return failure(StatusCode::BAD_REQUEST, "Invalid request");
    }
    let name = name_of(&body).to_string();
    if name.trim().is_empty() {
        return failure(
            StatusCode::BAD_REQUEST,
            format!("{} name not specified", singular(collection)),
        );
    }

    let mut store = db.write().await;
    if store.find_by_name(collection, &name).is_some() {
        return failure(
            StatusCode::CONFLICT,
            format!("{} name already in use", singular(collection)),
        );
    }

    let id = store.allocate_id();
    body["id"] = json!(id);
    body["modified_date"] = json!(Utc::now());
    if collection == "campaigns" {
        body = match launch(&store, id, body) {
            Ok(campaign) => campaign,
            Err(message) => return failure(StatusCode::BAD_REQUEST, message),
        };
    }
    debug!("created {collection}/{id}");
    store.insert(collection, id, body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update(db: Db, collection: &'static str, id: i64, body: Value) -> Response {
    let Value::Object(changes) = body else {
        return failure(StatusCode::BAD_REQUEST, "Invalid request");
    };
    if changes.get("id").and_then(Value::as_i64) != Some(id) {
        return failure(StatusCode::BAD_REQUEST, "Error: /:id and id mismatch");
    }

    let mut store = db.write().await;
    let Some(existing) = store.get(collection, id).cloned() else {
        return failure(StatusCode::NOT_FOUND, format!("{} not found", singular(collection)));
    };
    let mut merged = existing;
    for (key, value) in changes {
        merged[key.as_str()] = value;
    }
    merged["modified_date"] = json!(Utc::now());
    debug!("updated {collection}/{id}");
    store.insert(collection, id, merged.clone());
    Json(merged).into_response()
}

async fn remove(db: Db, collection: &'static str, id: i64) -> Response {
    match db.write().await.remove(collection, id) {
        Some(_) => success(format!("{} deleted successfully!", singular(collection))),
        None => failure(StatusCode::NOT_FOUND, format!("{} not found", singular(collection))),
    }
}

/// Resolve a `{"name": ...}` reference against `collection`.
fn resolve(store: &Store, collection: &str, reference: &Value) -> Result<Value, String> {
    store
        .find_by_name(collection, name_of(reference))
        .cloned()
        .ok_or_else(|| format!("{} not found", singular(collection)))
}

/// Expand references and queue one result per target, like a real launch.
fn launch(store: &Store, id: i64, mut campaign: Value) -> Result<Value, String> {
    let now = json!(Utc::now());
    campaign["template"] = resolve(store, "templates", &campaign["template"])?;
    campaign["page"] = resolve(store, "pages", &campaign["page"])?;
    campaign["smtp"] = resolve(store, "smtp", &campaign["smtp"])?;

    let references = campaign["groups"].as_array().cloned().unwrap_or_default();
    if references.is_empty() {
        return Err("No groups specified".to_string());
    }
    let groups = references
        .iter()
        .map(|group| resolve(store, "groups", group))
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = Vec::new();
    let mut timeline = vec![json!({
        "email": "", "time": now, "message": "Campaign Created", "details": ""
    })];
    for target in groups.iter().flat_map(|g| g["targets"].as_array().cloned().unwrap_or_default()) {
        results.push(json!({
            "id": format!("r{id}-{}", results.len()),
            "email": target["email"],
            "first_name": target["first_name"],
            "last_name": target["last_name"],
            "position": target["position"],
            "status": "Email Sent",
            "ip": "",
            "latitude": 0.0,
            "longitude": 0.0,
            "send_date": now,
            "reported": false,
            "modified_date": now,
        }));
        timeline.push(json!({
            "email": target["email"], "time": now, "message": "Email Sent", "details": ""
        }));
    }

    campaign["groups"] = Value::Array(groups);
    campaign["status"] = json!("In progress");
    campaign["created_date"] = now.clone();
    if campaign["launch_date"].is_null() {
        campaign["launch_date"] = now;
    }
    campaign["results"] = Value::Array(results);
    campaign["timeline"] = Value::Array(timeline);
    Ok(campaign)
}

async fn campaign_results(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    let store = db.read().await;
    let Some(campaign) = store.get("campaigns", id) else {
        return failure(StatusCode::NOT_FOUND, "Campaign not found");
    };
    Json(json!({
        "id": id,
        "name": campaign["name"],
        "status": campaign["status"],
        "results": campaign["results"],
        "timeline": campaign["timeline"],
    }))
    .into_response()
}

async fn campaign_summary(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    let store = db.read().await;
    let Some(campaign) = store.get("campaigns", id) else {
        return failure(StatusCode::NOT_FOUND, "Campaign not found");
    };
    let results = campaign["results"].as_array().cloned().unwrap_or_default();
    let count = |statuses: &[&str]| {
        results
            .iter()
            .filter(|r| statuses.iter().any(|s| r["status"] == *s))
            .count()
    };
    let stats = json!({
        "total": results.len(),
        "sent": results.len() - count(&["Error"]),
        "opened": count(&["Email Opened", "Clicked Link", "Submitted Data"]),
        "clicked": count(&["Clicked Link", "Submitted Data"]),
        "submitted_data": count(&["Submitted Data"]),
        "email_reported": results.iter().filter(|r| r["reported"] == true).count(),
        "error": count(&["Error"]),
    });
    Json(json!({
        "id": id,
        "name": campaign["name"],
        "status": campaign["status"],
        "created_date": campaign["created_date"],
        "launch_date": campaign["launch_date"],
        "send_by_date": campaign.get("send_by_date").cloned().unwrap_or(Value::Null),
        "completed_date": campaign.get("completed_date").cloned().unwrap_or(Value::Null),
        "stats": stats,
    }))
    .into_response()
}

async fn complete_campaign(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    let mut store = db.write().await;
    let Some(mut campaign) = store.get("campaigns", id).cloned() else {
        return failure(StatusCode::NOT_FOUND, "Campaign not found");
    };
    campaign["status"] = json!("Completed");
    campaign["completed_date"] = json!(Utc::now());
    store.insert("campaigns", id, campaign);
    success("Campaign completed successfully!")
}

#[derive(Deserialize)]
pub struct ImportEmail {
    pub content: String,
    #[serde(default)]
    pub convert_links: bool,
}

#[derive(Deserialize)]
pub struct ImportSite {
    pub url: String,
    #[serde(default)]
    pub include_resources: bool,
}

async fn import_email(Json(input): Json<ImportEmail>) -> Response {
    let content = input.content.replace("\r\n", "\n");
    let Some((head, body)) = content.split_once("\n\n") else {
        return failure(StatusCode::BAD_REQUEST, "Error parsing email");
    };
    let subject = head
        .lines()
        .find_map(|line| line.strip_prefix("Subject:"))
        .map(str::trim)
        .unwrap_or_default();

    let mut reply = Map::new();
    reply.insert("subject".to_string(), json!(subject));
    if body.contains("<html") {
        let html = if input.convert_links {
            track_links(body)
        } else {
            body.to_string()
        };
        reply.insert("html".to_string(), json!(html));
        reply.insert("text".to_string(), json!(""));
    } else {
        reply.insert("html".to_string(), json!(""));
        reply.insert("text".to_string(), json!(body));
    }
    Json(Value::Object(reply)).into_response()
}

/// Point every `href` at the campaign tracking URL.
fn track_links(html: &str) -> String {
    const MARKER: &str = "href=\"";
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(start) = rest.find(MARKER) {
        let value_start = start + MARKER.len();
        out.push_str(&rest[..value_start]);
        match rest[value_start..].find('"') {
            Some(end) => {
                out.push_str("{{.URL}}");
                rest = &rest[value_start + end..];
            }
            None => {
                rest = &rest[value_start..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

async fn import_site(Json(input): Json<ImportSite>) -> Response {
    if !(input.url.starts_with("http://") || input.url.starts_with("https://")) {
        return failure(StatusCode::BAD_REQUEST, "Invalid URL");
    }
    let assets = if input.include_resources {
        "<link rel=\"stylesheet\" href=\"style.css\">"
    } else {
        ""
    };
    let html = format!(
        "<html><head><title>{}</title>{assets}</head><body><form></form></body></html>",
        input.url
    );
    Json(json!({ "html": html })).into_response()
}
