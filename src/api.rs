//! HTTP API: OAuth gateway, ticket CRUD, archive, pipeline status, bot.
//!
//! Handlers stay thin: pull the requester identity off the headers, push
//! the work through `StoreHandle`, map domain errors onto `ApiError`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::archive::ArchiveStore;
use crate::auth::DiscordOauth;
use crate::bot::{NotifierHandle, TicketNotification};
use crate::errors::{AuthError, TicketError};
use crate::models::{StatsQuery, TicketComment, TicketCreate, TicketFilter, TicketUpdate};
use crate::pipeline;
use crate::store::StoreHandle;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: StoreHandle,
    pub oauth: Option<DiscordOauth>,
    pub archive: ArchiveStore,
    pub notifier: NotifierHandle,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: String,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub assignee: String,
}

#[derive(Deserialize)]
pub struct DependenciesQuery {
    pub shot_id: String,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<TicketError> for ApiError {
    fn from(e: TicketError) -> Self {
        match e {
            TicketError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            TicketError::Validation { .. } => ApiError::BadRequest(e.to_string()),
            TicketError::Storage(_) | TicketError::LockPoisoned => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        // All OAuth failures surface as 400 with the upstream detail.
        ApiError::BadRequest(e.to_string())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/auth/login", get(auth_login))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/bot-invite", get(auth_bot_invite))
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/statistics", get(ticket_statistics))
        .route("/api/tickets/{id}", get(get_ticket).put(update_ticket))
        .route("/api/tickets/{id}/comments", post(add_comment))
        .route("/api/tickets/{id}/assign", post(assign_ticket))
        .route("/api/tickets/{id}/history", get(ticket_history))
        .route("/api/old-tickets", get(list_old_tickets))
        .route("/api/render-queue", get(render_queue))
        .route("/api/system/health", get(system_health))
        .route("/api/statistics/productivity", get(productivity_stats))
        .route("/api/pipeline/dependencies", get(pipeline_dependencies))
        .route(
            "/api/projects/{project_id}/milestones",
            get(project_milestones),
        )
        .route("/api/bot/status", get(bot_status))
        .route("/api/health", get(api_health))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Requester identity from the `x-user` header; `"web"` when absent.
fn requester(headers: &HeaderMap) -> String {
    headers
        .get("x-user")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("web")
        .to_string()
}

// ── Auth handlers ─────────────────────────────────────────────────────

async fn auth_login(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AuthError::NotConfigured("Discord credentials are not set".into()))?;
    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, oauth.authorize_url())],
    )
        .into_response())
}

async fn auth_callback(
    State(state): State<SharedState>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AuthError::NotConfigured("Discord credentials are not set".into()))?;
    let outcome = oauth.complete_login(&query.code).await?;
    info!("Completed Discord login");
    Ok(Json(outcome))
}

async fn auth_bot_invite(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AuthError::NotConfigured("Discord credentials are not set".into()))?;
    Ok(Json(serde_json::json!({
        "invite_url": oauth.authorize_url(),
    })))
}

// ── Ticket handlers ───────────────────────────────────────────────────

async fn create_ticket(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(req): Json<TicketCreate>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(TicketError::validation("title", "must not be empty").into());
    }
    if req.description.trim().is_empty() {
        return Err(TicketError::validation("description", "must not be empty").into());
    }
    let created_by = requester(&headers);
    let ticket = state
        .store
        .call(move |repo| repo.create(req, &created_by))
        .await?;
    info!("Created ticket {}", ticket.id);
    state
        .notifier
        .enqueue(TicketNotification::Created(ticket.clone()));
    Ok(Json(ticket))
}

async fn list_tickets(
    State(state): State<SharedState>,
    Query(filter): Query<TicketFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let tickets = state.store.call(move |repo| repo.list(&filter)).await?;
    Ok(Json(tickets))
}

async fn ticket_statistics(
    State(state): State<SharedState>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .store
        .call(move |repo| repo.statistics(&query))
        .await?;
    Ok(Json(stats))
}

async fn get_ticket(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state.store.call(move |repo| repo.get(&id)).await?;
    Ok(Json(ticket))
}

async fn update_ticket(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<TicketUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    if update.is_empty() {
        return Err(TicketError::validation("update", "no fields to update").into());
    }
    let user = requester(&headers);
    let ticket = state
        .store
        .call(move |repo| repo.update(&id, update, &user))
        .await?;
    Ok(Json(ticket))
}

async fn add_comment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(comment): Json<TicketComment>,
) -> Result<impl IntoResponse, ApiError> {
    if comment.content.trim().is_empty() {
        return Err(TicketError::validation("content", "must not be empty").into());
    }
    let ticket_id = id.clone();
    let comment_id = state
        .store
        .call(move |repo| repo.add_comment(&ticket_id, comment))
        .await?;
    Ok(Json(serde_json::json!({
        "message": "Comment added successfully",
        "ticket_id": id,
        "comment_id": comment_id,
    })))
}

async fn assign_ticket(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<AssignRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.assignee.trim().is_empty() {
        return Err(TicketError::validation("assignee", "must not be empty").into());
    }
    let user = requester(&headers);
    let ticket_id = id.clone();
    let assignee = req.assignee.clone();
    state
        .store
        .call(move |repo| repo.assign(&ticket_id, &assignee, &user))
        .await?;
    Ok(Json(serde_json::json!({
        "message": "Ticket assigned successfully",
        "ticket_id": id,
        "assignee": req.assignee,
    })))
}

async fn ticket_history(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket_id = id.clone();
    let history = state
        .store
        .call(move |repo| repo.history(&ticket_id))
        .await?;
    Ok(Json(serde_json::json!({
        "ticket_id": id,
        "history": history,
    })))
}

// ── Archive and pipeline handlers ─────────────────────────────────────

async fn list_old_tickets(
    State(state): State<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    // Archive reads are filesystem-bound; keep them off the async workers.
    let archive = state.archive.clone();
    let tickets = tokio::task::spawn_blocking(move || archive.list())
        .await
        .map_err(|e| ApiError::Internal(format!("Archive task panicked: {}", e)))??;
    Ok(Json(tickets))
}

async fn render_queue() -> impl IntoResponse {
    Json(pipeline::render_queue(Utc::now()))
}

async fn system_health() -> impl IntoResponse {
    Json(pipeline::system_health())
}

async fn project_milestones(Path(project_id): Path<String>) -> impl IntoResponse {
    Json(pipeline::project_milestones(&project_id, Utc::now()))
}

async fn productivity_stats() -> impl IntoResponse {
    Json(pipeline::productivity_stats())
}

async fn pipeline_dependencies(
    Query(query): Query<DependenciesQuery>,
) -> impl IntoResponse {
    Json(pipeline::shot_dependencies(&query.shot_id))
}

// ── Status handlers ───────────────────────────────────────────────────

async fn bot_status(State(state): State<SharedState>) -> impl IntoResponse {
    let status = if state.notifier.is_enabled() {
        "running"
    } else {
        "disabled"
    };
    Json(serde_json::json!({"status": status}))
}

async fn api_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::{NoopNotifier, NotifierTask};
    use crate::store::MemoryTickets;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        test_app_with_archive(ArchiveStore::new("/nonexistent-archive"))
    }

    fn test_app_with_archive(archive: ArchiveStore) -> Router {
        let task = NotifierTask::spawn(Box::new(NoopNotifier));
        let state = Arc::new(AppState {
            store: StoreHandle::new(MemoryTickets::new()),
            oauth: None,
            archive,
            notifier: task.handle(),
        });
        api_router().with_state(state)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn sample_create() -> serde_json::Value {
        serde_json::json!({
            "title": "Crash on export",
            "description": "Nuke crashes when exporting shot 042",
            "priority": "high",
            "type": "bug",
            "project_id": "proj1"
        })
    }

    async fn create_ticket_via(app: &Router, user: Option<&str>) -> serde_json::Value {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/tickets")
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user", user);
        }
        let request = builder.body(Body::from(sample_create().to_string())).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response.into_body()).await
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_api_health_reports_ok() {
        let response = test_app().oneshot(get_req("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_login_without_credentials_is_rejected() {
        let response = test_app().oneshot(get_req("/auth/login")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["error"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn test_login_redirects_when_configured() {
        let task = NotifierTask::spawn(Box::new(NoopNotifier));
        let state = Arc::new(AppState {
            store: StoreHandle::new(MemoryTickets::new()),
            oauth: DiscordOauth::from_credentials(
                Some("cid".into()),
                Some("sec".into()),
                "http://localhost:8000/auth/callback".into(),
            ),
            archive: ArchiveStore::new("/nonexistent-archive"),
            notifier: task.handle(),
        });
        let app = api_router().with_state(state);

        let response = app.clone().oneshot(get_req("/auth/login")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://discord.com/api/oauth2/authorize"));
        assert!(location.contains("client_id=cid"));

        let response = app.oneshot(get_req("/auth/bot-invite")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert!(body["invite_url"]
            .as_str()
            .unwrap()
            .contains("scope=bot%20applications.commands"));
    }

    #[tokio::test]
    async fn test_bot_invite_requires_credentials() {
        let response = test_app()
            .oneshot(get_req("/auth/bot-invite"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_ticket_defaults() {
        let app = test_app();
        let ticket = create_ticket_via(&app, None).await;
        assert_eq!(ticket["status"], "open");
        assert_eq!(ticket["time_spent"], 0.0);
        assert_eq!(ticket["created_by"], "web");
        assert!(ticket["id"].as_str().unwrap().starts_with("TICKET-"));
    }

    #[tokio::test]
    async fn test_create_ticket_uses_x_user_header() {
        let app = test_app();
        let ticket = create_ticket_via(&app, Some("alice")).await;
        assert_eq!(ticket["created_by"], "alice");
    }

    #[tokio::test]
    async fn test_create_ticket_rejects_empty_title() {
        let app = test_app();
        let request = post_json(
            "/api/tickets",
            serde_json::json!({
                "title": "  ",
                "description": "d",
                "priority": "low",
                "type": "task",
                "project_id": "p"
            }),
        );
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_ticket_rejects_unknown_priority() {
        let app = test_app();
        let request = post_json(
            "/api/tickets",
            serde_json::json!({
                "title": "t",
                "description": "d",
                "priority": "urgent",
                "type": "bug",
                "project_id": "p"
            }),
        );
        let response = app.oneshot(request).await.unwrap();
        // serde rejects the unknown enum value at the JSON boundary.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_get_roundtrip_and_not_found() {
        let app = test_app();
        let created = create_ticket_via(&app, None).await;
        let id = created["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(get_req(&format!("/api/tickets/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(fetched, created);

        let response = app
            .oneshot(get_req("/api/tickets/TICKET-20240101-ffffffff"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_with_status_filter() {
        let app = test_app();
        let first = create_ticket_via(&app, None).await;
        create_ticket_via(&app, None).await;

        let request = Request::builder()
            .method("PUT")
            .uri(format!("/api/tickets/{}", first["id"].as_str().unwrap()))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"status": "resolved"}).to_string(),
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(get_req("/api/tickets?status=resolved"))
            .await
            .unwrap();
        let tickets: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0]["id"], first["id"]);

        let response = app.oneshot(get_req("/api/tickets")).await.unwrap();
        let tickets: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(tickets.len(), 2);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_payload() {
        let app = test_app();
        let created = create_ticket_via(&app, None).await;
        let request = Request::builder()
            .method("PUT")
            .uri(format!("/api/tickets/{}", created["id"].as_str().unwrap()))
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_comment_then_history() {
        let app = test_app();
        let created = create_ticket_via(&app, None).await;
        let id = created["id"].as_str().unwrap();

        let request = post_json(
            &format!("/api/tickets/{}/comments", id),
            serde_json::json!({"content": "Working on this now", "author": "bob"}),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(ack["ticket_id"], id);
        assert!(ack["comment_id"].as_str().unwrap().starts_with("comment-"));

        let response = app
            .oneshot(get_req(&format!("/api/tickets/{}/history", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response.into_body()).await;
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["type"], "created");
        assert_eq!(history[1]["type"], "comment_added");
        assert_eq!(history[1]["user"], "bob");
    }

    #[tokio::test]
    async fn test_assign_records_event() {
        let app = test_app();
        let created = create_ticket_via(&app, None).await;
        let id = created["id"].as_str().unwrap();

        let request = post_json(
            &format!("/api/tickets/{}/assign", id),
            serde_json::json!({"assignee": "carol"}),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let ack: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(ack["assignee"], "carol");

        let response = app
            .clone()
            .oneshot(get_req(&format!("/api/tickets/{}", id)))
            .await
            .unwrap();
        let ticket: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(ticket["assigned_to"], "carol");
    }

    #[tokio::test]
    async fn test_mutations_on_unknown_ticket_are_404() {
        let app = test_app();
        let missing = "TICKET-20240101-ffffffff";

        let request = post_json(
            &format!("/api/tickets/{}/comments", missing),
            serde_json::json!({"content": "c", "author": "a"}),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let request = post_json(
            &format!("/api/tickets/{}/assign", missing),
            serde_json::json!({"assignee": "a"}),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(get_req(&format!("/api/tickets/{}/history", missing)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_statistics_shape() {
        let app = test_app();
        create_ticket_via(&app, None).await;

        let response = app
            .oneshot(get_req("/api/tickets/statistics"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stats: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(stats["total_tickets"], 1);
        assert_eq!(stats["status_breakdown"]["open"], 1);
        assert_eq!(stats["priority_breakdown"]["high"], 1);
        assert!(stats["average_resolution_hours"].is_null());
    }

    #[tokio::test]
    async fn test_old_tickets_from_archive_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("TICKET-old.md"),
            "# Fix lighting bug\nCreated by: alice\nStatus: closed\n",
        )
        .unwrap();
        let app = test_app_with_archive(ArchiveStore::new(dir.path()));

        let response = app.oneshot(get_req("/api/old-tickets")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let tickets: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0]["id"], "TICKET-old");
        assert_eq!(tickets[0]["title"], "Fix lighting bug");
        assert_eq!(tickets[0]["author"], "alice");
    }

    #[tokio::test]
    async fn test_pipeline_mock_endpoints() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(get_req("/api/render-queue"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let jobs: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(jobs[0]["shot_name"], "SHOT_042");

        let response = app
            .clone()
            .oneshot(get_req("/api/system/health"))
            .await
            .unwrap();
        let health: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(health["render_farm"]["status"], "healthy");

        let response = app
            .oneshot(get_req("/api/projects/proj1/milestones"))
            .await
            .unwrap();
        let milestones: Vec<serde_json::Value> = body_json(response.into_body()).await;
        assert_eq!(milestones[0]["title"], "Final Delivery");
    }

    #[tokio::test]
    async fn test_productivity_statistics() {
        let response = test_app()
            .oneshot(get_req("/api/statistics/productivity"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stats: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(stats["assets_completed"], 25);
        assert_eq!(stats["department_breakdown"]["modeling"], 45);
    }

    #[tokio::test]
    async fn test_pipeline_dependencies_require_a_shot() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(get_req("/api/pipeline/dependencies?shot_id=SHOT_042"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let deps: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(deps["shot_id"], "SHOT_042");
        assert_eq!(deps["assets"].as_array().unwrap().len(), 2);

        // shot_id is mandatory; the query extractor rejects its absence.
        let response = app
            .oneshot(get_req("/api/pipeline/dependencies"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bot_status_disabled_without_token() {
        let response = test_app().oneshot(get_req("/api/bot/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(response.into_body()).await;
        assert_eq!(body["status"], "disabled");
    }
}
