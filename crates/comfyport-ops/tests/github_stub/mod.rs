#![allow(dead_code)]

//! In-process stand-in for the GitHub REST endpoints `GitHubClient` calls.
//! Every request is recorded so tests can assert on order and payloads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use comfyport_ops::github::GitHubClient;
use serde_json::{json, Value};

pub const REPO: &str = "o/r";

#[derive(Debug, Clone)]
pub struct StubArtifact {
    pub id: u64,
    pub name: String,
    pub expired: bool,
    pub zip: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StubRelease {
    pub tag: String,
    /// `(id, name)` of assets already attached.
    pub assets: Vec<(u64, String)>,
}

#[derive(Debug, Default)]
pub struct StubState {
    /// `"METHOD what"` for every request, in arrival order.
    pub log: Vec<String>,
    /// Run ids listed before any dispatch.
    pub runs_before: Vec<u64>,
    /// Run id that appears in listings once a dispatch happened.
    pub dispatched_run: Option<u64>,
    pub dispatches: Vec<Value>,
    pub run_queries: Vec<HashMap<String, String>>,
    /// `(status, conclusion)` for successive polls of a run; the last repeats.
    pub run_statuses: Vec<(String, Option<String>)>,
    pub run_polls: usize,
    pub artifacts: Vec<StubArtifact>,
    pub release: Option<StubRelease>,
    pub created_releases: Vec<Value>,
    pub deleted_assets: Vec<u64>,
    /// `(name, body length)` of uploaded assets.
    pub uploads: Vec<(String, usize)>,
}

#[derive(Clone)]
struct Ctx {
    state: Arc<Mutex<StubState>>,
    base: String,
}

pub struct GitHubStub {
    state: Arc<Mutex<StubState>>,
    pub url: String,
}

impl GitHubStub {
    pub async fn start(state: StubState) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/repos/o/r/actions/workflows/:workflow/runs", get(list_runs))
            .route(
                "/repos/o/r/actions/workflows/:workflow/dispatches",
                post(dispatch),
            )
            .route("/repos/o/r/actions/runs/:id", get(get_run))
            .route("/repos/o/r/actions/runs/:id/artifacts", get(list_artifacts))
            .route("/download/:id", get(download))
            .route("/repos/o/r/releases/tags/:tag", get(release_by_tag))
            .route("/repos/o/r/releases", post(create_release))
            .route("/repos/o/r/releases/assets/:id", delete(delete_asset))
            .route("/uploads/:release/assets", post(upload_asset))
            .with_state(Ctx {
                state: state.clone(),
                base: url.clone(),
            });

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { state, url }
    }

    pub fn client(&self) -> GitHubClient {
        GitHubClient::new(&self.url, REPO, "test-token").unwrap()
    }

    pub fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }
}

fn run_json(base: &str, id: u64, status: &str, conclusion: Option<&str>) -> Value {
    json!({
        "id": id,
        "status": status,
        "conclusion": conclusion,
        "html_url": format!("{base}/o/r/actions/runs/{id}"),
    })
}

fn release_json(base: &str, release: &StubRelease) -> Value {
    let assets: Vec<Value> = release
        .assets
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect();
    json!({
        "id": 1,
        "tag_name": release.tag,
        "upload_url": format!("{base}/uploads/1/assets{{?name,label}}"),
        "html_url": format!("{base}/o/r/releases/tag/{}", release.tag),
        "assets": assets,
    })
}

async fn list_runs(
    State(ctx): State<Ctx>,
    Path(workflow): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let mut s = ctx.state.lock().unwrap();
    s.log.push(format!("GET runs {workflow}"));
    s.run_queries.push(query);

    let mut ids = s.runs_before.clone();
    if !s.dispatches.is_empty() {
        ids.extend(s.dispatched_run);
    }
    ids.sort_unstable_by(|a, b| b.cmp(a));
    let runs: Vec<Value> = ids
        .iter()
        .map(|id| run_json(&ctx.base, *id, "queued", None))
        .collect();
    Json(json!({ "total_count": runs.len(), "workflow_runs": runs }))
}

async fn dispatch(
    State(ctx): State<Ctx>,
    Path(workflow): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut s = ctx.state.lock().unwrap();
    s.log.push(format!("POST dispatch {workflow}"));
    s.dispatches.push(body);
    StatusCode::NO_CONTENT
}

async fn get_run(State(ctx): State<Ctx>, Path(id): Path<u64>) -> Json<Value> {
    let mut s = ctx.state.lock().unwrap();
    s.log.push(format!("GET run {id}"));
    let idx = s.run_polls.min(s.run_statuses.len().saturating_sub(1));
    s.run_polls += 1;
    let (status, conclusion) = s.run_statuses[idx].clone();
    Json(run_json(&ctx.base, id, &status, conclusion.as_deref()))
}

async fn list_artifacts(State(ctx): State<Ctx>, Path(id): Path<u64>) -> Json<Value> {
    let mut s = ctx.state.lock().unwrap();
    s.log.push(format!("GET artifacts {id}"));
    let artifacts: Vec<Value> = s
        .artifacts
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "name": a.name,
                "archive_download_url": format!("{}/download/{}", ctx.base, a.id),
                "expired": a.expired,
                "size_in_bytes": a.zip.len(),
            })
        })
        .collect();
    Json(json!({ "total_count": artifacts.len(), "artifacts": artifacts }))
}

async fn download(State(ctx): State<Ctx>, Path(id): Path<u64>) -> Response {
    let mut s = ctx.state.lock().unwrap();
    s.log.push(format!("GET download {id}"));
    match s.artifacts.iter().find(|a| a.id == id) {
        Some(a) => (StatusCode::OK, a.zip.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn release_by_tag(State(ctx): State<Ctx>, Path(tag): Path<String>) -> Response {
    let mut s = ctx.state.lock().unwrap();
    s.log.push(format!("GET release {tag}"));
    match &s.release {
        Some(release) if release.tag == tag => Json(release_json(&ctx.base, release)).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn create_release(State(ctx): State<Ctx>, Json(body): Json<Value>) -> Response {
    let mut s = ctx.state.lock().unwrap();
    let tag = body["tag_name"].as_str().unwrap_or_default().to_string();
    s.log.push(format!("POST release {tag}"));
    s.created_releases.push(body);
    let release = StubRelease {
        tag,
        assets: Vec::new(),
    };
    let payload = release_json(&ctx.base, &release);
    s.release = Some(release);
    (StatusCode::CREATED, Json(payload)).into_response()
}

async fn delete_asset(State(ctx): State<Ctx>, Path(id): Path<u64>) -> StatusCode {
    let mut s = ctx.state.lock().unwrap();
    s.log.push(format!("DELETE asset {id}"));
    s.deleted_assets.push(id);
    if let Some(release) = s.release.as_mut() {
        release.assets.retain(|(asset_id, _)| *asset_id != id);
    }
    StatusCode::NO_CONTENT
}

async fn upload_asset(
    State(ctx): State<Ctx>,
    Path(release_id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let mut s = ctx.state.lock().unwrap();
    let name = query.get("name").cloned().unwrap_or_default();
    s.log.push(format!("UPLOAD {name}"));
    s.uploads.push((name.clone(), body.len()));
    let id = 500 + s.uploads.len() as u64;
    if let Some(release) = s.release.as_mut() {
        release.assets.push((id, name.clone()));
    }
    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "name": name, "release": release_id })),
    )
        .into_response()
}
