use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::catalog::FileCatalog;
use crate::container::ContainerRegistry;
use crate::dispatcher::{Dispatcher, MetricsSnapshot};
use crate::error::BalancerError;
use crate::job::{Job, JobType};
use crate::users::{Permission, Role, User, UserService};

#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<Dispatcher>,
    pub catalog: Arc<FileCatalog>,
    pub registry: Arc<ContainerRegistry>,
    pub users: Arc<UserService>,
}

#[derive(Serialize)]
struct JobAccepted {
    job_id: String,
    status: &'static str,
}

#[derive(Serialize)]
struct Message {
    message: String,
}

#[derive(Serialize)]
struct ContainerInfo {
    id: String,
    healthy: bool,
    active_ops: u32,
    total_ops: u64,
    files: usize,
}

#[derive(Serialize)]
struct MetricsResponse {
    dispatcher: MetricsSnapshot,
    containers: Vec<ContainerInfo>,
    replication: u32,
}

#[derive(Deserialize)]
struct UploadParams {
    filename: Option<String>,
    #[serde(rename = "sizeKB")]
    size_kb: Option<u32>,
    priority: Option<u8>,
}

#[derive(Deserialize)]
struct FileParams {
    filename: Option<String>,
    priority: Option<u8>,
}

#[derive(Deserialize)]
struct ShareParams {
    filename: Option<String>,
    to: Option<String>,
    perm: Option<String>,
}

#[derive(Deserialize)]
struct UserParams {
    name: Option<String>,
    pass: Option<String>,
    role: Option<String>,
}

#[derive(Deserialize)]
struct ContainerParams {
    id: Option<String>,
    alive: Option<bool>,
}

#[derive(Deserialize)]
struct ReplicationParams {
    rf: Option<u32>,
}

#[derive(Deserialize)]
struct SchedulerParams {
    name: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/download", get(download))
        .route("/delete", post(delete))
        .route("/share", post(share))
        .route("/user/create", post(user_create))
        .route("/user/update", post(user_update))
        .route("/admin/user/delete", post(admin_user_delete))
        .route("/admin/user/promote", post(admin_user_promote))
        .route("/admin/addContainer", post(admin_add_container))
        .route("/admin/removeContainer", post(admin_remove_container))
        .route("/admin/setHealth", post(admin_set_health))
        .route("/admin/setReplication", post(admin_set_replication))
        .route("/admin/setScheduler", post(admin_set_scheduler))
        .route("/metrics", get(metrics))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve the API until the process exits.
pub async fn run_api(addr: SocketAddr, state: ApiState) {
    let app = router(state);
    tracing::info!(addr = %addr, "Starting HTTP API");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind HTTP API");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "HTTP API failed");
    }
}

fn header<'a>(headers: &'a HeaderMap, key: &str) -> Option<&'a str> {
    headers.get(key).and_then(|v| v.to_str().ok())
}

fn auth(state: &ApiState, headers: &HeaderMap) -> Option<User> {
    state
        .users
        .auth(header(headers, "X-User"), header(headers, "X-Pass"))
}

fn auth_admin(state: &ApiState, headers: &HeaderMap) -> Option<User> {
    auth(state, headers).filter(|u| u.role == Role::Admin)
}

fn message(text: impl Into<String>) -> Json<Message> {
    Json(Message {
        message: text.into(),
    })
}

fn unauthorized() -> (StatusCode, Json<Message>) {
    (StatusCode::UNAUTHORIZED, message("Unauthorized"))
}

fn admin_required() -> (StatusCode, Json<Message>) {
    (StatusCode::UNAUTHORIZED, message("Admin required"))
}

fn accepted(job: &Job) -> (StatusCode, Json<JobAccepted>) {
    (
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id: job.id.to_string(),
            status: "queued",
        }),
    )
}

async fn index() -> &'static str {
    "filebalancer running"
}

async fn upload(
    State(state): State<ApiState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(user) = auth(&state, &headers) else {
        return unauthorized().into_response();
    };
    let Some(filename) = params.filename else {
        return (StatusCode::BAD_REQUEST, message("filename required")).into_response();
    };
    if !state.users.can_write(&user.name, &filename) {
        return (StatusCode::FORBIDDEN, message("Write denied")).into_response();
    }

    let payload = (!body.is_empty()).then(|| body.to_vec());
    let job = Job::new(
        JobType::Upload,
        user.name,
        filename,
        payload,
        params.size_kb.unwrap_or(64),
        params.priority.unwrap_or(5),
    );
    let response = accepted(&job);
    state.dispatcher.submit(job);
    response.into_response()
}

async fn download(
    State(state): State<ApiState>,
    Query(params): Query<FileParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(user) = auth(&state, &headers) else {
        return unauthorized().into_response();
    };
    let Some(filename) = params.filename else {
        return (StatusCode::BAD_REQUEST, message("filename required")).into_response();
    };
    if !state.users.can_read(&user.name, &filename) {
        return (StatusCode::FORBIDDEN, message("Read denied")).into_response();
    }
    if !state.catalog.exists(&filename) {
        return (StatusCode::NOT_FOUND, message("Not found")).into_response();
    }

    let job = Job::new(
        JobType::Download,
        user.name,
        filename,
        None,
        1,
        params.priority.unwrap_or(5),
    );
    let response = accepted(&job);
    state.dispatcher.submit(job);
    response.into_response()
}

async fn delete(
    State(state): State<ApiState>,
    Query(params): Query<FileParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(user) = auth(&state, &headers) else {
        return unauthorized().into_response();
    };
    let Some(filename) = params.filename else {
        return (StatusCode::BAD_REQUEST, message("filename required")).into_response();
    };
    if !state.users.can_write(&user.name, &filename) {
        return (StatusCode::FORBIDDEN, message("Write denied")).into_response();
    }
    if !state.catalog.exists(&filename) {
        return (StatusCode::NOT_FOUND, message("Not found")).into_response();
    }

    let job = Job::new(
        JobType::Delete,
        user.name,
        filename,
        None,
        1,
        params.priority.unwrap_or(5),
    );
    let response = accepted(&job);
    state.dispatcher.submit(job);
    response.into_response()
}

async fn share(
    State(state): State<ApiState>,
    Query(params): Query<ShareParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(user) = auth(&state, &headers) else {
        return unauthorized().into_response();
    };
    let (Some(filename), Some(to), Some(perm)) = (params.filename, params.to, params.perm) else {
        return (StatusCode::BAD_REQUEST, message("filename, to, perm required")).into_response();
    };

    let permission = if perm.eq_ignore_ascii_case("write") {
        Permission::Write
    } else {
        Permission::Read
    };
    if state.users.share(&user.name, &to, &filename, permission) {
        (StatusCode::OK, message("Shared")).into_response()
    } else {
        (StatusCode::FORBIDDEN, message("Share failed")).into_response()
    }
}

async fn user_create(
    State(state): State<ApiState>,
    Query(params): Query<UserParams>,
) -> impl IntoResponse {
    let (Some(name), Some(pass)) = (params.name, params.pass) else {
        return (StatusCode::BAD_REQUEST, message("name, pass required")).into_response();
    };
    let role = match params.role.as_deref() {
        Some(r) if r.eq_ignore_ascii_case("admin") => Role::Admin,
        _ => Role::Standard,
    };
    if state.users.create_user(&name, &pass, role) {
        (StatusCode::CREATED, message("Created")).into_response()
    } else {
        (StatusCode::CONFLICT, message("Exists")).into_response()
    }
}

async fn user_update(
    State(state): State<ApiState>,
    Query(params): Query<UserParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(user) = auth(&state, &headers) else {
        return unauthorized().into_response();
    };
    let role = params
        .role
        .as_deref()
        .filter(|r| r.eq_ignore_ascii_case("admin"))
        .map(|_| Role::Admin);
    if state.users.update_user(&user.name, params.pass.as_deref(), role) {
        (StatusCode::OK, message("Updated")).into_response()
    } else {
        (StatusCode::NOT_FOUND, message("Not found")).into_response()
    }
}

async fn admin_user_delete(
    State(state): State<ApiState>,
    Query(params): Query<UserParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if auth_admin(&state, &headers).is_none() {
        return admin_required().into_response();
    }
    let Some(name) = params.name else {
        return (StatusCode::BAD_REQUEST, message("name required")).into_response();
    };
    if state.users.delete_user(&name) {
        (StatusCode::OK, message("Deleted")).into_response()
    } else {
        (StatusCode::NOT_FOUND, message("Not found")).into_response()
    }
}

async fn admin_user_promote(
    State(state): State<ApiState>,
    Query(params): Query<UserParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if auth_admin(&state, &headers).is_none() {
        return admin_required().into_response();
    }
    let Some(name) = params.name else {
        return (StatusCode::BAD_REQUEST, message("name required")).into_response();
    };
    if state.users.promote_to_admin(&name) {
        (StatusCode::OK, message("Promoted")).into_response()
    } else {
        (StatusCode::NOT_FOUND, message("Not found")).into_response()
    }
}

async fn admin_add_container(
    State(state): State<ApiState>,
    Query(params): Query<ContainerParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if auth_admin(&state, &headers).is_none() {
        return admin_required().into_response();
    }
    let Some(id) = params.id else {
        return (StatusCode::BAD_REQUEST, message("id required")).into_response();
    };
    match state.dispatcher.add_container(&id) {
        Ok(()) => (StatusCode::CREATED, message(format!("Container added: {id}"))).into_response(),
        Err(BalancerError::ContainerExists(_)) => {
            (StatusCode::CONFLICT, message("Container exists")).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, message(e.to_string())).into_response(),
    }
}

async fn admin_remove_container(
    State(state): State<ApiState>,
    Query(params): Query<ContainerParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if auth_admin(&state, &headers).is_none() {
        return admin_required().into_response();
    }
    let Some(id) = params.id else {
        return (StatusCode::BAD_REQUEST, message("id required")).into_response();
    };
    match state.dispatcher.remove_container(&id) {
        Ok(()) => (StatusCode::OK, message(format!("Container removed: {id}"))).into_response(),
        Err(BalancerError::UnknownContainer(_)) => {
            (StatusCode::NOT_FOUND, message("Not found")).into_response()
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, message(e.to_string())).into_response(),
    }
}

async fn admin_set_health(
    State(state): State<ApiState>,
    Query(params): Query<ContainerParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if auth_admin(&state, &headers).is_none() {
        return admin_required().into_response();
    }
    let (Some(id), Some(alive)) = (params.id, params.alive) else {
        return (StatusCode::BAD_REQUEST, message("id, alive required")).into_response();
    };
    match state.dispatcher.set_health(&id, alive) {
        Ok(()) => (
            StatusCode::OK,
            message(format!("Container {id} healthy={alive}")),
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, message("Not found")).into_response(),
    }
}

async fn admin_set_replication(
    State(state): State<ApiState>,
    Query(params): Query<ReplicationParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if auth_admin(&state, &headers).is_none() {
        return admin_required().into_response();
    }
    let rf = params.rf.unwrap_or(2);
    state.dispatcher.set_replication_factor(rf);
    (
        StatusCode::OK,
        message(format!("Replication={}", state.catalog.replication_factor())),
    )
        .into_response()
}

async fn admin_set_scheduler(
    State(state): State<ApiState>,
    Query(params): Query<SchedulerParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if auth_admin(&state, &headers).is_none() {
        return admin_required().into_response();
    }
    let Some(name) = params.name else {
        return (StatusCode::BAD_REQUEST, message("name required")).into_response();
    };
    match state.dispatcher.set_scheduler_by_name(&name) {
        Ok(applied) => (StatusCode::OK, message(format!("Scheduler={applied}"))).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, message("Unknown scheduler")).into_response(),
    }
}

async fn metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let containers = state
        .registry
        .all()
        .iter()
        .map(|c| ContainerInfo {
            id: c.id.clone(),
            healthy: c.is_healthy(),
            active_ops: c.active_ops(),
            total_ops: c.total_ops(),
            files: c.file_count(),
        })
        .collect();

    Json(MetricsResponse {
        dispatcher: state.dispatcher.metrics(),
        containers,
        replication: state.catalog.replication_factor(),
    })
}
