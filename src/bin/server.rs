//! Rolegate REST API Server
//!
//! Run with: cargo run --features server --bin rolegate-server
//!
//! Callers identify themselves with the `x-principal-id` header, which a
//! trusted upstream is expected to set.
//!
//! Endpoints:
//!   GET    /health                                  - Liveness and version
//!   POST   /register                                - Create a principal with the default role
//!   GET    /permissions                             - Permission catalog
//!   GET    /permissions/groups                      - Seeding groups
//!   POST   /check                                   - Does the caller hold a permission
//!   GET    /principals/:id/permissions              - Effective permissions (user.read, or self)
//!   POST   /principals/:id/roles                    - Assign role (user.manage)
//!   DELETE /principals/:id/roles/:role              - Remove role (user.manage)
//!   POST   /principals/:id/permissions              - Grant permission (user.manage)
//!   DELETE /principals/:id/permissions/:permission  - Revoke permission (user.manage)
//!   PUT    /principals/:id/active                   - Activate / deactivate (user.manage)
//!   GET    /roles                                   - List roles (role.read)
//!   POST   /roles                                   - Create role (role.create)
//!   GET    /roles/:id                               - Get role (role.read)
//!   PUT    /roles/:id                               - Update role (role.update)
//!   DELETE /roles/:id                               - Delete role (role.delete)
//!   POST   /roles/:id/permissions                   - Add permission (role.update)
//!   DELETE /roles/:id/permissions/:permission       - Remove permission (role.update)

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use rolegate::{
    bootstrap, Admin, Catalog, Error, LmdbStore, NewRole, Permission, PermissionGroup, Principal, PrincipalId,
    Protected, Role, RoleId, RoleUpdate, Settings, Store,
};

const PRINCIPAL_HEADER: &str = "x-principal-id";

// ============================================================================
// State
// ============================================================================

struct AppState {
    store: LmdbStore,
    catalog: Catalog,
}

impl AppState {
    fn protected(&self) -> Protected<'_, LmdbStore> {
        Protected::new(&self.store, &self.catalog)
    }

    /// Principal named by the request header. Unknown ids are unauthenticated.
    fn caller(&self, headers: &HeaderMap) -> Result<Option<Principal>, Error> {
        let id = match headers.get(PRINCIPAL_HEADER).and_then(|v| v.to_str().ok()) {
            Some(id) if !id.trim().is_empty() => PrincipalId::new(id),
            _ => return Ok(None),
        };
        self.store.find_principal(&id)
    }
}

type Shared = State<Arc<AppState>>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
struct RegisterReq {
    name: String,
}

#[derive(Deserialize)]
struct CheckReq {
    permission: String,
    #[serde(default)]
    owner_id: Option<String>,
}

#[derive(Deserialize)]
struct PermissionReq {
    permission: String,
}

#[derive(Deserialize)]
struct RoleReq {
    role_id: String,
}

#[derive(Deserialize)]
struct ActiveReq {
    active: bool,
}

#[derive(Serialize)]
struct HealthRes {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct CheckRes {
    permission: String,
    allowed: bool,
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

// ============================================================================
// Helpers
// ============================================================================

fn status_of(e: &Error) -> StatusCode {
    match e {
        Error::Unauthenticated => StatusCode::UNAUTHORIZED,
        Error::Forbidden { .. } => StatusCode::FORBIDDEN,
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::InvalidPermission(_) | Error::Invalid(_) => StatusCode::BAD_REQUEST,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::Storage(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fail<T>(e: Error) -> Reply<T> {
    let status = status_of(&e);
    if e.is_internal() {
        tracing::error!(error = %e, "request failed");
        return (status, Json(ApiResponse::err("internal error")));
    }
    (status, Json(ApiResponse::err(e.to_string())))
}

fn reply<T>(result: Result<T, Error>) -> Reply<T> {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::ok(data))),
        Err(e) => fail(e),
    }
}

/// Resolve the caller, then run `f` with it
fn as_caller<T>(state: &AppState, headers: &HeaderMap, f: impl FnOnce(Option<&Principal>) -> Result<T, Error>) -> Reply<T> {
    match state.caller(headers) {
        Ok(caller) => reply(f(caller.as_ref())),
        Err(e) => fail(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<HealthRes> {
    Json(HealthRes { status: "ok", version: env!("CARGO_PKG_VERSION") })
}

async fn post_register(State(state): Shared, Json(req): Json<RegisterReq>) -> Reply<Principal> {
    let admin = Admin::new(&state.store, &state.catalog);
    match bootstrap::register(&admin, &req.name) {
        Ok(p) => (StatusCode::CREATED, Json(ApiResponse::ok(p))),
        Err(e) => fail(e),
    }
}

async fn get_permissions(State(state): Shared) -> Json<ApiResponse<Vec<Permission>>> {
    Json(ApiResponse::ok(state.catalog.iter().cloned().collect()))
}

async fn get_groups(State(state): Shared) -> Json<ApiResponse<Vec<PermissionGroup>>> {
    Json(ApiResponse::ok(state.catalog.groups().to_vec()))
}

async fn post_check(State(state): Shared, headers: HeaderMap, Json(req): Json<CheckReq>) -> Reply<CheckRes> {
    let permission = Permission::parse(&req.permission);
    as_caller(&state, &headers, |caller| {
        let allowed = state.protected().check(caller, &permission, req.owner_id.map(PrincipalId::from))?;
        Ok(CheckRes { permission: req.permission, allowed })
    })
}

async fn get_principal_permissions(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply<Vec<Permission>> {
    let target = PrincipalId::new(&id);
    as_caller(&state, &headers, |caller| {
        state
            .protected()
            .principal_permissions(caller, target.clone())?
            .map(|set| set.into_iter().collect())
            .ok_or_else(|| Error::principal_not_found(target))
    })
}

async fn post_principal_role(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RoleReq>,
) -> Reply<()> {
    as_caller(&state, &headers, |caller| {
        state.protected().assign_role_to_user(caller, PrincipalId::new(id), RoleId::new(req.role_id))
    })
}

async fn delete_principal_role(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, role)): Path<(String, String)>,
) -> Reply<()> {
    as_caller(&state, &headers, |caller| {
        state.protected().remove_role_from_user(caller, PrincipalId::new(id), RoleId::new(role))
    })
}

async fn post_principal_permission(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<PermissionReq>,
) -> Reply<()> {
    as_caller(&state, &headers, |caller| {
        state.protected().assign_permission_to_user(caller, PrincipalId::new(id), Permission::parse(&req.permission))
    })
}

async fn delete_principal_permission(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, permission)): Path<(String, String)>,
) -> Reply<()> {
    as_caller(&state, &headers, |caller| {
        state.protected().remove_permission_from_user(caller, PrincipalId::new(id), Permission::parse(&permission))
    })
}

async fn put_principal_active(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<ActiveReq>,
) -> Reply<()> {
    as_caller(&state, &headers, |caller| {
        state.protected().set_principal_active(caller, PrincipalId::new(id), req.active)
    })
}

async fn get_roles(State(state): Shared, headers: HeaderMap) -> Reply<Vec<Role>> {
    as_caller(&state, &headers, |caller| state.protected().list_roles(caller))
}

async fn post_role(State(state): Shared, headers: HeaderMap, Json(req): Json<NewRole>) -> Reply<Role> {
    let (status, body) = as_caller(&state, &headers, |caller| state.protected().create_role(caller, req));
    if status == StatusCode::OK {
        return (StatusCode::CREATED, body);
    }
    (status, body)
}

async fn get_role(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply<Role> {
    as_caller(&state, &headers, |caller| state.protected().get_role(caller, RoleId::new(id)))
}

async fn put_role(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RoleUpdate>,
) -> Reply<Role> {
    as_caller(&state, &headers, |caller| state.protected().update_role(caller, RoleId::new(id), req))
}

async fn delete_role(State(state): Shared, headers: HeaderMap, Path(id): Path<String>) -> Reply<()> {
    as_caller(&state, &headers, |caller| state.protected().delete_role(caller, RoleId::new(id)))
}

async fn post_role_permission(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<PermissionReq>,
) -> Reply<()> {
    as_caller(&state, &headers, |caller| {
        state.protected().add_permission_to_role(caller, RoleId::new(id), Permission::parse(&req.permission))
    })
}

async fn delete_role_permission(
    State(state): Shared,
    headers: HeaderMap,
    Path((id, permission)): Path<(String, String)>,
) -> Reply<()> {
    as_caller(&state, &headers, |caller| {
        state.protected().remove_permission_from_role(caller, RoleId::new(id), Permission::parse(&permission))
    })
}

// ============================================================================
// Main
// ============================================================================

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/register", post(post_register))
        .route("/permissions", get(get_permissions))
        .route("/permissions/groups", get(get_groups))
        .route("/check", post(post_check))
        .route("/principals/:id/permissions", get(get_principal_permissions).post(post_principal_permission))
        .route("/principals/:id/permissions/:permission", delete(delete_principal_permission))
        .route("/principals/:id/roles", post(post_principal_role))
        .route("/principals/:id/roles/:role", delete(delete_principal_role))
        .route("/principals/:id/active", put(put_principal_active))
        .route("/roles", get(get_roles).post(post_role))
        .route("/roles/:id", get(get_role).put(put_role).delete(delete_role))
        .route("/roles/:id/permissions", post(post_role_permission))
        .route("/roles/:id/permissions/:permission", delete(delete_role_permission))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(path = %settings.db_path.display(), "opening database");
    let store = LmdbStore::open_with(&settings.db_path, settings.map_size).context("failed to open database")?;
    let catalog = Catalog::standard();

    {
        let admin = Admin::new(&store, &catalog);
        if settings.seed {
            bootstrap::seed_system_roles(&admin).context("failed to seed system roles")?;
        }
        if let Some(id) = &settings.admin {
            bootstrap::ensure_admin(&admin, &PrincipalId::new(id)).context("failed to set up admin principal")?;
        }
    }

    let app = router(Arc::new(AppState { store, catalog }));

    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind))?;
    tracing::info!(addr = %settings.bind, "rolegate server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
