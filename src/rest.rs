//! REST API layer using Axum.
//!
//! Routes mirror the public surface of the booking API: auth (register/login),
//! company CRUD and the five booking operations, all wrapped in the uniform
//! `{ success, count?, data }` envelope. OpenAPI docs are generated with
//! utoipa and served under `/api-docs`.

use std::sync::Arc;

use axum::async_trait;
use axum::body::Body;
use axum::extract::{FromRequest, Path, Query, State};
use axum::http::{header, HeaderMap, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{create_jwt, validate_jwt, verify_password};
use crate::error::ApiError;
use crate::mail::Mailer;
use crate::models::{Booking, BookingView, Company, CompanySummary, Role, User, UserSummary, UserView};
use crate::service::{self, BookingPatch};
use crate::storage::Storage;

/// Shared app state for REST handlers (Arc-wrapped for concurrency)
pub struct AppState {
    pub storage: Storage,
    pub mailer: Arc<Mailer>,
    pub jwt_secret: Vec<u8>,
    pub jwt_ttl_secs: u64,
}

/// Success envelope. `count` is only present on list responses.
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: T,
}

fn one<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        count: None,
        data,
    })
}

fn many<T: Serialize>(data: Vec<T>) -> Json<Envelope<Vec<T>>> {
    Json(Envelope {
        success: true,
        count: Some(data.len()),
        data,
    })
}

/// Body extractor whose rejection is the uniform failure envelope rather
/// than axum's plain-text 422: an undeserializable body is a 400 like any
/// other validation failure.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

// --- Request/response DTOs ---

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub tel: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Interview start date
    pub booking_date: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub booking_date: Option<DateTime<Utc>>,
    /// New owning company id
    pub company: Option<String>,
    /// New owning user id
    pub user: Option<String>,
}

#[derive(Deserialize)]
pub struct ListBookingsQuery {
    #[serde(rename = "companyId")]
    pub company_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CompanyRequest {
    pub name: String,
    pub position: String,
    pub jd: String,
    pub location: String,
    pub tel: String,
    pub image: String,
}

// --- Auth plumbing ---

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn load_actor(state: &AppState, token: &str) -> Result<User, ApiError> {
    let claims = validate_jwt(&state.jwt_secret, token)
        .map_err(|_| ApiError::Forbidden("Not authorized to access this route".to_string()))?;
    state
        .storage
        .get_user(&claims.sub)?
        .ok_or_else(|| ApiError::Forbidden("Not authorized to access this route".to_string()))
}

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::Forbidden("Not authorized to access this route".to_string()))?
        .to_string();
    let user = load_actor(&state, &token)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Inline auth for admin-only routes that share a path with public ones
/// (e.g. GET vs POST on `/api/v1/companies`), where the route-level
/// middleware cannot be applied to only some methods.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Forbidden("Not authorized to access this route".to_string()))?;
    let actor = load_actor(state, token)?;
    if actor.role != Role::Admin {
        return Err(ApiError::Forbidden(
            "User role user is not authorized to access this route".to_string(),
        ));
    }
    Ok(actor)
}

// --- OpenAPI doc ---

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Job Interview Booking API", version = "1.0.0"),
    paths(
        register_handler,
        login_handler,
        me_handler,
        list_bookings_handler,
        get_booking_handler,
        create_booking_handler,
        update_booking_handler,
        delete_booking_handler,
        bookings_by_user_handler,
        bookings_by_company_handler,
        list_companies_handler,
        get_company_handler,
        create_company_handler,
        update_company_handler,
        delete_company_handler,
    ),
    components(schemas(
        Booking,
        BookingView,
        Company,
        CompanySummary,
        UserSummary,
        UserView,
        Role,
        RegisterRequest,
        LoginRequest,
        TokenResponse,
        CreateBookingRequest,
        UpdateBookingRequest,
        CompanyRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and JWT login"),
        (name = "bookings", description = "The booking managing API"),
        (name = "companies", description = "Company catalogue"),
    )
)]
struct ApiDoc;

/// Create the Axum router for the whole API surface.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Company mutations do their own admin check (see require_admin), so the
    // mixed public/admin method routers below stay in the public group.
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/login", post(login_handler))
        .route(
            "/api/v1/companies",
            get(list_companies_handler).post(create_company_handler),
        )
        .route(
            "/api/v1/companies/:id",
            get(get_company_handler)
                .put(update_company_handler)
                .delete(delete_company_handler),
        )
        .route(
            "/api/v1/bookings/companies/:id",
            get(bookings_by_company_handler),
        );

    let protected_routes = Router::new()
        .route("/api/v1/auth/me", get(me_handler))
        .route("/api/v1/bookings", get(list_bookings_handler))
        .route(
            "/api/v1/bookings/:id",
            get(get_booking_handler)
                .put(update_booking_handler)
                .delete(delete_booking_handler),
        )
        .route("/api/v1/bookings/users/:id", get(bookings_by_user_handler))
        .route("/api/v1/companies/:id/bookings", post(create_booking_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

// --- Auth handlers ---

#[utoipa::path(post, path = "/api/v1/auth/register", tag = "auth",
    request_body = RegisterRequest,
    responses((status = 200, description = "Account created, JWT issued", body = TokenResponse)))]
async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = service::register_user(
        &state.storage,
        &payload.name,
        &payload.email,
        &payload.tel,
        &payload.password,
    )?;
    let token = create_jwt(&state.jwt_secret, &user, state.jwt_ttl_secs)
        .map_err(|e| ApiError::Unexpected(format!("jwt: {e}")))?;
    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}

#[utoipa::path(post, path = "/api/v1/auth/login", tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "JWT issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials")))]
async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .storage
        .find_user_by_email(&payload.email)?
        .ok_or_else(|| ApiError::Forbidden("Invalid credentials".to_string()))?;
    if !verify_password(&payload.password, &user.password_hash).unwrap_or(false) {
        return Err(ApiError::Forbidden("Invalid credentials".to_string()));
    }
    let token = create_jwt(&state.jwt_secret, &user, state.jwt_ttl_secs)
        .map_err(|e| ApiError::Unexpected(format!("jwt: {e}")))?;
    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}

#[utoipa::path(get, path = "/api/v1/auth/me", tag = "auth",
    security(("bearer" = [])),
    responses((status = 200, description = "Current account", body = UserView)))]
async fn me_handler(Extension(actor): Extension<User>) -> Json<Envelope<UserView>> {
    one(UserView::from(&actor))
}

// --- Booking handlers ---

#[utoipa::path(get, path = "/api/v1/bookings", tag = "bookings",
    params(("companyId" = Option<String>, Query, description = "Narrow an admin listing to one company")),
    security(("bearer" = [])),
    responses((status = 200, description = "Bookings visible to the caller, role-scoped", body = [BookingView])))]
async fn list_bookings_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<User>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Envelope<Vec<BookingView>>>, ApiError> {
    let bookings = service::list_bookings(&state.storage, &actor, query.company_id.as_deref())?;
    Ok(many(bookings))
}

#[utoipa::path(get, path = "/api/v1/bookings/{id}", tag = "bookings",
    params(("id" = String, Path, description = "Booking id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The booking", body = BookingView),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "No such booking")))]
async fn get_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<BookingView>>, ApiError> {
    let booking = service::get_booking(&state.storage, &actor, &id)?;
    Ok(one(booking))
}

#[utoipa::path(post, path = "/api/v1/companies/{id}/bookings", tag = "bookings",
    params(("id" = String, Path, description = "Company id")),
    request_body = CreateBookingRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Booking created", body = Booking),
        (status = 400, description = "Booking quota reached"),
        (status = 404, description = "No such company")))]
async fn create_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<User>,
    Path(company_id): Path<String>,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> Result<Json<Envelope<Booking>>, ApiError> {
    let booking =
        service::create_booking(&state.storage, &actor, &company_id, payload.booking_date)?;
    // Fire-and-forget: the response does not wait for the mail dispatch.
    state.mailer.dispatch_confirmation(&actor, &booking);
    Ok(one(booking))
}

#[utoipa::path(put, path = "/api/v1/bookings/{id}", tag = "bookings",
    params(("id" = String, Path, description = "Booking id")),
    request_body = UpdateBookingRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated booking", body = Booking),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "No such booking")))]
async fn update_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateBookingRequest>,
) -> Result<Json<Envelope<Booking>>, ApiError> {
    let patch = BookingPatch {
        booking_date: payload.booking_date,
        company_id: payload.company,
        user_id: payload.user,
    };
    let booking = service::update_booking(&state.storage, &actor, &id, patch)?;
    Ok(one(booking))
}

#[utoipa::path(delete, path = "/api/v1/bookings/{id}", tag = "bookings",
    params(("id" = String, Path, description = "Booking id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Booking deleted"),
        (status = 401, description = "Not the owner"),
        (status = 404, description = "No such booking")))]
async fn delete_booking_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    service::delete_booking(&state.storage, &actor, &id)?;
    Ok(one(json!({})))
}

#[utoipa::path(get, path = "/api/v1/bookings/users/{id}", tag = "bookings",
    params(("id" = String, Path, description = "User id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Bookings for the user", body = [BookingView]),
        (status = 400, description = "Malformed user id")))]
async fn bookings_by_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Vec<BookingView>>>, ApiError> {
    let bookings = service::list_bookings_by_user(&state.storage, &actor, &id)?;
    Ok(many(bookings))
}

#[utoipa::path(get, path = "/api/v1/bookings/companies/{id}", tag = "bookings",
    params(("id" = String, Path, description = "Company id")),
    responses(
        (status = 200, description = "Bookings for the company, role-scoped", body = [BookingView]),
        (status = 400, description = "Malformed company id")))]
async fn bookings_by_company_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Vec<BookingView>>>, ApiError> {
    // Public route: a valid bearer token scopes the result like any other
    // list; anonymous callers take the non-admin path with no owned bookings,
    // which still validates the id but matches nothing.
    let actor = match bearer_token(&headers) {
        Some(token) => load_actor(&state, token)?,
        None => anonymous(),
    };
    let bookings = service::list_bookings_by_company(&state.storage, &actor, &id)?;
    Ok(many(bookings))
}

fn anonymous() -> User {
    User {
        id: String::new(),
        name: String::new(),
        email: String::new(),
        tel: String::new(),
        role: Role::User,
        password_hash: String::new(),
        created_at: Utc::now(),
    }
}

// --- Company handlers ---

#[utoipa::path(get, path = "/api/v1/companies", tag = "companies",
    responses((status = 200, description = "All companies", body = [Company])))]
async fn list_companies_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<Vec<Company>>>, ApiError> {
    let companies = state.storage.list_companies()?;
    Ok(many(companies))
}

#[utoipa::path(get, path = "/api/v1/companies/{id}", tag = "companies",
    params(("id" = String, Path, description = "Company id")),
    responses(
        (status = 200, description = "The company", body = Company),
        (status = 404, description = "No such company")))]
async fn get_company_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Company>>, ApiError> {
    let company = state
        .storage
        .get_company(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("No company with the id of {id}")))?;
    Ok(one(company))
}

#[utoipa::path(post, path = "/api/v1/companies", tag = "companies",
    request_body = CompanyRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Company created", body = Company),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Admin only")))]
async fn create_company_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<CompanyRequest>,
) -> Result<Json<Envelope<Company>>, ApiError> {
    require_admin(&state, &headers)?;
    let company = service::create_company(
        &state.storage,
        &payload.name,
        &payload.position,
        &payload.jd,
        &payload.location,
        &payload.tel,
        &payload.image,
    )?;
    Ok(one(company))
}

#[utoipa::path(put, path = "/api/v1/companies/{id}", tag = "companies",
    params(("id" = String, Path, description = "Company id")),
    request_body = CompanyRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated company", body = Company),
        (status = 401, description = "Admin only"),
        (status = 404, description = "No such company")))]
async fn update_company_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<CompanyRequest>,
) -> Result<Json<Envelope<Company>>, ApiError> {
    require_admin(&state, &headers)?;
    let company = service::update_company(
        &state.storage,
        &id,
        Company {
            id: id.clone(),
            name: payload.name,
            position: payload.position,
            jd: payload.jd,
            location: payload.location,
            tel: payload.tel,
            image: payload.image,
        },
    )?;
    Ok(one(company))
}

#[utoipa::path(delete, path = "/api/v1/companies/{id}", tag = "companies",
    params(("id" = String, Path, description = "Company id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Company and its bookings deleted"),
        (status = 401, description = "Admin only"),
        (status = 404, description = "No such company")))]
async fn delete_company_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    require_admin(&state, &headers)?;
    service::delete_company(&state.storage, &id)?;
    Ok(one(json!({})))
}

/// Health check handler
async fn health_handler() -> Json<Envelope<serde_json::Value>> {
    one(json!({ "status": "ok" }))
}
