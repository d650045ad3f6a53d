//! quill-api - HTTP API server for quill

mod handlers;
mod services;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use quill_db::{Database, FilesystemBackend};
use services::{LogMailer, Mailer};

use handlers::{
    accounts::{email_captcha, login, register, reset_password},
    brainstorm::{load_brainstorm, save_brainstorm, set_brainstorm_progress},
    dashboard::dashboard_phases,
    documents::{
        create_document, delete_document, delete_document_version, download_document_version,
        list_documents, upload_document_version,
    },
    outline::{delete_section, get_outline, get_section, save_outline, update_section},
    planning::{delete_phase, get_planning, save_planning, toggle_task},
    references::{
        cite_reference, create_reference, delete_reference, list_references, update_reference,
        upload_bibtex,
    },
    settings::{change_password, get_settings, update_profile, update_settings},
    tags::{
        assign_tag, create_tag, delete_tag, list_tags, mark_reference_complete,
        references_with_tags, remove_tag, rename_tag, tag_stats,
    },
};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs, so request ids in
/// logs sort chronologically.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// AUTH
// =============================================================================

/// HS256 signing material, derived from `JWT_SECRET` at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    /// Issue a bearer token for the user.
    pub fn issue(&self, user_id: Uuid) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (chrono::Utc::now().timestamp() + self.ttl_secs) as usize,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Token signing failed: {}", e)))
    }

    fn verify(&self, token: &str) -> Result<Uuid, ApiError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;
        data.claims
            .sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// The authenticated account, extracted from the `Authorization` header.
/// Every owner-scoped handler takes this as its first argument.
pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))?;
        let user_id = state.jwt.verify(token)?;
        Ok(AuthUser(user_id))
    }
}

// =============================================================================
// APP STATE & ERRORS
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtKeys,
    /// Mail delivery seam; the default implementation logs instead of
    /// speaking SMTP.
    pub mailer: Arc<dyn Mailer>,
}

pub enum ApiError {
    Database(quill_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<quill_core::Error> for ApiError {
    fn from(err: quill_core::Error) -> Self {
        match &err {
            quill_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            quill_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            quill_core::Error::Conflict(msg) => ApiError::Conflict(msg.clone()),
            quill_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            quill_core::Error::Database(sqlx_err) => {
                let msg = sqlx_err.to_string();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    return ApiError::Conflict(msg);
                }
                ApiError::Database(err)
            }
            _ => ApiError::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Database(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// STARTUP
// =============================================================================

fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins_str =
        std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string());

    origins_str
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "quill_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quill_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("quill-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    // Get configuration from environment
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/quill".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);
    let jwt_secret = std::env::var("JWT_SECRET")
        .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
    let jwt_ttl_secs: i64 = std::env::var("JWT_TTL_SECS")
        .unwrap_or_else(|_| "86400".to_string())
        .parse()
        .unwrap_or(86400);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    // Run pending database migrations on startup
    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    // Initialize document blob storage
    let storage_path =
        std::env::var("FILE_STORAGE_PATH").unwrap_or_else(|_| "/var/lib/quill/files".to_string());
    let backend = FilesystemBackend::new(&storage_path);
    backend
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("Storage validation failed: {}", e))?;
    let db = db.with_storage(&storage_path);
    info!("Document storage initialized at {}", storage_path);

    let state = AppState {
        db,
        jwt: JwtKeys::new(jwt_secret.as_bytes(), jwt_ttl_secs),
        mailer: Arc::new(LogMailer),
    };

    let app = Router::new()
        .route("/health", get(health))
        // Accounts
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/captcha/email", post(email_captcha))
        .route("/password/reset", post(reset_password))
        // Outline
        .route("/outline/get", get(get_outline))
        .route("/outline/get/:id", get(get_section))
        .route("/outline/save", post(save_outline))
        .route("/update/:id", put(update_section))
        .route("/delete/:id", delete(delete_section))
        // Planning
        .route("/planning/", get(get_planning).post(save_planning))
        .route("/planning/:phase_id", delete(delete_phase))
        .route("/planning/:phase_id/tasks/:task_id", patch(toggle_task))
        // Dashboard
        .route("/dashboard/phases", get(dashboard_phases))
        // Brainstorming
        .route("/brainstorm/load", get(load_brainstorm))
        .route("/brainstorm/save", post(save_brainstorm))
        .route("/brainstorm/progress", post(set_brainstorm_progress))
        // References
        .route("/references/", post(create_reference).get(list_references))
        .route(
            "/references/:id",
            put(update_reference).delete(delete_reference),
        )
        .route("/references/upload_bib", post(upload_bibtex))
        .route("/references/:id/cite", get(cite_reference))
        // Tags
        .route("/tags/", post(create_tag))
        .route("/tags/list", get(list_tags))
        .route("/tags/stats", get(tag_stats))
        .route("/tags/assign", post(assign_tag))
        .route("/tags/all-docs-with-tags", get(references_with_tags))
        .route("/tags/remove", post(remove_tag))
        .route("/tags/mark-complete", post(mark_reference_complete))
        .route("/tags/update/:id", put(rename_tag))
        .route("/tags/delete/:id", delete(delete_tag))
        // Cloud documents
        .route(
            "/writing_tool/documents",
            post(create_document).get(list_documents),
        )
        .route("/writing_tool/documents/:id", delete(delete_document))
        .route(
            "/writing_tool/documents/:id/versions",
            post(upload_document_version),
        )
        .route(
            "/writing_tool/documents/:id/versions/:label/download",
            get(download_document_version),
        )
        .route(
            "/writing_tool/documents/:id/versions/:label",
            delete(delete_document_version),
        )
        // Settings
        .route("/settings/", get(get_settings).put(update_settings))
        .route("/settings/profile", put(update_profile))
        .route("/settings/change-password", post(change_password))
        // Stored version blobs
        .nest_service("/files", ServeDir::new(&storage_path))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer({
            let allowed_origins = parse_allowed_origins();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        })
        // Document uploads cap out well under this
        .layer(RequestBodyLimitLayer::new(50 * 1024 * 1024)) // 50 MB
        .with_state(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
