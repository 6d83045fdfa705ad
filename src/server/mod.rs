pub mod handlers;

use crate::{config::Config, dispatcher::Dispatcher, error::PanelError};
use actix_web::{http::StatusCode, web, App, HttpResponse, HttpServer, ResponseError};
use serde_json::json;

/// Shared by every worker; the dispatcher itself holds no per-request state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    /// Whether `/api/dispatch` may name image files on the server's disk.
    pub allow_path_inputs: bool,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            allow_path_inputs: false,
        }
    }

    pub fn with_path_inputs(mut self, allowed: bool) -> Self {
        self.allow_path_inputs = allowed;
        self
    }
}

impl ResponseError for PanelError {
    fn status_code(&self) -> StatusCode {
        match self {
            PanelError::ValidationError(_) => StatusCode::BAD_REQUEST,
            PanelError::Forbidden(_) => StatusCode::FORBIDDEN,
            PanelError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Malformed or oversized bodies answer with the same `{ "error": ... }` shape
/// as every other failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(handlers::MAX_BODY_BYTES)
        .error_handler(|err, _req| {
            log::warn!("⚠️  Rejected request body: {}", err);
            PanelError::ValidationError(err.to_string()).into()
        })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/", web::get().to(handlers::index))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/aspect-ratios", web::get().to(handlers::aspect_ratios))
                .route("/vlm-modes", web::get().to(handlers::vlm_modes))
                .route("/generate", web::post().to(handlers::generate))
                .route("/refine", web::post().to(handlers::refine))
                .route("/inspire", web::post().to(handlers::inspire))
                .route("/dispatch", web::post().to(handlers::dispatch)),
        );
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let state = web::Data::new(
        AppState::new(Dispatcher::new(&config.generator))
            .with_path_inputs(config.server.allow_path_inputs),
    );
    let bind = config.server.bind_address();

    if config.server.share {
        log::warn!("⚠️  GRADIO_SHARE is enabled but public share links are not supported; serving on {} only", bind);
    }
    if config.server.allow_path_inputs {
        log::warn!("⚠️  FIBO_ALLOW_PATH_INPUTS is enabled: /api/dispatch clients can point the generator at any file on this host");
    }

    log::info!("🌐 Listening on http://{}", bind);
    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await
}
