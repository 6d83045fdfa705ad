use super::AppState;
use crate::{
    dispatcher::temp,
    error::{PanelError, Result},
    models::{
        DispatchOutcome, GenerateRequest, InspireRequest, RefineRequest, Request, Response,
        ASPECT_RATIOS, DEFAULT_ASPECT_RATIO, DEFAULT_VLM_MODE, VLM_MODES,
    },
};
use actix_web::{web, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Uploaded images arrive base64-encoded inside the JSON body.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("static/index.html");

#[derive(Debug, Deserialize)]
pub struct RefineBody {
    #[serde(flatten)]
    pub request: RefineRequest,
    pub source_image_base64: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InspireBody {
    #[serde(flatten)]
    pub request: InspireRequest,
    pub reference_image_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub request_id: String,
    /// Only set by `/api/dispatch`; the scripted caller then owns the file.
    pub image_path: Option<PathBuf>,
    /// PNG bytes of `image_path`, base64 encoded, for display in the browser.
    pub image_data: Option<String>,
    pub status: String,
    pub structured_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub request_id: String,
    pub status: String,
    pub structured_prompt: String,
}

fn decode_upload(raw: &str) -> Result<Vec<u8>> {
    // Browsers hand us data URLs; the payload follows the first comma.
    let payload = match raw.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => raw,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| PanelError::ValidationError(format!("invalid base64 image: {}", e)))
}

/// Writes an upload to a temp file owned by the caller. Empty uploads are
/// treated as absent.
fn stage_upload(raw: Option<&str>, dir: Option<&Path>) -> Result<Option<NamedTempFile>> {
    match raw.filter(|r| !r.trim().is_empty()) {
        Some(raw) => {
            let bytes = decode_upload(raw)?;
            Ok(Some(temp::write_upload(dir, &bytes)?))
        }
        None => Ok(None),
    }
}

/// Whether the generated PNG outlives the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageOwner {
    /// Browser endpoints: the image travels inline and is deleted afterwards.
    Inline,
    /// `/api/dispatch`: the caller receives the path and must remove it.
    Caller,
}

async fn image_response(
    request_id: String,
    outcome: DispatchOutcome,
    owner: ImageOwner,
) -> ImageResponse {
    let image_data = match &outcome.image_path {
        Some(path) => match tokio::fs::read(path).await {
            Ok(bytes) if !bytes.is_empty() => Some(STANDARD.encode(bytes)),
            Ok(_) => None,
            Err(e) => {
                log::warn!("⚠️  Could not read {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    let image_path = match (owner, outcome.image_path) {
        (ImageOwner::Caller, path) => path,
        (ImageOwner::Inline, Some(path)) => {
            temp::discard(&path);
            None
        }
        (ImageOwner::Inline, None) => None,
    };

    ImageResponse {
        request_id,
        image_path,
        image_data,
        status: outcome.status,
        structured_prompt: outcome.structured_prompt,
    }
}

/// Browser endpoints only read images the client uploaded; a raw path in the
/// body is dropped.
fn ignore_client_path(request_id: &str, field: &str, path: &mut Option<PathBuf>) {
    if let Some(path) = path.take() {
        log::warn!(
            "⚠️  [req:{}] ignoring {} path {} from browser request",
            request_id,
            field,
            path.display()
        );
    }
}

/// `/api/dispatch` may only name server-side files when explicitly allowed.
fn check_path_inputs(state: &AppState, request: &Request) -> Result<()> {
    let named_path = match request {
        Request::Generate(_) => None,
        Request::Refine(req) => req.source_image.as_deref(),
        Request::Inspire(req) => req.reference_image.as_deref(),
    };
    match named_path {
        Some(path) if !state.allow_path_inputs => Err(PanelError::Forbidden(format!(
            "image path {} rejected; set FIBO_ALLOW_PATH_INPUTS=true to allow server-side paths",
            path.display()
        ))),
        _ => Ok(()),
    }
}

fn new_request_id(mode: &str) -> String {
    let id = Uuid::new_v4().to_string();
    log::info!("📥 [req:{}] {} request received", id, mode);
    id
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn aspect_ratios() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "default": DEFAULT_ASPECT_RATIO,
        "ratios": ASPECT_RATIOS,
    }))
}

pub async fn vlm_modes() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "default": DEFAULT_VLM_MODE,
        "modes": VLM_MODES,
    }))
}

pub async fn generate(
    state: web::Data<AppState>,
    body: web::Json<GenerateRequest>,
) -> HttpResponse {
    let request_id = new_request_id("generate");
    let outcome = state.dispatcher.generate(&body).await;
    HttpResponse::Ok().json(image_response(request_id, outcome, ImageOwner::Inline).await)
}

pub async fn refine(
    state: web::Data<AppState>,
    body: web::Json<RefineBody>,
) -> Result<HttpResponse> {
    let request_id = new_request_id("refine");
    let RefineBody {
        mut request,
        source_image_base64,
    } = body.into_inner();

    ignore_client_path(&request_id, "source_image", &mut request.source_image);
    let upload = stage_upload(source_image_base64.as_deref(), state.dispatcher.temp_dir())?;
    request.source_image = upload.as_ref().map(|file| file.path().to_path_buf());

    let outcome = state.dispatcher.refine(&request).await;
    drop(upload);
    Ok(HttpResponse::Ok().json(image_response(request_id, outcome, ImageOwner::Inline).await))
}

pub async fn inspire(
    state: web::Data<AppState>,
    body: web::Json<InspireBody>,
) -> Result<HttpResponse> {
    let request_id = new_request_id("inspire");
    let InspireBody {
        mut request,
        reference_image_base64,
    } = body.into_inner();

    ignore_client_path(&request_id, "reference_image", &mut request.reference_image);
    let upload = stage_upload(reference_image_base64.as_deref(), state.dispatcher.temp_dir())?;
    request.reference_image = upload.as_ref().map(|file| file.path().to_path_buf());

    let outcome = state.dispatcher.inspire(&request).await;
    drop(upload);
    Ok(HttpResponse::Ok().json(PromptResponse {
        request_id,
        status: outcome.status,
        structured_prompt: outcome.structured_prompt,
    }))
}

/// Mode-tagged entry point for scripted clients; paths only, no uploads.
/// Generated images stay on disk and `image_path` hands them to the caller.
pub async fn dispatch(
    state: web::Data<AppState>,
    body: web::Json<Request>,
) -> Result<HttpResponse> {
    let request_id = new_request_id(body.mode().as_str());
    check_path_inputs(&state, &body)?;

    let response = match state.dispatcher.dispatch(&body).await {
        Response::Image(outcome) => HttpResponse::Ok()
            .json(image_response(request_id, outcome, ImageOwner::Caller).await),
        Response::Prompt(outcome) => HttpResponse::Ok().json(PromptResponse {
            request_id,
            status: outcome.status,
            structured_prompt: outcome.structured_prompt,
        }),
    };
    Ok(response)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::dispatcher::{extract, CommandRunner, Dispatcher, RunOutput};
    use actix_web::{test as web_test, App};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    /// Writes a tiny image plus sidecar like the real generator would.
    struct CannedRunner {
        seen: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl CommandRunner for CannedRunner {
        async fn run(&self, args: &[String]) -> Result<RunOutput> {
            self.seen.lock().unwrap().push(args.to_vec());
            let pos = args.iter().position(|a| a == "--output").unwrap();
            let output = Path::new(&args[pos + 1]);
            std::fs::write(output, b"\x89PNG").unwrap();
            std::fs::write(extract::sidecar_path(output), "{\"subject\": \"lake\"}").unwrap();
            Ok(RunOutput {
                exit_code: Some(0),
                stdout: "done".to_string(),
                stderr: String::new(),
            })
        }
    }

    fn state(dir: &Path, runner: Arc<CannedRunner>) -> web::Data<AppState> {
        let config = GeneratorConfig::new().with_temp_dir(dir);
        web::Data::new(AppState::new(Dispatcher::with_runner(&config, runner)))
    }

    fn files_in(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    fn runner() -> Arc<CannedRunner> {
        Arc::new(CannedRunner {
            seen: Mutex::new(Vec::new()),
        })
    }

    #[actix_web::test]
    async fn test_health_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let app = web_test::init_service(
            App::new()
                .app_data(state(dir.path(), runner()))
                .configure(crate::server::configure),
        )
        .await;

        let req = web_test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = web_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");

        let req = web_test::TestRequest::get().uri("/api/aspect-ratios").to_request();
        let body: Value = web_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ratios"].as_array().unwrap().len(), 9);
        assert_eq!(body["ratios"][8]["label"], "16:9");
        assert_eq!(body["ratios"][8]["width"], 1344);

        let req = web_test::TestRequest::get().uri("/").to_request();
        let resp = web_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_generate_returns_image_and_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let app = web_test::init_service(
            App::new()
                .app_data(state(dir.path(), runner()))
                .configure(crate::server::configure),
        )
        .await;

        let req = web_test::TestRequest::post()
            .uri("/api/generate")
            .set_json(json!({ "prompt": "a lake", "seed": 1, "aspect_ratio": "1:1" }))
            .to_request();
        let body: Value = web_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["structured_prompt"], "{\"subject\": \"lake\"}");
        assert_eq!(body["image_data"], STANDARD.encode(b"\x89PNG"));
        assert!(body["status"].as_str().unwrap().starts_with("✅"));
        assert!(body["request_id"].as_str().is_some());
        assert!(body["image_path"].is_null());
        assert_eq!(files_in(dir.path()), 0);
    }

    #[actix_web::test]
    async fn test_browser_requests_leave_no_images_behind() {
        let dir = tempfile::tempdir().unwrap();
        let app = web_test::init_service(
            App::new()
                .app_data(state(dir.path(), runner()))
                .configure(crate::server::configure),
        )
        .await;

        for _ in 0..5 {
            let req = web_test::TestRequest::post()
                .uri("/api/generate")
                .set_json(json!({ "prompt": "a lake" }))
                .to_request();
            let body: Value = web_test::call_and_read_body_json(&app, req).await;
            assert!(body["image_data"].is_string());
        }

        let upload = STANDARD.encode(b"\x89PNG");
        let req = web_test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({
                "source_image_base64": upload,
                "structured_prompt": "{\"subject\": \"lake\"}",
                "prompt": "at night",
            }))
            .to_request();
        let body: Value = web_test::call_and_read_body_json(&app, req).await;
        assert!(body["image_data"].is_string());

        assert_eq!(files_in(dir.path()), 0);
    }

    #[actix_web::test]
    async fn test_browser_refine_ignores_client_paths() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner();
        let app = web_test::init_service(
            App::new()
                .app_data(state(dir.path(), runner.clone()))
                .configure(crate::server::configure),
        )
        .await;

        let req = web_test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({ "source_image": "/etc/hostname", "prompt": "brighter" }))
            .to_request();
        let resp = web_test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        let seen = runner.seen.lock().unwrap();
        assert!(!seen[0].iter().any(|a| a == "--image-path"));
    }

    #[actix_web::test]
    async fn test_malformed_body_gets_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner();
        let app = web_test::init_service(
            App::new()
                .app_data(state(dir.path(), runner.clone()))
                .configure(crate::server::configure),
        )
        .await;

        let req = web_test::TestRequest::post()
            .uri("/api/generate")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"prompt\": ")
            .to_request();
        let resp = web_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let body: Value = web_test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("Validation error"));
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_dispatch_path_inputs_need_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.png");
        std::fs::write(&source, b"\x89PNG").unwrap();
        let request = json!({ "mode": "refine", "source_image": source, "prompt": "warmer" });

        let runner = runner();
        let app = web_test::init_service(
            App::new()
                .app_data(state(dir.path(), runner.clone()))
                .configure(crate::server::configure),
        )
        .await;
        let req = web_test::TestRequest::post()
            .uri("/api/dispatch")
            .set_json(&request)
            .to_request();
        let resp = web_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FORBIDDEN);
        assert!(runner.seen.lock().unwrap().is_empty());

        let config = GeneratorConfig::new().with_temp_dir(dir.path());
        let allowed = web::Data::new(
            AppState::new(Dispatcher::with_runner(&config, runner.clone())).with_path_inputs(true),
        );
        let app = web_test::init_service(
            App::new()
                .app_data(allowed)
                .configure(crate::server::configure),
        )
        .await;
        let req = web_test::TestRequest::post()
            .uri("/api/dispatch")
            .set_json(&request)
            .to_request();
        let body: Value = web_test::call_and_read_body_json(&app, req).await;

        // Scripted callers keep the generated file.
        let image = PathBuf::from(body["image_path"].as_str().unwrap());
        assert!(image.exists());
        assert!(source.exists());
        assert!(runner.seen.lock().unwrap()[0].iter().any(|a| a == "--image-path"));
    }

    #[actix_web::test]
    async fn test_inspire_upload_is_cleaned_up() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner();
        let app = web_test::init_service(
            App::new()
                .app_data(state(dir.path(), runner.clone()))
                .configure(crate::server::configure),
        )
        .await;

        let upload = format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG"));
        let req = web_test::TestRequest::post()
            .uri("/api/inspire")
            .set_json(json!({ "reference_image_base64": upload }))
            .to_request();
        let body: Value = web_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["structured_prompt"], "{\"subject\": \"lake\"}");
        assert_eq!(runner.seen.lock().unwrap().len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[actix_web::test]
    async fn test_bad_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner();
        let app = web_test::init_service(
            App::new()
                .app_data(state(dir.path(), runner.clone()))
                .configure(crate::server::configure),
        )
        .await;

        let req = web_test::TestRequest::post()
            .uri("/api/refine")
            .set_json(json!({ "source_image_base64": "%%% not base64 %%%" }))
            .to_request();
        let resp = web_test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
        assert!(runner.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_decode_upload_accepts_plain_and_data_urls() {
        let encoded = STANDARD.encode(b"abc");
        assert_eq!(decode_upload(&encoded).unwrap(), b"abc");
        assert_eq!(
            decode_upload(&format!("data:image/png;base64,{}", encoded)).unwrap(),
            b"abc"
        );
    }
}
