use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::llm::gemini::GeminiClient;
use crate::llm::orchestrator::{GenerationError, Orchestrator};
use crate::locales::{self, Language};
use crate::utils::timing::log_generation_timing;
use crate::watermark;

const MISSING_PARAMETERS: &str = "Missing required parameters.";
const UNSUPPORTED_LANGUAGE: &str = "Unsupported language tag.";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator<GeminiClient>>,
    pub model: String,
    pub watermark_enabled: bool,
}

pub fn router(state: AppState) -> Router {
    // Non-POST on /api/generate gets 405 from the method router.
    Router::new()
        .route("/api/generate", post(generate_handler))
        .route("/api/locales/{lang}", get(locale_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

#[derive(Debug, PartialEq, Eq)]
struct GenerateParams {
    character_image: String,
    prop_image: String,
    background_image: String,
    lang: Language,
    camera_angle: String,
}

fn required_field(body: &Value, name: &str) -> Result<String, &'static str> {
    body.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|value| !value.trim().is_empty())
        .ok_or(MISSING_PARAMETERS)
}

fn parse_generate_request(body: &Value) -> Result<GenerateParams, &'static str> {
    let lang_tag = required_field(body, "lang")?;
    let lang = Language::from_tag(&lang_tag).ok_or(UNSUPPORTED_LANGUAGE)?;
    Ok(GenerateParams {
        character_image: required_field(body, "characterImageDataUrl")?,
        prop_image: required_field(body, "propImageDataUrl")?,
        background_image: required_field(body, "backgroundImageDataUrl")?,
        lang,
        camera_angle: required_field(body, "cameraAngleText")?,
    })
}

fn status_for_error(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::InvalidDataUrl(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn generate_handler(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let params = match parse_generate_request(&body) {
        Ok(params) => params,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    info!(
        "Generation request: lang={} camera_angle={}",
        params.lang.as_tag(),
        params.camera_angle
    );

    let result = log_generation_timing("gemini", &state.model, "generate_fused_image", || {
        state.orchestrator.generate_fused_image(
            &params.character_image,
            &params.prop_image,
            &params.background_image,
            params.lang,
            &params.camera_angle,
        )
    })
    .await;

    let image_url = match result {
        Ok(image_url) => image_url,
        Err(err) => {
            warn!("Image generation failed: {err}");
            return error_response(status_for_error(&err), &err.to_string());
        }
    };

    let image_url = if state.watermark_enabled {
        let lang = params.lang;
        let watermarked =
            tokio::task::spawn_blocking(move || watermark::apply_watermark(&image_url, lang)).await;
        match watermarked {
            Ok(Ok(url)) => url,
            Ok(Err(err)) => {
                warn!("Watermarking failed: {err:#}");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
            }
            Err(err) => {
                warn!("Watermark task panicked: {err}");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Watermarking failed.");
            }
        }
    } else {
        image_url
    };

    (StatusCode::OK, Json(json!({ "imageUrl": image_url }))).into_response()
}

async fn locale_handler(Path(lang): Path<String>) -> Response {
    match Language::from_tag(&lang) {
        Some(lang) => (StatusCode::OK, Json(locales::ui_strings(lang))).into_response(),
        None => error_response(StatusCode::NOT_FOUND, UNSUPPORTED_LANGUAGE),
    }
}
