use std::{sync::Arc, time::Instant};

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use codeshot_api_types::{IMAGE_CONTENT_TYPE, RenderFailure, RenderRequest};
use metrics::{counter, histogram};
use tracing::{error, warn};

use crate::{
    application::render::{RenderError, RenderService, RenderedImage},
    presentation::views::{IndexContext, IndexTemplate, PageMetaView, render_template_response},
};

use super::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub renderer: Arc<dyn RenderService>,
    pub max_request_bytes: usize,
}

pub fn build_router(state: HttpState) -> Router {
    let max_request_bytes = state.max_request_bytes;

    Router::new()
        .route("/", get(index))
        .route("/code/", post(render_code))
        .route("/_health", get(health))
        .route("/assets/{*path}", get(crate::infra::assets::serve_assets))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index() -> Response {
    let view = IndexContext {
        meta: PageMetaView::index(),
    };
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Render the posted code to a PNG.
///
/// Failures are reported in-band: HTTP 200 with an `application/json` body
/// carrying `{"reason"}`. Success is HTTP 200 with `image/png;base64` and the
/// raw PNG bytes; clients dispatch on the content type.
async fn render_code(State(state): State<HttpState>, body: Bytes) -> Response {
    counter!("codeshot_render_total").increment(1);

    let request: RenderRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => {
            counter!("codeshot_render_failure_total").increment(1);
            return failure_response("Json content not found".to_string());
        }
    };

    let renderer = state.renderer.clone();
    let started = Instant::now();
    let rendered = tokio::task::spawn_blocking(move || renderer.render(&request)).await;
    histogram!("codeshot_render_ms").record(started.elapsed().as_millis() as f64);

    match rendered {
        Ok(Ok(image)) => image_response(image),
        Ok(Err(render_error)) => {
            counter!("codeshot_render_failure_total").increment(1);
            warn!(
                target = "codeshot::http::render",
                error = %render_error,
                "render request failed"
            );
            failure_response(failure_reason(&render_error))
        }
        Err(join_error) => {
            counter!("codeshot_render_failure_total").increment(1);
            error!(
                target = "codeshot::http::render",
                error = %join_error,
                "render task aborted"
            );
            failure_response("Error when generating the image: render task aborted".to_string())
        }
    }
}

fn failure_reason(error: &RenderError) -> String {
    match error {
        RenderError::Args { message } => format!("Error during json parsing: {message}"),
        _ => format!("Error when generating the image: {error}"),
    }
}

fn failure_response(reason: String) -> Response {
    (StatusCode::OK, Json(RenderFailure { reason })).into_response()
}

fn image_response(image: RenderedImage) -> Response {
    let len = image.png.len();
    let mut response = Response::new(Body::from(image.png));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(IMAGE_CONTENT_TYPE));
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }

    response
}
