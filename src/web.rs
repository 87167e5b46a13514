//! HTTP surface: source index, feed documents and refresh status.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::{Authorization, HeaderMapExt};
use html_escape::{encode_double_quoted_attribute, encode_text};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::app::AppContext;
use crate::refresh::SourceStatus;
use crate::render;

pub fn router(ctx: Arc<AppContext>) -> Router {
    let protected = Router::new()
        .route("/feed/{slug}", get(feed))
        .route("/status", get(status))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_auth));

    Router::new()
        .route("/", get(index))
        .merge(protected)
        .with_state(ctx)
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn serve(ctx: Arc<AppContext>, listener: TcpListener) -> std::io::Result<()> {
    info!("Server running on http://{}", listener.local_addr()?);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn index(State(ctx): State<Arc<AppContext>>) -> Html<String> {
    let mut body = String::from(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>rsslite</title></head>\n<body>\n<h1>Feeds</h1>\n<ul>\n",
    );
    for source in &ctx.config.sources {
        body.push_str(&format!(
            "<li><a href=\"/feed/{}\">{}</a> (<a href=\"{}\">source</a>)</li>\n",
            source.slug,
            encode_text(&source.name),
            encode_double_quoted_attribute(&source.url),
        ));
    }
    body.push_str("</ul>\n</body>\n</html>\n");
    Html(body)
}

async fn feed(State(ctx): State<Arc<AppContext>>, Path(slug): Path<String>) -> Response {
    match ctx.gateway.render(&slug).await {
        Ok(Some(bytes)) => (
            [(header::CONTENT_TYPE, render::CONTENT_TYPE)],
            bytes.to_vec(),
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "feed not found").into_response(),
        Err(e) => {
            error!(slug = %slug, error = %e, "Failed to render feed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render feed").into_response()
        }
    }
}

async fn status(State(ctx): State<Arc<AppContext>>) -> Json<Vec<SourceStatus>> {
    Json(ctx.coordinator.status())
}

/// Basic auth gate, active only when credentials are configured.
async fn require_auth(State(ctx): State<Arc<AppContext>>, request: Request, next: Next) -> Response {
    let Some((username, password)) = ctx.config.credentials() else {
        return next.run(request).await;
    };

    let authorized = request
        .headers()
        .typed_get::<Authorization<Basic>>()
        .is_some_and(|auth| {
            // Evaluate both so timing does not reveal which one differs.
            let user_ok = constant_time_eq(auth.username(), username);
            let pass_ok = constant_time_eq(auth.password(), password);
            user_ok & pass_ok
        });

    if authorized {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Basic realm=\"rsslite\"")],
        )
            .into_response()
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
            }
            Err(e) => {
                error!("Failed to set up SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutting down");
}
