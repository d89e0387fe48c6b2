//! Defines the gateway's HTTP surface.
//!
//! ## Structure
//! - `GET /list` — bucket listing, JSON or HTML by `Accept` (only when enabled)
//! - `GET /{*path}` — resolve `path` to a key and redirect to (or stream) it
//!
//! Every other method is answered with 405 by the `get_only` layer, except CORS
//! preflights which the CORS layer answers first. Requests are cut off after
//! `REQUEST_TIMEOUT`; dropping the handler future aborts any storage call still
//! in flight. A panicking handler becomes a 500. Every response carries the
//! usual browser hardening headers.

use crate::{
    handlers::{
        middleware::{access_log, get_only},
        object_handlers::{list_objects, proxy_object},
    },
    state::AppState,
};
use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    routing::get,
};
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the router with its layers; `client_ip_header` feeds the access log.
pub fn routes(state: AppState, enable_list: bool, client_ip_header: &'static str) -> Router {
    let mut router = Router::new();
    if enable_list {
        router = router.route("/list", get(list_objects));
    }

    router
        .route("/", get(proxy_object))
        .route("/{*path}", get(proxy_object))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(middleware::from_fn(get_only))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(middleware::from_fn_with_state(client_ip_header, access_log))
        .with_state(state)
}
