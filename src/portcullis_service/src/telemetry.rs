use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use tracing::{Level, Span};

pub fn make_span_with_request_id(request: &Request<Body>) -> Span {
    let request_id = uuid::Uuid::new_v4();
    tracing::span!(
        Level::INFO,
        "request",
        id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
    )
}

pub fn on_request(_request: &Request<Body>, _span: &Span) {
    tracing::event!(Level::INFO, "started processing request");
}

pub fn on_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    tracing::event!(
        Level::INFO,
        status = response.status().as_u16(),
        latency = ?latency,
        "finished processing request"
    );
}
