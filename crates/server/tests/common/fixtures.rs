//! Test fixtures.

use axum::body::Body;
use axum::http::Request;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Deterministic pseudo-random content.
#[allow(dead_code)]
pub fn blob_data(len: usize, seed: u8) -> Vec<u8> {
    let mut state = u32::from(seed).wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

/// A hash-like blob name starting with `prefix`.
#[allow(dead_code)]
pub fn blob_name(prefix: &str) -> String {
    format!("{prefix}{}", "0123456789abcdef".repeat(4))[..64].to_string()
}

/// Build a request with an optional body.
#[allow(dead_code)]
pub fn request(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap()
}

/// `Authorization` header value for Basic credentials.
#[allow(dead_code)]
pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}
