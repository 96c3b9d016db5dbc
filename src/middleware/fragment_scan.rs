//! Thin route-layer adapter over the detection facade. Adds no behavior of
//! its own: scans the URL strings a request explicitly supplies, records the
//! verdict, and passes the request through untouched.

use axum::{extract::Request, middleware::Next, response::Response};

use crate::interceptor::detect;

/// Verdict stored in request extensions for downstream handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentVerdict(pub bool);

/// Runs the detector over the request URI and over any `url` query
/// parameter (redirect and share endpoints receive attacker-crafted URLs
/// there; ordinary navigation never carries a fragment to the server).
pub async fn scan_request(mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let mut detected = detect::detect(&req.uri().to_string(), Some(&path));

    if let Some(query) = req.uri().query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key == "url" && detect::detect(&value, Some(&path)) {
                detected = true;
            }
        }
    }

    req.extensions_mut().insert(FragmentVerdict(detected));
    next.run(req).await
}
