//! Cross-cutting response decoration.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

use super::types::CONTRACT_VERSION;

/// Header carrying the wire-schema version on every response.
pub const CONTRACT_HEADER: &str = "x-tokenlens-contract";

/// Append the contract version header so clients can detect schema drift
/// without parsing a body.
pub async fn add_contract_version(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(CONTRACT_HEADER, HeaderValue::from_static(CONTRACT_VERSION));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn every_response_carries_the_contract_header() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(axum::middleware::from_fn(add_contract_version));

        let req = HttpRequest::get("/test").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(
            resp.headers().get(CONTRACT_HEADER).unwrap(),
            CONTRACT_VERSION
        );
    }
}
