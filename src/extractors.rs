use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Client address reported by the fronting proxy
///
/// Takes the first entry of `X-Forwarded-For`, which is the original client
/// when the header lists a proxy chain. Returns None if the header is absent,
/// empty or not valid text.
#[derive(Debug)]
pub struct ForwardedFor(pub Option<String>);

impl ForwardedFor {
    fn parse(value: &str) -> Option<String> {
        value
            .split(',')
            .next()
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
    }
}

impl<S> FromRequestParts<S> for ForwardedFor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let addr = parts
            .headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse);

        Ok(ForwardedFor(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Option<String> {
        let mut builder = Request::builder().uri("/api/coach");
        if let Some(value) = header {
            builder = builder.header(FORWARDED_FOR_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        let ForwardedFor(addr) = ForwardedFor::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        addr
    }

    #[tokio::test]
    async fn test_single_address() {
        assert_eq!(extract(Some("203.0.113.7")).await.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_proxy_chain_takes_client() {
        assert_eq!(
            extract(Some("203.0.113.7, 10.0.0.2, 10.0.0.3")).await.as_deref(),
            Some("203.0.113.7")
        );
    }

    #[tokio::test]
    async fn test_missing_or_blank_header() {
        assert_eq!(extract(None).await, None);
        assert_eq!(extract(Some("  ")).await, None);
    }
}
