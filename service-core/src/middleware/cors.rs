//! Browser origin policy.
//!
//! Origins are accepted when they match the exact allow list, or when they are
//! `https` origins whose host ends in one of the configured suffixes (preview
//! deployments such as `*.vercel.app`). Development mode accepts any origin.

use axum::http::{HeaderName, HeaderValue, Method, header, request::Parts};
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    pub allow_any: bool,
    pub origins: Vec<String>,
    pub origin_suffixes: Vec<String>,
}

impl CorsPolicy {
    pub fn allows(&self, origin: &str) -> bool {
        if self.allow_any {
            return true;
        }

        if self.origins.iter().any(|o| o == origin) {
            return true;
        }

        let Some(host) = origin.strip_prefix("https://") else {
            return false;
        };
        // Ports and paths never appear in a suffix match.
        if host.contains('/') || host.contains(':') {
            return false;
        }
        self.origin_suffixes
            .iter()
            .any(|suffix| host.ends_with(suffix.as_str()) && host.len() > suffix.len())
    }

    /// Builds the tower-http layer. `extra_headers` are request headers the
    /// browser may send on top of `content-type` and `authorization`.
    pub fn into_layer(self, extra_headers: &[&'static str]) -> CorsLayer {
        let mut allowed_headers = vec![header::CONTENT_TYPE, header::AUTHORIZATION];
        allowed_headers.extend(extra_headers.iter().copied().map(HeaderName::from_static));

        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &Parts| {
                    origin
                        .to_str()
                        .map(|o| self.allows(o))
                        .unwrap_or(false)
                },
            ))
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
                Method::HEAD,
            ])
            .allow_headers(allowed_headers)
    }
}
