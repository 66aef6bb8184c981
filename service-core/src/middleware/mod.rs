pub mod cors;
pub mod metrics;
pub mod security_headers;
pub mod tracing;

pub use cors::CorsPolicy;
pub use metrics::metrics_middleware;
pub use security_headers::security_headers_middleware;
pub use tracing::{REQUEST_ID_HEADER, RequestId, make_request_span, request_id_middleware};
