pub mod chat;
pub mod health;

pub use chat::{create_session, get_messages, send_message, session_exists};
pub use health::{health_check, metrics_endpoint, not_found, readiness_check, root, status};
