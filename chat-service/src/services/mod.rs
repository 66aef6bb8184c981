pub mod chat;
pub mod metrics;
pub mod responder;
pub mod store;

pub use chat::{ChatService, ChatTurn, FALLBACK_REPLY};
pub use metrics::{get_metrics, init_metrics};
pub use responder::{GeneratorError, IntentResponder, PatternResponder, ResponseGenerator};
pub use store::{ConversationStore, MemoryStore, PostgresStore};
