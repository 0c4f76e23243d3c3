pub mod chat;
pub mod hub;
pub mod match_engine;
pub mod session;

pub use chat::ChatService;
pub use hub::{Delivery, Hub};
pub use match_engine::MatchEngine;
pub use session::{InboundHandler, SessionConfig, SessionContext, SessionHandle, run_session};
