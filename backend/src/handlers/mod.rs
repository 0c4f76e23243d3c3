pub mod auth;
pub mod chat;
pub mod matches;
pub mod swipes;
pub mod ws;

pub use auth::{AuthenticatedUser, SessionUser};
