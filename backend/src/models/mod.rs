pub mod events;
pub mod matches;
pub mod messages;
pub mod swipes;
pub mod users;

pub use events::{
    ChatPayload, Envelope, Event, MatchEvent, MessageEvent, StatusUpdateEvent, TypingEvent,
    TypingPayload,
};
pub use matches::{
    ApplicationStatus, Match, MatchStatus, MatchSummary, PairKey, SwipeOutcome, Transition,
    UpdateStatusRequest,
};
pub use messages::{Conversation, Message, MessageKind, MessagePage, SendMessageRequest};
pub use swipes::{Swipe, SwipeCategory, SwipeDirection, SwipeRequest};
pub use users::{Identity, JobRef, ProfileRef, Role, UserCounters};
