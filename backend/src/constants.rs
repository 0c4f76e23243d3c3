// =============================================================================
// SwipeMatch Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default database pool size
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// API prefix for every versioned route
pub const API_PREFIX: &str = "/api/v1";

// =============================================================================
// IDENTITY HEADERS (set by the upstream identity service)
// =============================================================================

/// Header carrying the authenticated user's UUID
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the authenticated user's role
pub const USER_ROLE_HEADER: &str = "x-user-role";

// =============================================================================
// REAL-TIME SESSION CONFIGURATION
// =============================================================================

/// Capacity of each session's outbound queue
pub const DEFAULT_SEND_BUFFER: usize = 256;

/// Maximum inbound frame size in bytes
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4096;

/// Time allowed between two inbound frames (pongs included) before the
/// session is reaped
pub const DEFAULT_PONG_WAIT_SECS: u64 = 60;

/// Time allowed for a single frame write to the peer
pub const DEFAULT_WRITE_WAIT_SECS: u64 = 10;

/// Upper bound on envelopes folded into one outbound text frame
pub const MAX_COALESCED_ENVELOPES: usize = 64;

/// Separator between coalesced envelopes inside one text frame
pub const COALESCE_SEPARATOR: char = '\n';

// =============================================================================
// QUERY LIMITS
// =============================================================================

/// Number of swipes returned by the history endpoint
pub const SWIPE_HISTORY_LIMIT: i64 = 100;

/// Default page size for chat history
pub const DEFAULT_MESSAGE_PAGE_SIZE: i64 = 50;

/// Largest page size a client may request for chat history
pub const MAX_MESSAGE_PAGE_SIZE: i64 = 200;

/// Maximum length of a chat message body in characters
pub const MAX_MESSAGE_CHARS: usize = 4000;

// =============================================================================
// NOTIFICATION TEXT
// =============================================================================

/// Text attached to every match notification
pub const MATCH_NOTIFICATION_TEXT: &str = "You have a new match!";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Ping period derived from the pong wait: pings must land well before the
/// peer's read deadline expires
pub fn ping_period_secs(pong_wait_secs: u64) -> u64 {
    (pong_wait_secs * 9 / 10).max(1)
}
