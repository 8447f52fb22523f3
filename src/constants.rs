//! Application-wide constants for notify-sync.
//!
//! This module centralizes endpoint paths, protocol strings and timing
//! constants. Constants are grouped by domain.
//!
//! # Categories
//!
//! - **Server**: endpoint paths and the no-unread marker
//! - **Timeouts**: network timeouts
//! - **Reconnection**: push channel backoff bounds

use std::time::Duration;

// ============================================================================
// Server
// ============================================================================

/// Default server the client talks to.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Marker string the server renders when the viewer has no unread
/// notifications. Its presence in the summary body is the only signal
/// consumed by the poll.
pub const NO_UNREAD_MARKER: &str = "没有未读通知";

/// Summary endpoint, polled on start and after the popover is dismissed.
pub const SUMMARY_PATH: &str = "/notifications/latest-notifications/";

/// Detail endpoint, fetched when the popover is opened.
///
/// The server renders both views from the same endpoint.
pub const DETAIL_PATH: &str = "/notifications/latest-notifications/";

/// Interaction-count endpoint (POST, form field `id_value`).
pub const INTERACTIONS_PATH: &str = "/news/update-interactions/";

/// Mark-all-as-read endpoint.
pub const MARK_ALL_READ_PATH: &str = "/notifications/mark-all-as-read/";

/// Push channel path, appended to the ws(s) form of the server URL.
pub const PUSH_PATH: &str = "/ws/notifications/";

/// Session cookie name.
pub const SESSION_COOKIE: &str = "sessionid";

/// CSRF cookie name.
pub const CSRF_COOKIE: &str = "csrftoken";

// ============================================================================
// Timeouts
// ============================================================================

/// HTTP client request timeout for API calls.
///
/// Applies to each individual request. A request that times out is treated
/// like any other network failure: the state it would have refreshed stays
/// stale.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Reconnection
// ============================================================================

/// Initial push channel reconnect delay.
pub const RECONNECT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on the push channel reconnect delay.
pub const RECONNECT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Buffer size of the frame channel between the push connection and the
/// runtime forwarder.
pub const FRAME_BUFFER: usize = 256;
