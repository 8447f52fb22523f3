//! notify-sync - real-time unread-notification sync client.
//!
//! Keeps an unread indicator, a notification popover, a "new activity"
//! banner and per-item interaction counters consistent with the server,
//! merging an initial poll, on-demand detail fetches and a push channel.
//!
//! # Architecture
//!
//! - **Engine** - sans-IO state machine owning the page state
//! - **Runtime** - single-consumer event loop executing engine requests
//! - **Api** - HTTP collaborator behind the [`api::NotificationApi`] trait
//! - **Transport** - reconnecting push channel feeding raw frames
//! - **View** - rendering projection of the page
//!
//! # Modules
//!
//! - [`engine`] - poll sync, popover toggle, event routing, count refresh
//! - [`frame`] - push frame parsing
//! - [`state`] - page state types
//! - [`config`] - configuration loading/saving

pub mod api;
pub mod config;
pub mod constants;
pub mod engine;
pub mod env;
pub mod frame;
pub mod runtime;
pub mod state;
pub mod transport;
pub mod view;
pub mod ws;

// Re-export commonly used types
pub use api::{HttpApi, NotificationApi};
pub use config::Config;
pub use engine::{Engine, Request};
pub use frame::{EventFrame, FrameError, ItemId};
pub use runtime::{SyncEvent, SyncRuntime, UserCommand};
pub use state::{IndicatorState, IndicatorStyle, InteractionCounts, Page, PopoverState};
pub use view::{TerminalView, View};
