//! Notification sync engine.
//!
//! The engine is the reconciliation core. It owns the [`Page`] and merges
//! three independent signal sources into it:
//!
//! - **Poll sync**: summary fetched on start and after the popover closes
//! - **Popover toggle**: detail fetched on open, which acknowledges unread
//! - **Push frames**: routed by kind, with self-origin suppression
//!
//! # Design
//!
//! The engine performs no I/O. Each operation mutates the page and returns
//! the [`Request`] it wants issued; the caller executes it and feeds the
//! result back through the matching `on_*` method. All mutation happens on
//! one consumer, so no locking is involved, and every mutation is a plain
//! assignment.
//!
//! ```text
//!   frame ──► on_event ──► indicator / banner
//!                   └────► Request::FetchCounts ──► on_counts ──► counters
//!   start ──► Request::FetchSummary ──► on_summary ──► indicator
//!   toggle ─► Request::FetchDetail ──► on_detail ──► popover + clear
//!        └──► (shown) hide + Request::FetchSummary
//! ```

use crate::constants::NO_UNREAD_MARKER;
use crate::frame::{EventFrame, ItemId};
use crate::state::{BannerState, InteractionCounts, Page, PopoverState};

/// Network request the engine wants issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Uncached read of the unread summary.
    FetchSummary,
    /// Uncached read of the popover detail content.
    FetchDetail,
    /// Uncached read of one item's interaction counts.
    FetchCounts(ItemId),
}

/// Sans-IO reconciliation state machine.
#[derive(Debug)]
pub struct Engine {
    viewer: String,
    page: Page,
}

impl Engine {
    /// Create an engine for `viewer`. Frames whose actor equals `viewer`
    /// never raise the viewer's own alerts.
    pub fn new(viewer: impl Into<String>) -> Self {
        Self {
            viewer: viewer.into(),
            page: Page::default(),
        }
    }

    /// Current page state.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Viewer identity.
    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    /// Register a counter node for `item_id`.
    pub fn track(&mut self, item_id: ItemId) -> usize {
        self.page.counts.track(item_id)
    }

    fn is_self(&self, actor_name: &str) -> bool {
        actor_name == self.viewer
    }

    // ========================================================================
    // Poll sync
    // ========================================================================

    /// Start a summary check.
    pub fn check_notifications(&mut self) -> Request {
        log::debug!("Checking notifications");
        Request::FetchSummary
    }

    /// Apply a summary body.
    ///
    /// Anything but the no-unread marker raises the indicator. The marker
    /// leaves the indicator as it is.
    pub fn on_summary(&mut self, body: &str) {
        if body.contains(NO_UNREAD_MARKER) {
            log::debug!("Summary: no unread notifications");
        } else {
            log::debug!("Summary: unread notifications present");
            self.page.indicator.raise();
        }
    }

    // ========================================================================
    // Popover
    // ========================================================================

    /// Handle the user's toggle action.
    ///
    /// Hidden: request the detail. The popover only shows once
    /// [`Self::on_detail`] runs, replacing any earlier content.
    /// Shown: hide and request a summary re-check.
    pub fn toggle_popover(&mut self) -> Request {
        match self.page.popover {
            PopoverState::Hidden => {
                log::debug!("Popover: requesting detail");
                Request::FetchDetail
            }
            PopoverState::Shown { .. } => {
                log::debug!("Popover: hidden, re-checking");
                self.page.popover = PopoverState::Hidden;
                self.check_notifications()
            }
        }
    }

    /// Apply fetched detail content: show the popover and acknowledge.
    ///
    /// Content from a previous opening is discarded, never merged.
    pub fn on_detail(&mut self, content: String) {
        self.page.popover = PopoverState::Shown { content };
        self.page.indicator.clear();
    }

    // ========================================================================
    // Event routing
    // ========================================================================

    /// Parse and route one frame's text.
    ///
    /// Malformed frames are logged and dropped.
    pub fn on_frame_text(&mut self, text: &str) -> Option<Request> {
        match EventFrame::parse(text) {
            Ok(frame) => self.on_event(&frame),
            Err(e) => {
                log::warn!("Dropping malformed frame: {e}");
                None
            }
        }
    }

    /// Route one frame.
    pub fn on_event(&mut self, frame: &EventFrame) -> Option<Request> {
        match frame {
            EventFrame::Notification { actor_name } => {
                if !self.is_self(actor_name) {
                    self.page.indicator.raise();
                }
                None
            }
            EventFrame::SocialUpdate {
                actor_name,
                id_value,
            } => {
                if !self.is_self(actor_name) {
                    self.page.indicator.raise();
                }
                // Own likes and comments still change the visible counts
                Some(self.refresh(id_value.clone()))
            }
            EventFrame::AdditionalNews { actor_name } => {
                if !self.is_self(actor_name) {
                    self.page.banner = BannerState::Visible;
                }
                None
            }
            EventFrame::Unknown { key, raw } => {
                log::warn!("Unrecognized event '{key}': {raw}");
                None
            }
        }
    }

    // ========================================================================
    // Interaction refresh
    // ========================================================================

    /// Start a counts refresh for `item_id`.
    pub fn refresh(&mut self, item_id: ItemId) -> Request {
        log::debug!("Refreshing interactions for {item_id}");
        Request::FetchCounts(item_id)
    }

    /// Overwrite every counter node for the counts' item.
    ///
    /// Returns the number of nodes updated.
    pub fn on_counts(&mut self, counts: &InteractionCounts) -> usize {
        self.page.counts.apply(counts)
    }
}
