//! Event loop driving the sync engine.
//!
//! All producers (the push connection forwarder, the user input reader,
//! and one spawned task per network request) send [`SyncEvent`]s through a
//! single unbounded channel. The loop owns the [`Engine`] and is its only
//! caller, so events are applied one at a time in arrival order.
//!
//! # Requests
//!
//! Each [`Request`] the engine returns is executed on its own tokio task
//! against the [`NotificationApi`]; the task sends its result back as a
//! completion event. Requests are never cancelled or deduplicated, so two
//! refreshes for the same item both complete and the later completion wins.
//! Failed requests are logged at debug and otherwise ignored.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::NotificationApi;
use crate::engine::{Engine, Request};
use crate::frame::ItemId;
use crate::state::InteractionCounts;
use crate::view::View;

/// Action requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Open or close the notification popover.
    TogglePopover,
    /// Re-check the unread summary.
    Recheck,
    /// Start displaying counters for an item and fetch its counts.
    Track(ItemId),
}

/// Event delivered to the sync loop.
#[derive(Debug)]
pub enum SyncEvent {
    /// Raw push channel frame text.
    Frame(String),
    /// User action.
    Command(UserCommand),
    /// Summary fetch completed.
    SummaryFetched(Result<String>),
    /// Detail fetch completed.
    DetailFetched(Result<String>),
    /// Counts fetch completed.
    CountsFetched {
        /// Item the fetch was for.
        item_id: ItemId,
        /// Fetch outcome.
        result: Result<InteractionCounts>,
    },
    /// Stop the loop.
    Shutdown,
}

/// Single-consumer loop around an [`Engine`].
pub struct SyncRuntime<V: View> {
    engine: Engine,
    api: Arc<dyn NotificationApi>,
    view: V,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    event_rx: mpsc::UnboundedReceiver<SyncEvent>,
    in_flight: usize,
}

impl<V: View + std::fmt::Debug> std::fmt::Debug for SyncRuntime<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRuntime")
            .field("engine", &self.engine)
            .field("view", &self.view)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl<V: View> SyncRuntime<V> {
    /// Create a runtime. Nothing is fetched until [`Self::start`].
    pub fn new(engine: Engine, api: Arc<dyn NotificationApi>, view: V) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            api,
            view,
            event_tx,
            event_rx,
            in_flight: 0,
        }
    }

    /// Sender for feeding events into the loop.
    pub fn sender(&self) -> mpsc::UnboundedSender<SyncEvent> {
        self.event_tx.clone()
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Number of requests whose completion has not been handled yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Render the initial page and issue the startup summary check.
    pub fn start(&mut self) {
        let request = self.engine.check_notifications();
        self.issue(request);
        self.render();
    }

    /// Spawn a task forwarding push frames into the loop, in order.
    pub fn forward_frames(&self, mut frames: mpsc::Receiver<String>) -> JoinHandle<()> {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            while let Some(text) = frames.recv().await {
                if tx.send(SyncEvent::Frame(text)).is_err() {
                    break;
                }
            }
            log::debug!("Frame forwarder finished");
        })
    }

    /// Run until a [`SyncEvent::Shutdown`] arrives.
    pub async fn run(&mut self) {
        while self.step().await {}
        log::info!("Sync loop stopped");
    }

    /// Wait for and apply the next event. Returns `false` on shutdown.
    pub async fn step(&mut self) -> bool {
        match self.event_rx.recv().await {
            Some(event) => self.handle(event),
            // Unreachable while the runtime holds its own sender
            None => false,
        }
    }

    /// Handle queued events until no request is in flight.
    ///
    /// Returns early on shutdown.
    pub async fn settle(&mut self) {
        loop {
            while let Ok(event) = self.event_rx.try_recv() {
                if !self.handle(event) {
                    return;
                }
            }
            if self.in_flight == 0 {
                return;
            }
            if !self.step().await {
                return;
            }
        }
    }

    /// Apply one event. Returns `false` on shutdown.
    pub fn handle(&mut self, event: SyncEvent) -> bool {
        match event {
            SyncEvent::Frame(text) => {
                if let Some(request) = self.engine.on_frame_text(&text) {
                    self.issue(request);
                }
            }
            SyncEvent::Command(command) => self.handle_command(command),
            SyncEvent::SummaryFetched(result) => {
                self.complete();
                match result {
                    Ok(body) => self.engine.on_summary(&body),
                    Err(e) => log::debug!("Summary check failed: {e:#}"),
                }
            }
            SyncEvent::DetailFetched(result) => {
                self.complete();
                match result {
                    Ok(content) => self.engine.on_detail(content),
                    Err(e) => log::debug!("Detail fetch failed: {e:#}"),
                }
            }
            SyncEvent::CountsFetched { item_id, result } => {
                self.complete();
                match result {
                    Ok(counts) => {
                        let updated = self.engine.on_counts(&counts);
                        log::debug!("Counts for {item_id} applied to {updated} node(s)");
                    }
                    Err(e) => log::debug!("Counts refresh for {item_id} failed: {e:#}"),
                }
            }
            SyncEvent::Shutdown => {
                log::info!("Shutdown requested");
                return false;
            }
        }
        self.render();
        true
    }

    fn handle_command(&mut self, command: UserCommand) {
        let request = match command {
            UserCommand::TogglePopover => self.engine.toggle_popover(),
            UserCommand::Recheck => self.engine.check_notifications(),
            UserCommand::Track(item_id) => {
                self.engine.track(item_id.clone());
                // Start from server values instead of blank counters
                self.engine.refresh(item_id)
            }
        };
        self.issue(request);
    }

    fn complete(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn issue(&mut self, request: Request) {
        let api = Arc::clone(&self.api);
        let tx = self.event_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let event = match request {
                Request::FetchSummary => SyncEvent::SummaryFetched(api.fetch_summary().await),
                Request::FetchDetail => SyncEvent::DetailFetched(api.fetch_detail().await),
                Request::FetchCounts(item_id) => {
                    let result = api.fetch_counts(&item_id).await;
                    SyncEvent::CountsFetched { item_id, result }
                }
            };
            // Receiver gone means the loop is shutting down
            let _ = tx.send(event);
        });
    }

    fn render(&mut self) {
        if let Err(e) = self.view.render(self.engine.page()) {
            log::warn!("Render failed: {e:#}");
        }
    }
}
