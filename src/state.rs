//! Page state owned by the sync engine.
//!
//! Everything the viewer sees is derived from [`Page`]: the unread
//! indicator, the popover, the "new activity" banner and the interaction
//! counters tagged by item id. Only the engine mutates it; views read it.

use crate::frame::ItemId;

/// Visual styling of the unread indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorStyle {
    /// At least one unacknowledged notification.
    Alert,
    /// Nothing unread.
    Normal,
}

/// The single "has unread" flag behind the indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorState {
    unread: bool,
}

impl IndicatorState {
    /// Whether there is something unread.
    pub fn is_unread(self) -> bool {
        self.unread
    }

    /// Mark as unread. Idempotent.
    pub fn raise(&mut self) {
        self.unread = true;
    }

    /// Mark as acknowledged.
    pub fn clear(&mut self) {
        self.unread = false;
    }

    /// Rendering projection.
    pub fn style(self) -> IndicatorStyle {
        if self.unread {
            IndicatorStyle::Alert
        } else {
            IndicatorStyle::Normal
        }
    }
}

/// Visibility of the notification detail popover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PopoverState {
    /// Not displayed.
    #[default]
    Hidden,
    /// Displayed with the fetched detail content.
    Shown {
        /// Popover-ready content from the detail endpoint.
        content: String,
    },
}

impl PopoverState {
    /// Whether the popover is displayed.
    pub fn is_shown(&self) -> bool {
        matches!(self, Self::Shown { .. })
    }
}

/// Visibility of the "new activity" banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BannerState {
    /// Not displayed.
    #[default]
    Hidden,
    /// Displayed; stays until something outside the engine hides it.
    Visible,
}

/// Authoritative like/comment totals for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionCounts {
    /// Item these counts belong to.
    pub item_id: ItemId,
    /// Number of likes.
    pub likes: u64,
    /// Number of comments.
    pub comments: u64,
}

/// One rendered counter widget for an item.
///
/// An item can be rendered in several places at once (list and detail
/// view), so there can be many nodes per id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountNode {
    /// Item this node displays.
    pub item_id: ItemId,
    /// Displayed like-count text.
    pub like_text: String,
    /// Displayed comment-count text.
    pub comment_text: String,
}

/// All counter nodes on the page.
#[derive(Debug, Clone, Default)]
pub struct CountBoard {
    nodes: Vec<CountNode>,
}

impl CountBoard {
    /// Register a new node for `item_id` with empty text. Returns its index.
    pub fn track(&mut self, item_id: ItemId) -> usize {
        self.nodes.push(CountNode {
            item_id,
            like_text: String::new(),
            comment_text: String::new(),
        });
        self.nodes.len() - 1
    }

    /// Overwrite the text of every node tagged with the counts' item.
    ///
    /// Returns the number of nodes updated.
    pub fn apply(&mut self, counts: &InteractionCounts) -> usize {
        let mut updated = 0;
        for node in self.nodes.iter_mut().filter(|n| n.item_id == counts.item_id) {
            node.like_text = counts.likes.to_string();
            node.comment_text = counts.comments.to_string();
            updated += 1;
        }
        updated
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> Option<&CountNode> {
        self.nodes.get(index)
    }

    /// Nodes tagged `item_id`.
    pub fn nodes_for<'a, 'b>(&'a self, item_id: &'b ItemId) -> impl Iterator<Item = &'a CountNode> + use<'a, 'b> {
        self.nodes.iter().filter(move |n| &n.item_id == item_id)
    }

    /// All nodes in registration order.
    pub fn nodes(&self) -> &[CountNode] {
        &self.nodes
    }
}

/// Everything a view renders.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Unread indicator.
    pub indicator: IndicatorState,
    /// Detail popover.
    pub popover: PopoverState,
    /// "New activity" banner.
    pub banner: BannerState,
    /// Interaction counters.
    pub counts: CountBoard,
}
