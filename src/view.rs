//! Rendering of the page state.
//!
//! Views never mutate state. The runtime calls [`View::render`] after every
//! handled event with the current [`Page`]; a view decides what changed.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;

use crate::frame::ItemId;
use crate::state::{BannerState, IndicatorStyle, Page};

/// Rendering projection of the page.
pub trait View: Send {
    /// Render the current page.
    fn render(&mut self, page: &Page) -> Result<()>;
}

/// What the terminal view last printed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rendered {
    style: IndicatorStyle,
    popover: Option<String>,
    banner: BannerState,
    counts: BTreeMap<ItemId, (String, String)>,
}

impl Rendered {
    fn of(page: &Page) -> Self {
        let popover = match &page.popover {
            crate::state::PopoverState::Hidden => None,
            crate::state::PopoverState::Shown { content } => Some(content.clone()),
        };
        // Every node of an item shows the same text, so one entry per item
        let counts = page
            .counts
            .nodes()
            .iter()
            .map(|n| {
                (
                    n.item_id.clone(),
                    (n.like_text.clone(), n.comment_text.clone()),
                )
            })
            .collect();
        Self {
            style: page.indicator.style(),
            popover,
            banner: page.banner,
            counts,
        }
    }
}

/// Line-oriented view for a terminal or any writer.
///
/// Prints only what changed since the previous render.
#[derive(Debug)]
pub struct TerminalView<W: Write + Send> {
    out: W,
    last: Option<Rendered>,
}

impl<W: Write + Send> TerminalView<W> {
    /// Create a view writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Consume the view and return its writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> View for TerminalView<W> {
    fn render(&mut self, page: &Page) -> Result<()> {
        let now = Rendered::of(page);
        let last = self.last.take();

        if last.as_ref().map(|l| l.style) != Some(now.style) {
            match now.style {
                IndicatorStyle::Alert => writeln!(self.out, "[bell] unread notifications")?,
                IndicatorStyle::Normal => writeln!(self.out, "[bell] all caught up")?,
            }
        }

        if last.as_ref().map(|l| &l.popover) != Some(&now.popover) {
            match &now.popover {
                Some(content) => {
                    writeln!(self.out, "[popover]")?;
                    for line in plain_text(content) {
                        writeln!(self.out, "  {line}")?;
                    }
                }
                // First render of a hidden popover prints nothing
                None if last.is_some() => writeln!(self.out, "[popover] closed")?,
                None => {}
            }
        }

        if now.banner == BannerState::Visible
            && last.as_ref().map(|l| l.banner) != Some(BannerState::Visible)
        {
            writeln!(self.out, "[stream] new activity posted")?;
        }

        for (item_id, (likes, comments)) in &now.counts {
            let previous = last.as_ref().and_then(|l| l.counts.get(item_id));
            if likes.is_empty() || previous == Some(&(likes.clone(), comments.clone())) {
                continue;
            }
            writeln!(
                self.out,
                "[item {item_id}] {likes} likes, {comments} comments"
            )?;
        }

        self.out.flush()?;
        self.last = Some(now);
        Ok(())
    }
}

/// Reduce popover markup to trimmed, non-empty text lines.
///
/// Tags become line breaks and the common HTML entities are decoded.
pub fn plain_text(markup: &str) -> Vec<String> {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push('\n');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}
