//! Limit/offset paging over upstream lists that report no total count.
//!
//! Whether another page exists is guessed: a page that came back full might
//! have a successor. When the remaining count is an exact multiple of the
//! limit the guess is wrong once, and the speculative empty page is rolled
//! back.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the caller should do with a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Show the fetched items
    Accepted,
    /// A speculative next page was empty; the offset went back and the
    /// previously shown items should stay
    RolledBack,
}

/// Paging state for one list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginator {
    limit: u32,
    offset: u32,
    /// Item count of the last accepted page
    last_len: Option<usize>,
    /// Set when a speculative next page came back empty
    exhausted: bool,
    /// Offset to return to if the in-flight next page is empty
    #[serde(skip)]
    speculative_from: Option<u32>,
}

impl Paginator {
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            offset: 0,
            last_len: None,
            exhausted: false,
            speculative_from: None,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// True when the last page came back full.
    pub fn has_next(&self) -> bool {
        !self.exhausted && self.last_len == Some(self.limit as usize)
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }

    /// Advances by one page if the last page was full. Returns whether the
    /// offset moved; the caller refetches only then.
    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            debug!(offset = self.offset, limit = self.limit, "Refusing to page past the end");
            return false;
        }
        self.speculative_from = Some(self.offset);
        self.offset = self.offset.saturating_add(self.limit);
        true
    }

    /// Goes back one page, stopping at zero. Returns whether the offset
    /// moved.
    pub fn prev(&mut self) -> bool {
        if self.offset == 0 {
            return false;
        }
        self.offset = self.offset.saturating_sub(self.limit);
        self.exhausted = false;
        self.speculative_from = None;
        true
    }

    /// Changes the page size and returns to the first page.
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit.max(1);
        self.reset();
    }

    /// Jumps to `offset` with page size `limit`, forgetting what was
    /// fetched.
    pub fn seek(&mut self, limit: u32, offset: u32) {
        self.limit = limit.max(1);
        self.reset();
        self.offset = offset;
    }

    /// Returns to the first page, forgetting what was fetched. Used when the
    /// limit or the session/semester context changes.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.last_len = None;
        self.exhausted = false;
        self.speculative_from = None;
    }

    /// Records the size of the page fetched at the current offset.
    pub fn record(&mut self, len: usize) -> PageOutcome {
        if let Some(previous) = self.speculative_from.take() {
            if len == 0 {
                debug!(offset = self.offset, back_to = previous, "Next page was empty, rolling back");
                self.offset = previous;
                self.exhausted = true;
                return PageOutcome::RolledBack;
            }
        }
        self.last_len = Some(len);
        self.exhausted = false;
        PageOutcome::Accepted
    }
}
