//! Token quantities.
//!
//! Two accounting scopes exist and must never be mixed up: the 5-hour billing
//! block (everything consumed across all projects since the block started) and
//! the current conversation window (the context size that drives compaction).
//! They differ by one to two orders of magnitude, so each gets its own type.

use serde::{Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign};

/// Per-category token counts for one record or an aggregate of records
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TokenCounts {
    pub input: u64,
    pub output: u64,
    pub cache_create: u64,
    pub cache_read: u64,
}

impl TokenCounts {
    pub fn total(&self) -> u64 {
        self.input
            .saturating_add(self.output)
            .saturating_add(self.cache_create)
            .saturating_add(self.cache_read)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Share of all tokens that were served from cache, in `[0, 1]`
    pub fn cache_hit_ratio(&self) -> f64 {
        let denom = self.total();
        if denom == 0 {
            0.0
        } else {
            self.cache_read as f64 / denom as f64
        }
    }
}

impl Add for TokenCounts {
    type Output = TokenCounts;

    fn add(self, rhs: TokenCounts) -> TokenCounts {
        TokenCounts {
            input: self.input.saturating_add(rhs.input),
            output: self.output.saturating_add(rhs.output),
            cache_create: self.cache_create.saturating_add(rhs.cache_create),
            cache_read: self.cache_read.saturating_add(rhs.cache_read),
        }
    }
}

impl AddAssign for TokenCounts {
    fn add_assign(&mut self, rhs: TokenCounts) {
        *self = *self + rhs;
    }
}

/// Marker for an accounting scope
pub trait AccountingScope {
    const LABEL: &'static str;
}

/// Tokens consumed inside one 5-hour billing block, across every project
#[derive(Debug)]
pub enum BlockWindow {}

/// Tokens currently held by one conversation, reset by compaction
#[derive(Debug)]
pub enum ConversationWindow {}

impl AccountingScope for BlockWindow {
    const LABEL: &'static str = "block";
}

impl AccountingScope for ConversationWindow {
    const LABEL: &'static str = "conversation";
}

/// A token total tagged with the scope it was accounted in.
///
/// There is deliberately no conversion between scopes: a block total cannot be
/// passed where a conversation total is expected.
pub struct Tokens<S: AccountingScope> {
    count: u64,
    _scope: PhantomData<S>,
}

impl<S: AccountingScope> Tokens<S> {
    pub const ZERO: Self = Self::new(0);

    pub const fn new(count: u64) -> Self {
        Self {
            count,
            _scope: PhantomData,
        }
    }

    pub fn get(self) -> u64 {
        self.count
    }

    pub fn scope(&self) -> &'static str {
        S::LABEL
    }
}

impl<S: AccountingScope> Clone for Tokens<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: AccountingScope> Copy for Tokens<S> {}

impl<S: AccountingScope> Default for Tokens<S> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<S: AccountingScope> PartialEq for Tokens<S> {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count
    }
}

impl<S: AccountingScope> Eq for Tokens<S> {}

impl<S: AccountingScope> PartialOrd for Tokens<S> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: AccountingScope> Ord for Tokens<S> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.count.cmp(&other.count)
    }
}

impl<S: AccountingScope> Add for Tokens<S> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.count.saturating_add(rhs.count))
    }
}

impl<S: AccountingScope> AddAssign for Tokens<S> {
    fn add_assign(&mut self, rhs: Self) {
        self.count = self.count.saturating_add(rhs.count);
    }
}

impl<S: AccountingScope> fmt::Debug for Tokens<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tokens<{}>({})", S::LABEL, self.count)
    }
}

impl<S: AccountingScope> Serialize for Tokens<S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        serializer.serialize_u64(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_ratio_is_zero_without_tokens() {
        assert_eq!(TokenCounts::default().cache_hit_ratio(), 0.0);
    }

    #[test]
    fn cache_ratio_uses_all_categories() {
        let t = TokenCounts {
            input: 10,
            output: 10,
            cache_create: 30,
            cache_read: 50,
        };
        assert!((t.cache_hit_ratio() - 0.5).abs() < 1e-12);
        assert_eq!(t.total(), 100);
    }

    #[test]
    fn scoped_tokens_keep_their_label() {
        let block: Tokens<BlockWindow> = Tokens::new(5) + Tokens::new(7);
        let conv: Tokens<ConversationWindow> = Tokens::new(3);
        assert_eq!(block.get(), 12);
        assert_eq!(block.scope(), "block");
        assert_eq!(conv.scope(), "conversation");
        assert_eq!(format!("{conv:?}"), "Tokens<conversation>(3)");
    }
}
