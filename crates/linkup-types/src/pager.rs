//! Cursor pagination over message history.
//!
//! Pages are read newest-first with `id < cursor`, then flipped to
//! oldest-first for display. The cursor handed back is the oldest id on the
//! page, so successive pages are strictly older and never overlap.

use serde::Serialize;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// A page size already clamped into `[1, MAX_LIMIT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(u32);

impl Limit {
    pub fn clamp(raw: Option<i64>) -> Self {
        let value = match raw {
            None => DEFAULT_LIMIT,
            Some(n) => n.clamp(1, MAX_LIMIT as i64) as u32,
        };
        Self(value)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Limit {
    fn default() -> Self {
        Self(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<i64>,
}

impl<T> Page<T> {
    /// Build a page from rows fetched newest-first with `LIMIT limit`.
    ///
    /// A short page means history is exhausted, so no cursor is returned.
    pub fn from_newest_first<F>(mut rows: Vec<T>, limit: Limit, id_of: F) -> Self
    where
        F: Fn(&T) -> i64,
    {
        let full = rows.len() == limit.get() as usize;
        let next_cursor = if full { rows.last().map(&id_of) } else { None };
        rows.reverse();

        Self {
            items: rows,
            next_cursor,
        }
    }
}
