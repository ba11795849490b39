//! Row-offset pagination

use serde::{Deserialize, Serialize};

/// `offset` counts rows, not pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub limit: u64,
    pub offset: u64,
}

impl PaginationCursor {
    pub fn new(limit: u64) -> Self {
        Self {
            limit: limit.max(1),
            offset: 0,
        }
    }

    /// Advance one page unless that would start past the last row
    pub fn next(&mut self, total_rows: u64) {
        if self.offset + self.limit < total_rows {
            self.offset += self.limit;
        }
    }

    pub fn prev(&mut self) {
        self.offset = self.offset.saturating_sub(self.limit);
    }

    pub fn first(&mut self) {
        self.offset = 0;
    }

    /// Jump so the final `limit` rows are shown
    pub fn last(&mut self, total_rows: u64) {
        self.offset = total_rows.saturating_sub(self.limit);
    }

    /// Change the page size and return to the first page
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit.max(1);
        self.offset = 0;
    }

    /// Zero-based page containing the first visible row
    pub fn page(&self) -> u64 {
        self.offset / self.limit
    }

    pub fn has_next(&self, total_rows: u64) -> bool {
        self.offset + self.limit < total_rows
    }

    pub fn has_prev(&self) -> bool {
        self.offset > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_stops_at_last_page() {
        for total in [0u64, 1, 9, 10, 11, 25, 100] {
            for limit in [1u64, 3, 10] {
                let mut cursor = PaginationCursor::new(limit);
                let bound = if total == 0 { 0 } else { limit * ((total - 1) / limit) };
                for _ in 0..(total + 5) {
                    cursor.next(total);
                    assert!(cursor.offset <= bound, "total {total} limit {limit}");
                }
                assert_eq!(cursor.offset, bound, "total {total} limit {limit}");
                assert!(!cursor.has_next(total));
            }
        }
    }

    #[test]
    fn test_last_and_first() {
        let mut cursor = PaginationCursor::new(10);
        cursor.last(25);
        assert_eq!(cursor.offset, 15);
        cursor.last(4);
        assert_eq!(cursor.offset, 0);

        cursor.next(100);
        cursor.next(100);
        cursor.prev();
        cursor.next(100);
        cursor.first();
        assert_eq!(cursor.offset, 0);
        assert!(!cursor.has_prev());
    }

    #[test]
    fn test_prev_saturates() {
        let mut cursor = PaginationCursor { limit: 10, offset: 5 };
        cursor.prev();
        assert_eq!(cursor.offset, 0);
        cursor.prev();
        assert_eq!(cursor.offset, 0);
    }

    #[test]
    fn test_set_limit_resets_offset() {
        let mut cursor = PaginationCursor { limit: 10, offset: 30 };
        assert_eq!(cursor.page(), 3);
        cursor.set_limit(0);
        assert_eq!(cursor, PaginationCursor { limit: 1, offset: 0 });
    }
}
