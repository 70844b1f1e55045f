//! Page arithmetic for list endpoints.

use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Maps (item_count, page_index, page_size) to an offset/limit window plus
/// navigation flags. When no rows should be requested (`limit == 0`) the
/// caller is expected to check [`Page::is_empty`] and skip the query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    pub item_count: u64,
    pub page_size: u64,
    pub page_count: u64,
    pub page_index: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    pub fn new(item_count: u64, page_index: u64, page_size: u64) -> Self {
        let page_count = item_count / page_size + u64::from(item_count % page_size > 0);
        let (page_index, offset, limit) = if item_count == 0 || page_index > page_count {
            (1, 0, 0)
        } else {
            (page_index, page_size * (page_index - 1), page_size)
        };
        Page {
            item_count,
            page_size,
            page_count,
            page_index,
            offset,
            limit,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }

    /// Page 1 with the default page size.
    pub fn first(item_count: u64) -> Self {
        Page::new(item_count, 1, DEFAULT_PAGE_SIZE)
    }

    /// True when the window requests no rows; callers skip the data query.
    pub fn is_empty(&self) -> bool {
        self.limit == 0
    }
}

/// Parse a page index from a request argument; anything unparseable or below
/// 1 falls back to page 1.
pub fn page_index_from(s: &str) -> u64 {
    match s.trim().parse::<u64>() {
        Ok(n) if n >= 1 => n,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_item_count_requests_no_rows() {
        for page_index in [1, 2, 100] {
            let p = Page::new(0, page_index, 10);
            assert_eq!(p.page_count, 0);
            assert_eq!(p.offset, 0);
            assert_eq!(p.limit, 0);
            assert!(p.is_empty());
            assert!(!p.has_next);
            assert!(!p.has_previous);
        }
    }

    #[test]
    fn window_math() {
        let p = Page::new(95, 1, 10);
        assert_eq!(p.page_count, 10);
        assert_eq!(p.offset, 0);
        assert_eq!(p.limit, 10);
        assert!(p.has_next);
        assert!(!p.has_previous);

        let p = Page::new(95, 10, 10);
        assert_eq!(p.offset, 90);
        assert_eq!(p.limit, 10);
        assert!(!p.has_next);
        assert!(p.has_previous);
    }

    #[test]
    fn page_index_past_end_clamps_to_first() {
        let p = Page::new(25, 9, 10);
        assert_eq!(p.page_index, 1);
        assert_eq!(p.offset, 0);
        assert_eq!(p.limit, 0);
        assert!(p.is_empty());
    }

    #[test]
    fn exact_multiple_has_no_partial_page() {
        let p = Page::new(30, 3, 10);
        assert_eq!(p.page_count, 3);
        assert_eq!(p.offset, 20);
        assert!(!p.has_next);
    }

    #[test]
    fn page_index_parsing() {
        assert_eq!(page_index_from("3"), 3);
        assert_eq!(page_index_from("0"), 1);
        assert_eq!(page_index_from("-2"), 1);
        assert_eq!(page_index_from("abc"), 1);
        assert_eq!(page_index_from(" 7 "), 7);
    }
}
