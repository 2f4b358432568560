//! Page-number pagination over a counted listing.

use serde::Serialize;

/// Default number of items per page.
pub const DEFAULT_PER_PAGE: u64 = 10;

/// Which slice of a listing a page covers, after clamping the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PageWindow {
    /// Non-numeric or < 1 goes to the first page, past the end to the last.
    /// An empty listing still has one (empty) page.
    pub fn resolve(raw_page: Option<&str>, total_items: u64, per_page: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_items.div_ceil(per_page).max(1);
        let requested = raw_page
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(1);
        let number = if requested < 1 {
            1
        } else {
            (requested as u64).min(total_pages)
        };

        Self {
            number,
            per_page,
            total_items,
            total_pages,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// One page of items plus the navigation data templates need.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            total_pages: window.total_pages,
            total_items: window.total_items,
            has_previous: window.has_previous(),
            has_next: window.has_next(),
            previous_page: window.has_previous().then(|| window.number - 1),
            next_page: window.has_next().then(|| window.number + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_by_default() {
        let window = PageWindow::resolve(None, 25, DEFAULT_PER_PAGE);
        assert_eq!(window.number, 1);
        assert_eq!(window.total_pages, 3);
        assert_eq!(window.offset(), 0);
        assert_eq!(window.limit(), 10);
    }

    #[test]
    fn test_out_of_range_pages_are_clamped() {
        assert_eq!(PageWindow::resolve(Some("0"), 25, 10).number, 1);
        assert_eq!(PageWindow::resolve(Some("-3"), 25, 10).number, 1);
        assert_eq!(PageWindow::resolve(Some("abc"), 25, 10).number, 1);

        let last = PageWindow::resolve(Some("99"), 25, 10);
        assert_eq!(last.number, 3);
        assert_eq!(last.offset(), 20);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let window = PageWindow::resolve(Some("5"), 0, 10);
        assert_eq!(window.number, 1);
        assert_eq!(window.total_pages, 1);
        assert!(!window.has_next());
        assert!(!window.has_previous());
    }

    #[test]
    fn test_exact_multiple_of_page_size() {
        let window = PageWindow::resolve(Some("2"), 20, 10);
        assert_eq!(window.total_pages, 2);
        assert!(!window.has_next());

        let page = Page::new(vec![11, 12], window);
        assert_eq!(page.previous_page, Some(1));
        assert_eq!(page.next_page, None);
    }
}
