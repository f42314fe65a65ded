//! Fixed-size paging for listing endpoints.

/// Rows per page. Not caller-controlled.
pub const PAGE_SIZE: i64 = 50;

/// `LIMIT`/`OFFSET` pair for one page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Map a 1-based page number to its window; pages `<= 0` are page 1.
    pub fn number(page: i64) -> Self {
        let page = page.max(1);
        Self {
            limit: PAGE_SIZE,
            offset: (page - 1).saturating_mul(PAGE_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_zero_and_one_are_identical() {
        assert_eq!(Page::number(0), Page::number(1));
        assert_eq!(Page::number(1), Page { limit: 50, offset: 0 });
    }

    #[test]
    fn negative_pages_never_produce_negative_offsets() {
        assert_eq!(Page::number(-7), Page::number(1));
        assert_eq!(Page::number(i64::MIN).offset, 0);
    }

    #[test]
    fn third_page() {
        assert_eq!(Page::number(3), Page { limit: 50, offset: 100 });
    }

    #[test]
    fn huge_page_saturates() {
        assert_eq!(Page::number(i64::MAX).offset, i64::MAX);
    }
}
