//! Splits book content into a fixed number of pages.

/// Page count used when a book declares none.
pub const DEFAULT_PAGE_COUNT: u32 = 100;

/// Derives page counts and partitions content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentPaginator {
    default_page_count: u32,
}

impl Default for ContentPaginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_COUNT)
    }
}

impl ContentPaginator {
    /// Create a paginator with the given fallback page count.
    pub fn new(default_page_count: u32) -> Self {
        Self {
            default_page_count: default_page_count.max(1),
        }
    }

    /// Page count for a book: the declared count, or the default when it is
    /// absent or zero.
    pub fn total_pages(&self, declared: Option<u32>) -> u32 {
        match declared {
            Some(n) if n > 0 => n,
            _ => self.default_page_count,
        }
    }

    /// Partition `content` into exactly [`Self::total_pages`] pages.
    ///
    /// Pages are contiguous character ranges whose lengths differ by at most
    /// one, so concatenating them yields the input. `None` content produces a
    /// single empty page. Page bounds are computed on lookup, so the declared
    /// count costs nothing up front.
    pub fn paginate(&self, content: Option<&str>, declared: Option<u32>) -> Pagination {
        let content = content.unwrap_or_default().to_string();
        let char_offsets = content
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(content.len()))
            .collect();

        Pagination {
            content,
            char_offsets,
            total_pages: self.total_pages(declared),
        }
    }
}

/// Content split into pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    content: String,
    /// Byte offset of every char, then `content.len()`.
    char_offsets: Vec<usize>,
    total_pages: u32,
}

impl Pagination {
    /// Number of navigable pages.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Text of a 1-based page; empty when the page holds no content.
    pub fn page(&self, page: u32) -> &str {
        if page == 0 || page > self.total_pages {
            return "";
        }
        let start = self.char_offsets[self.boundary(page - 1)];
        let end = self.char_offsets[self.boundary(page)];
        &self.content[start..end]
    }

    /// Char index where page `index + 1` starts.
    fn boundary(&self, index: u32) -> usize {
        let chars = (self.char_offsets.len() - 1) as u128;
        (u128::from(index) * chars / u128::from(self.total_pages)) as usize
    }
}
