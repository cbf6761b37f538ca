//! Table pagination.

/// Current page and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// 1-based page number
    pub current: usize,
    pub size: usize,
}

impl PageState {
    pub fn new(size: usize) -> Self {
        Self {
            current: 1,
            size: size.max(1),
        }
    }

    /// Number of pages for `total` rows; never less than 1.
    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.size).max(1)
    }

    /// Whether "Previous" is enabled.
    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    /// Whether "Next" is enabled.
    pub fn has_next(&self, total: usize) -> bool {
        self.current < self.page_count(total)
    }

    /// Advance one page if possible.
    pub fn next(&mut self, total: usize) {
        if self.has_next(total) {
            self.current += 1;
        }
    }

    /// Go back one page if possible.
    pub fn previous(&mut self) {
        if self.has_previous() {
            self.current -= 1;
        }
    }

    /// Jump to a page, clamped to the valid range.
    pub fn go_to(&mut self, page: usize, total: usize) {
        self.current = page.clamp(1, self.page_count(total));
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }
}

/// Summary of the pagination controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current: usize,
    pub page_count: usize,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageInfo {
    pub fn new(state: &PageState, total: usize) -> Self {
        Self {
            current: state.current,
            page_count: state.page_count(total),
            total,
            has_previous: state.has_previous(),
            has_next: state.has_next(total),
        }
    }
}

/// Rows of a 1-based page. Pages past the end are empty.
pub fn paginate<T>(items: &[T], page: usize, size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(size).min(items.len());
    let end = start.saturating_add(size).min(items.len());
    &items[start..end]
}
