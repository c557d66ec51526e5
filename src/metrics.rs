/// Per-page counts recorded while laying out tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    pub titles: usize,
    pub heading_rows: usize,
    pub rows: usize,
    /// Items placed past the bottom edge because they could not fit even on
    /// a fresh page.
    pub overfull: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutMetrics {
    pub pages: Vec<PageMetrics>,
    pub tables: usize,
    pub page_breaks: usize,
    pub total_layout_ms: f64,
}

impl LayoutMetrics {
    pub(crate) fn new() -> Self {
        Self {
            pages: vec![PageMetrics {
                page_number: 1,
                ..PageMetrics::default()
            }],
            ..Self::default()
        }
    }

    pub(crate) fn start_page(&mut self) {
        self.page_breaks += 1;
        self.pages.push(PageMetrics {
            page_number: self.pages.len() + 1,
            ..PageMetrics::default()
        });
    }

    pub(crate) fn current_page(&mut self) -> &mut PageMetrics {
        if self.pages.is_empty() {
            self.pages.push(PageMetrics {
                page_number: 1,
                ..PageMetrics::default()
            });
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    pub fn total_rows(&self) -> usize {
        self.pages.iter().map(|page| page.rows).sum()
    }
}
