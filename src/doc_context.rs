use crate::types::Size;

/// What a page hook knows about the page being finalized.
#[derive(Debug, Clone)]
pub struct DocContext {
    /// 1-based.
    pub page_number: usize,
    pub page_size: Size,
}

impl DocContext {
    pub fn new(page_number: usize, page_size: Size) -> Self {
        Self {
            page_number,
            page_size,
        }
    }
}
