use crate::error::Result;
use crate::render::{RenderAdapter, ResolvedCellStyle};
use crate::table::Cell;
use crate::types::{Color, Pt, Rect};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    StartPage,
    FinalizePage,
    Cell {
        bounds: Rect,
        content: String,
        style: ResolvedCellStyle,
    },
    Fill {
        bounds: Rect,
        color: Color,
    },
    Border {
        bounds: Rect,
    },
}

/// Render adapter that only records what it was asked to do.
#[derive(Debug, Default)]
pub(crate) struct RecordingAdapter {
    pub(crate) events: Vec<Event>,
}

impl RecordingAdapter {
    pub(crate) fn count(&self, wanted: &Event) -> usize {
        self.events.iter().filter(|e| *e == wanted).count()
    }

    pub(crate) fn cells(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Cell { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Top edges of drawn cells, grouped by page.
    pub(crate) fn tops_per_page(&self) -> Vec<Vec<Pt>> {
        let mut pages = vec![Vec::new()];
        for event in &self.events {
            match event {
                Event::StartPage => pages.push(Vec::new()),
                Event::Border { bounds } => {
                    if let Some(page) = pages.last_mut() {
                        page.push(bounds.y);
                    }
                }
                _ => {}
            }
        }
        pages
    }
}

impl RenderAdapter for RecordingAdapter {
    fn start_new_page(&mut self) -> Result<()> {
        self.events.push(Event::StartPage);
        Ok(())
    }

    fn finalize_page(&mut self) -> Result<()> {
        self.events.push(Event::FinalizePage);
        Ok(())
    }

    fn draw_cell(&mut self, bounds: Rect, cell: &Cell, style: &ResolvedCellStyle) -> Result<()> {
        self.events.push(Event::Cell {
            bounds,
            content: cell.content.clone(),
            style: style.clone(),
        });
        Ok(())
    }

    fn draw_filled_rect(&mut self, bounds: Rect, color: Color) -> Result<()> {
        self.events.push(Event::Fill { bounds, color });
        Ok(())
    }

    fn draw_border(&mut self, bounds: Rect, _color: Color, _width: Pt) -> Result<()> {
        self.events.push(Event::Border { bounds });
        Ok(())
    }
}
