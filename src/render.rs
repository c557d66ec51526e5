use crate::canvas::{Canvas, Document};
use crate::doc_context::DocContext;
use crate::error::Result;
use crate::options::LayoutOptions;
use crate::table::{Cell, RowType, TextAlign};
use crate::text::{FontSpec, TextMetrics, wrap_lines};
use crate::types::{Color, Pt, Rect, Size};
use std::sync::Arc;

/// Drawing backend for laid-out tables. Bounds use layout space: `y` is the
/// top edge measured up from the bottom of the page.
///
/// Calls arrive strictly in document order; an implementation never sees
/// `start_new_page` twice without something drawn or `finalize_page` between.
pub trait RenderAdapter {
    fn start_new_page(&mut self) -> Result<()>;
    fn finalize_page(&mut self) -> Result<()>;
    fn draw_cell(&mut self, bounds: Rect, cell: &Cell, style: &ResolvedCellStyle) -> Result<()>;
    fn draw_filled_rect(&mut self, bounds: Rect, color: Color) -> Result<()>;
    fn draw_border(&mut self, bounds: Rect, color: Color, width: Pt) -> Result<()>;
}

/// Cell styling after cell, per-column and row-type defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCellStyle {
    pub font: FontSpec,
    pub text_color: Color,
    pub background_color: Option<Color>,
    pub align: TextAlign,
    /// Inset between the cell edge and its text.
    pub padding: Pt,
    /// Characters a line may end after, besides whitespace.
    pub break_after: Vec<char>,
}

impl ResolvedCellStyle {
    pub fn for_cell(cell: &Cell, column: usize, row_type: RowType, options: &LayoutOptions) -> Self {
        let style = options.row_style(row_type);
        Self {
            font: cell.font.clone().unwrap_or_else(|| style.font.clone()),
            text_color: cell.text_color.unwrap_or_else(|| style.text_color(column)),
            background_color: cell
                .background_color
                .or_else(|| style.background_color(column)),
            align: cell.align.unwrap_or(style.text_alignment),
            padding: options.padding,
            break_after: options.break_for_min_width_on.clone(),
        }
    }

    pub fn for_title(options: &LayoutOptions) -> Self {
        let title = &options.title;
        Self {
            font: title.font.clone(),
            text_color: title.text_color,
            background_color: Some(title.background_color),
            align: title.alignment,
            padding: options.padding + title.padding,
            break_after: options.break_for_min_width_on.clone(),
        }
    }
}

pub type OnPageCallback = Arc<dyn Fn(&mut Canvas, &DocContext) + Send + Sync>;

/// Renders onto a [`Canvas`]. The canvas's first page is the page layout
/// starts on.
pub struct CanvasAdapter<'a> {
    canvas: Canvas,
    metrics: &'a dyn TextMetrics,
    on_page: Option<OnPageCallback>,
}

impl<'a> CanvasAdapter<'a> {
    pub fn new(page_size: Size, metrics: &'a dyn TextMetrics) -> Self {
        Self {
            canvas: Canvas::new(page_size),
            metrics,
            on_page: None,
        }
    }

    pub fn with_on_page(mut self, callback: Option<OnPageCallback>) -> Self {
        self.on_page = callback;
        self
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn into_document(self) -> Document {
        self.canvas.finish()
    }

    // Layout space to the canvas's top-left space.
    fn top(&self, y: Pt) -> Pt {
        self.canvas.page_size().height - y
    }

    fn draw_text(&mut self, inner: Rect, content: &str, style: &ResolvedCellStyle) {
        let lines = wrap_lines(
            self.metrics,
            content,
            inner.width,
            &style.font,
            &style.break_after,
        );
        if lines.is_empty() {
            return;
        }
        let line_height = self.metrics.line_height(&style.font);
        let text_height = line_height * (lines.len() as i32);
        let centering = if text_height < inner.height {
            (inner.height - text_height) / 2
        } else {
            Pt::ZERO
        };
        self.canvas.set_fill_color(style.text_color);
        self.canvas.set_font_name(&style.font.face_name());
        self.canvas.set_font_size(style.font.size);
        let mut line_top = self.top(inner.y) + centering;
        for line in lines {
            let width = self.metrics.measure_width(&line, &style.font);
            let x = match style.align {
                TextAlign::Left => inner.x,
                TextAlign::Center => inner.x + (inner.width - width) / 2,
                TextAlign::Right => inner.x + inner.width - width,
            };
            self.canvas.draw_string(x, line_top, line);
            line_top += line_height;
        }
    }
}

impl RenderAdapter for CanvasAdapter<'_> {
    fn start_new_page(&mut self) -> Result<()> {
        self.canvas.show_page();
        Ok(())
    }

    fn finalize_page(&mut self) -> Result<()> {
        if let Some(callback) = self.on_page.clone() {
            let context = DocContext::new(self.canvas.page_number(), self.canvas.page_size());
            self.canvas.save_state();
            callback(&mut self.canvas, &context);
            self.canvas.restore_state();
        }
        Ok(())
    }

    fn draw_cell(&mut self, bounds: Rect, cell: &Cell, style: &ResolvedCellStyle) -> Result<()> {
        self.canvas.save_state();
        if let Some(background) = style.background_color {
            self.canvas.set_fill_color(background);
            let top = self.top(bounds.y);
            self.canvas
                .draw_rect(bounds.x, top, bounds.width, bounds.height);
        }
        self.draw_text(bounds.inset(style.padding), &cell.content, style);
        self.canvas.restore_state();
        Ok(())
    }

    fn draw_filled_rect(&mut self, bounds: Rect, color: Color) -> Result<()> {
        self.canvas.save_state();
        self.canvas.set_fill_color(color);
        let top = self.top(bounds.y);
        self.canvas
            .draw_rect(bounds.x, top, bounds.width, bounds.height);
        self.canvas.restore_state();
        Ok(())
    }

    fn draw_border(&mut self, bounds: Rect, color: Color, width: Pt) -> Result<()> {
        if width <= Pt::ZERO {
            return Ok(());
        }
        self.canvas.save_state();
        self.canvas.set_stroke_color(color);
        self.canvas.set_line_width(width);
        let top = self.top(bounds.y);
        self.canvas
            .stroke_rect(bounds.x, top, bounds.width, bounds.height);
        self.canvas.restore_state();
        Ok(())
    }
}
