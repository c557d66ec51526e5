mod canvas;
mod debug;
mod doc_context;
mod error;
mod flow;
mod font;
mod json;
mod metrics;
mod normalize;
mod options;
mod pdf;
mod render;
mod table;
#[cfg(test)]
mod testutil;
mod text;
mod types;
mod widths;

pub use canvas::{Canvas, Command, Document, Page};
pub use debug::DebugLogger;
pub use doc_context::DocContext;
pub use error::{Result, TableError};
pub use flow::{Cursor, FlowController, FlowOutcome, layout_tables, row_height, title_height};
pub use font::FontRegistry;
pub use json::{parse_cell, parse_table, parse_tables, tables_from_str};
pub use metrics::{LayoutMetrics, PageMetrics};
pub use normalize::{normalize_blocks, normalize_table};
pub use options::{
    ColumnWidthRestrictions, LayoutOptions, OptionOverrides, RowStyle, TitleStyle, resolve,
};
pub use pdf::document_to_pdf;
pub use render::{CanvasAdapter, OnPageCallback, RenderAdapter, ResolvedCellStyle};
pub use table::{Cell, ContentBlock, Row, RowType, TableSpec, TextAlign, row};
pub use text::{FixedAdvanceMetrics, FontSpec, FontStyle, TextMetrics, wrap_lines};
pub use types::{Color, Margins, Pt, Rect, Size};
pub use widths::{NaturalWidths, fit_widths, natural_widths, solve_column_widths};

use std::path::PathBuf;
use std::sync::Arc;

/// Lays out tables onto pages and writes them as PDF.
///
/// Built once with [`TableRendererBuilder`]; every render starts a fresh
/// document from the same resolved defaults.
pub struct TableRenderer {
    defaults: LayoutOptions,
    font_registry: Arc<FontRegistry>,
    on_page: Option<OnPageCallback>,
    debug: Option<DebugLogger>,
}

pub struct TableRendererBuilder {
    page_size: Option<Size>,
    margins: Option<Margins>,
    margin_all: Option<Pt>,
    font_dirs: Vec<PathBuf>,
    font_files: Vec<PathBuf>,
    font_bytes: Vec<(Vec<u8>, String)>,
    overrides: OptionOverrides,
    on_page: Option<OnPageCallback>,
    debug_path: Option<PathBuf>,
}

impl TableRenderer {
    pub fn builder() -> TableRendererBuilder {
        TableRendererBuilder::new()
    }

    /// Options every table starts from before its own overrides.
    pub fn defaults(&self) -> &LayoutOptions {
        &self.defaults
    }

    pub fn font_registry(&self) -> &FontRegistry {
        &self.font_registry
    }

    pub fn page_size(&self) -> Size {
        Size {
            width: self.defaults.page_width,
            height: self.defaults.page_height,
        }
    }

    /// Runs layout against a caller-supplied render target. The target is
    /// assumed to be positioned on its first page.
    pub fn layout_into(
        &self,
        tables: &[TableSpec],
        render: &mut dyn RenderAdapter,
    ) -> Result<FlowOutcome> {
        let outcome = FlowController::new(&self.defaults, &*self.font_registry, render)
            .with_debug(self.debug.clone())
            .run(tables)?;
        if let Some(debug) = &self.debug {
            debug.flush();
        }
        Ok(outcome)
    }

    pub fn render_tables(&self, tables: &[TableSpec]) -> Result<(Document, LayoutMetrics)> {
        let metrics: &dyn TextMetrics = &*self.font_registry;
        let mut adapter =
            CanvasAdapter::new(self.page_size(), metrics).with_on_page(self.on_page.clone());
        let outcome = self.layout_into(tables, &mut adapter)?;
        log::debug!(
            "laid out {} tables on {} pages in {:.2}ms",
            outcome.metrics.tables,
            outcome.metrics.pages.len(),
            outcome.metrics.total_layout_ms
        );
        Ok((adapter.into_document(), outcome.metrics))
    }

    pub fn render_tables_to_pdf(&self, tables: &[TableSpec]) -> Result<Vec<u8>> {
        let (document, _) = self.render_tables(tables)?;
        document_to_pdf(&document)
    }

    /// Parses a loose JSON description (one table or an array) and lays it out.
    pub fn render_json(&self, input: &str) -> Result<(Document, LayoutMetrics)> {
        let tables = tables_from_str(input)?;
        self.render_tables(&tables)
    }

    pub fn render_json_to_pdf(&self, input: &str) -> Result<Vec<u8>> {
        let (document, _) = self.render_json(input)?;
        document_to_pdf(&document)
    }

    pub fn render_tables_to_file(
        &self,
        tables: &[TableSpec],
        path: impl AsRef<std::path::Path>,
    ) -> Result<usize> {
        let bytes = self.render_tables_to_pdf(tables)?;
        std::fs::write(path, &bytes)?;
        Ok(bytes.len())
    }
}

impl Default for TableRendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRendererBuilder {
    pub fn new() -> Self {
        Self {
            page_size: None,
            margins: None,
            margin_all: None,
            font_dirs: Vec::new(),
            font_files: Vec::new(),
            font_bytes: Vec::new(),
            overrides: OptionOverrides::default(),
            on_page: None,
            debug_path: None,
        }
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Per-side table margins, added to the scalar margin.
    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = Some(margins);
        self
    }

    pub fn margin_all(mut self, value: f32) -> Self {
        self.margin_all = Some(Pt::from_f32(value));
        self
    }

    pub fn register_font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn register_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_files.push(path.into());
        self
    }

    pub fn register_font_bytes(mut self, data: Vec<u8>, name: impl Into<String>) -> Self {
        self.font_bytes.push((data, name.into()));
        self
    }

    /// Base option overrides applied under every table's own options. Values
    /// set here win over `page_size` and the margin setters.
    pub fn options(mut self, overrides: OptionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Hook run as each page is finalized, e.g. for headers and footers.
    pub fn on_page<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Canvas, &DocContext) + Send + Sync + 'static,
    {
        self.on_page = Some(Arc::new(callback));
        self
    }

    // JSON-lines trace of width solves and page breaks.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<TableRenderer> {
        let mut overrides = self.overrides;
        if let Some(size) = self.page_size {
            overrides.page_width.get_or_insert(size.width);
            overrides.page_height.get_or_insert(size.height);
        }
        if let Some(margin) = self.margin_all {
            overrides.table_margin.get_or_insert(margin);
        }
        if let Some(margins) = self.margins {
            overrides.table_margin_left.get_or_insert(margins.left);
            overrides.table_margin_right.get_or_insert(margins.right);
            overrides.table_margin_top.get_or_insert(margins.top);
            overrides.table_margin_bottom.get_or_insert(margins.bottom);
        }
        let defaults = resolve(&LayoutOptions::default(), Some(&overrides), None)?;

        let mut registry = FontRegistry::new();
        for dir in &self.font_dirs {
            registry.register_dir(dir)?;
        }
        for file in &self.font_files {
            registry.register_file(file)?;
        }
        for (data, name) in &self.font_bytes {
            registry.register_bytes(data, Some(name.as_str()))?;
        }

        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(TableRenderer {
            defaults,
            font_registry: Arc::new(registry),
            on_page: self.on_page,
            debug,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn numbered_rows(count: usize) -> Vec<Row> {
        (0..count).map(|i| row([format!("r{i}")])).collect()
    }

    fn small_renderer() -> TableRendererBuilder {
        TableRenderer::builder().page_size(Size::new(200.0, 100.0))
    }

    #[test]
    fn pdf_pages_follow_layout_pages() {
        let renderer = small_renderer().build().unwrap();
        let tables = vec![TableSpec::new(vec![ContentBlock::new(
            Vec::new(),
            numbered_rows(20),
        )])];
        let (document, metrics) = renderer.render_tables(&tables).unwrap();
        assert_eq!(metrics.pages.len(), 2);
        assert_eq!(document.pages.len(), 2);
        assert_eq!(metrics.total_rows(), 20);

        let bytes = renderer.render_tables_to_pdf(&tables).unwrap();
        let reloaded = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }

    #[test]
    fn page_hook_runs_once_per_page() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let renderer = small_renderer()
            .on_page(move |canvas, ctx| {
                canvas.draw_string(Pt::ZERO, Pt::ZERO, format!("- {} -", ctx.page_number));
                if let Ok(mut pages) = sink.lock() {
                    pages.push(ctx.page_number);
                }
            })
            .build()
            .unwrap();
        let tables = vec![TableSpec::titled(
            "Ledger",
            vec![ContentBlock::new(row(["n"]), numbered_rows(30))],
        )];
        let (document, _) = renderer.render_tables(&tables).unwrap();
        let pages = seen.lock().unwrap().clone();
        assert_eq!(pages, (1..=document.pages.len()).collect::<Vec<_>>());
        assert!(pages.len() > 1);
    }

    #[test]
    fn json_input_reports_shape_and_column_errors() {
        let renderer = small_renderer().build().unwrap();
        let err = renderer
            .render_json(r#"{"contents": {"rows": "nope"}}"#)
            .unwrap_err();
        assert!(matches!(err, TableError::InvalidTable(_)));

        let err = renderer
            .render_json(
                r#"{"title": "Totals",
                    "contents": {"headings": ["a", "b"], "rows": [["1", "2"], ["3"]]}}"#,
            )
            .unwrap_err();
        assert!(matches!(err, TableError::ColumnMismatch { expected: 2, found: 1, .. }));

        let bytes = renderer
            .render_json_to_pdf(r#"[{"title": 2024, "contents": [{"rows": [["a", null]]}]}]"#)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }

    #[test]
    fn margins_feed_the_default_geometry() {
        let renderer = small_renderer()
            .margin_all(10.0)
            .margins(Margins {
                top: Pt::ZERO,
                right: Pt::ZERO,
                bottom: Pt::ZERO,
                left: Pt::from_i32(5),
            })
            .build()
            .unwrap();
        let defaults = renderer.defaults();
        assert_eq!(defaults.x_start, Pt::from_i32(15));
        assert_eq!(defaults.table_width, Pt::from_i32(175));
        assert_eq!(defaults.y_start, Pt::from_i32(90));
        assert_eq!(defaults.y_end, Pt::from_i32(10));
    }

    #[test]
    fn explicit_options_win_over_builder_geometry() {
        let overrides = OptionOverrides::from_json(&serde_json::json!({
            "page_width": 300,
            "table_margin": 0
        }))
        .unwrap();
        let renderer = small_renderer()
            .margin_all(20.0)
            .options(overrides)
            .build()
            .unwrap();
        assert_eq!(renderer.page_size().width, Pt::from_i32(300));
        assert_eq!(renderer.defaults().table_width, Pt::from_i32(300));
    }

    #[test]
    fn build_rejects_margins_wider_than_the_page() {
        let err = small_renderer().margin_all(120.0).build().err().unwrap();
        assert!(matches!(err, TableError::InvalidConfiguration(_)));
    }

    #[test]
    fn debug_log_records_page_breaks() {
        let path = std::env::temp_dir().join(format!(
            "tableflow-debug-{}.jsonl",
            std::process::id()
        ));
        let renderer = small_renderer().debug_log(&path).build().unwrap();
        let tables = vec![TableSpec::new(vec![ContentBlock::new(
            Vec::new(),
            numbered_rows(20),
        )])];
        renderer.render_tables(&tables).unwrap();
        let log = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        let lines: Vec<serde_json::Value> = log
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let breaks = lines
            .iter()
            .filter(|line| line["type"] == "layout.page_break")
            .count();
        assert_eq!(breaks, 1);
        let summary = lines.last().unwrap();
        assert_eq!(summary["type"], "debug.summary");
        assert_eq!(summary["counts"]["layout.page_break"], 1);
    }
}
