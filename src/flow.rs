use crate::debug::DebugLogger;
use crate::error::Result;
use crate::metrics::LayoutMetrics;
use crate::normalize::normalize_table;
use crate::options::{LayoutOptions, OptionOverrides, resolve};
use crate::render::{RenderAdapter, ResolvedCellStyle};
use crate::table::{Cell, ContentBlock, Row, RowType, TableSpec};
use crate::text::TextMetrics;
use crate::types::{Pt, Rect};
use crate::widths::solve_column_widths;
use serde_json::json;
use std::time::Instant;

/// Extra height added to titles and rows so text never touches the border.
const SAFETY_MARGIN: i32 = 2;

/// Current write position in layout space (`y` is the top of the next item).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub x: Pt,
    pub y: Pt,
}

#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub cursor: Cursor,
    pub metrics: LayoutMetrics,
}

/// Where layout picks up again after a page break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    /// The table start did not fit; begin it on the new page.
    Table,
    /// A block's headings and first row did not fit.
    BlockAnchor,
    /// A data row did not fit; it is drawn right after the break.
    Row,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    StartTable,
    WriteTitle,
    WriteHeadings,
    WriteRow,
    PageBreak(Resume),
    Done,
}

struct PreparedBlock {
    block: ContentBlock,
    options: LayoutOptions,
    widths: Vec<Pt>,
}

struct PreparedTable {
    title: Option<String>,
    options: LayoutOptions,
    blocks: Vec<PreparedBlock>,
}

/// Lays out `tables` starting on the render target's current page and
/// returns where writing stopped.
pub fn layout_tables(
    tables: &[TableSpec],
    options: &OptionOverrides,
    metrics: &dyn TextMetrics,
    render: &mut dyn RenderAdapter,
) -> Result<Cursor> {
    let defaults = resolve(&LayoutOptions::default(), Some(options), None)?;
    let outcome = FlowController::new(&defaults, metrics, render).run(tables)?;
    Ok(outcome.cursor)
}

/// Height of a title set across the full table width.
pub fn title_height(title: Option<&str>, options: &LayoutOptions, metrics: &dyn TextMetrics) -> Pt {
    let Some(title) = title else {
        return Pt::ZERO;
    };
    metrics.measure_wrap_height_breaking(
        title,
        options.table_width,
        &options.title.font,
        &options.break_for_min_width_on,
    )
        + options.padding * 2
        + options.title.padding * 2
        + Pt::from_i32(SAFETY_MARGIN)
}

/// Height of the tallest cell in `row`; absent cells count as empty.
pub fn row_height(
    row: &Row,
    row_type: RowType,
    widths: &[Pt],
    options: &LayoutOptions,
    metrics: &dyn TextMetrics,
) -> Pt {
    if row.is_empty() {
        return Pt::ZERO;
    }
    let style = options.row_style(row_type);
    let tallest = row
        .iter()
        .enumerate()
        .filter_map(|(column, cell)| cell.as_ref().map(|cell| (column, cell)))
        .map(|(column, cell)| {
            let font = cell.font.as_ref().unwrap_or(&style.font);
            let width = widths.get(column).copied().unwrap_or(Pt::ZERO) - options.padding * 2;
            metrics.measure_wrap_height_breaking(
                &cell.content,
                width.max(Pt::ZERO),
                font,
                &options.break_for_min_width_on,
            )
        })
        .max()
        .unwrap_or(Pt::ZERO);
    tallest + options.padding * 2 + Pt::from_i32(SAFETY_MARGIN)
}

/// Pagination state machine. Every table is normalized, resolved and
/// measured before the first drawing call, so configuration and width errors
/// abort the batch without touching the render target.
pub struct FlowController<'a> {
    defaults: &'a LayoutOptions,
    metrics: &'a dyn TextMetrics,
    render: &'a mut dyn RenderAdapter,
    debug: Option<DebugLogger>,
    tables: Vec<PreparedTable>,
    table_index: usize,
    block_index: usize,
    row_index: usize,
    cursor: Cursor,
    // Set by a break, cleared by any emission. The caller's initial page is
    // never considered fresh.
    page_fresh: bool,
    stats: LayoutMetrics,
}

impl<'a> FlowController<'a> {
    pub fn new(
        defaults: &'a LayoutOptions,
        metrics: &'a dyn TextMetrics,
        render: &'a mut dyn RenderAdapter,
    ) -> Self {
        Self {
            defaults,
            metrics,
            render,
            debug: None,
            tables: Vec::new(),
            table_index: 0,
            block_index: 0,
            row_index: 0,
            cursor: Cursor {
                x: defaults.x_start,
                y: defaults.y_initial.unwrap_or(defaults.y_start),
            },
            page_fresh: false,
            stats: LayoutMetrics::new(),
        }
    }

    pub fn with_debug(mut self, debug: Option<DebugLogger>) -> Self {
        self.debug = debug;
        self
    }

    pub fn run(mut self, tables: &[TableSpec]) -> Result<FlowOutcome> {
        let started = Instant::now();
        self.tables = self.prepare(tables)?;
        let mut state = State::StartTable;
        while state != State::Done {
            state = self.step(state)?;
        }
        self.render.finalize_page()?;
        self.stats.total_layout_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some(logger) = &self.debug {
            logger.emit_summary("layout");
        }
        Ok(FlowOutcome {
            cursor: self.cursor,
            metrics: self.stats,
        })
    }

    fn prepare(&self, tables: &[TableSpec]) -> Result<Vec<PreparedTable>> {
        let mut prepared = Vec::with_capacity(tables.len());
        for (table_index, table) in tables.iter().enumerate() {
            let options = resolve(self.defaults, Some(&table.options), None)?;
            let mut blocks = Vec::new();
            for (block_index, block) in normalize_table(table)?.into_iter().enumerate() {
                let block_options =
                    resolve(self.defaults, Some(&table.options), Some(&block.options))?;
                let widths = solve_column_widths(&block, &block_options, self.metrics)?;
                log::trace!("table {table_index} block {block_index}: widths {widths:?}");
                if let Some(logger) = &self.debug {
                    logger.log_event(&json!({
                        "type": "layout.widths",
                        "table": table_index,
                        "block": block_index,
                        "table_width": block_options.table_width.to_f32(),
                        "widths": widths.iter().map(|w| w.to_f32()).collect::<Vec<_>>(),
                    }));
                }
                blocks.push(PreparedBlock {
                    block,
                    options: block_options,
                    widths,
                });
            }
            prepared.push(PreparedTable {
                title: table.title.clone(),
                options,
                blocks,
            });
        }
        Ok(prepared)
    }

    fn step(&mut self, state: State) -> Result<State> {
        match state {
            State::StartTable => self.start_table(),
            State::WriteTitle => {
                self.write_title(false)?;
                Ok(State::WriteHeadings)
            }
            State::WriteHeadings => {
                if !self.fits(self.anchor_height()) {
                    return Ok(State::PageBreak(Resume::BlockAnchor));
                }
                self.write_row(RowType::Heading)?;
                Ok(State::WriteRow)
            }
            State::WriteRow => self.next_row(),
            State::PageBreak(resume) => self.page_break(resume),
            State::Done => Ok(State::Done),
        }
    }

    fn start_table(&mut self) -> Result<State> {
        let Some(table) = self.tables.get(self.table_index) else {
            return Ok(State::Done);
        };
        self.block_index = 0;
        self.row_index = 0;
        self.cursor.x = table.options.x_start;
        self.stats.tables += 1;
        if self.table_index > 0 && table.options.page_break_on_new_table && !self.page_fresh {
            return Ok(State::PageBreak(Resume::Table));
        }
        let required = title_height(table.title.as_deref(), &table.options, self.metrics)
            + self.anchor_height();
        if !self.fits(required) {
            return Ok(State::PageBreak(Resume::Table));
        }
        Ok(State::WriteTitle)
    }

    fn next_row(&mut self) -> Result<State> {
        let Some(prepared) = self.current_block() else {
            return Ok(self.finish_table());
        };
        let Some(row) = prepared.block.rows.get(self.row_index) else {
            self.block_index += 1;
            self.row_index = 0;
            if self.current_block().is_none() {
                return Ok(self.finish_table());
            }
            return Ok(State::WriteHeadings);
        };
        let height = row_height(
            row,
            RowType::Row,
            &prepared.widths,
            &prepared.options,
            self.metrics,
        );
        if height > Pt::ZERO && !self.fits(height) {
            return Ok(State::PageBreak(Resume::Row));
        }
        self.write_row(RowType::Row)?;
        self.row_index += 1;
        Ok(State::WriteRow)
    }

    fn finish_table(&mut self) -> State {
        if let Some(table) = self.tables.get(self.table_index) {
            self.cursor.y -= table.options.spacing;
        }
        self.table_index += 1;
        State::StartTable
    }

    fn page_break(&mut self, resume: Resume) -> Result<State> {
        if self.page_fresh {
            // Nothing is on this page yet, so another break cannot help.
            log::warn!(
                "table {} block {} row {}: content taller than the page, placing it overfull",
                self.table_index,
                self.block_index,
                self.row_index
            );
            self.stats.current_page().overfull += 1;
        } else {
            self.break_page(resume)?;
        }

        let (show_title, show_headings) = match self.current_block() {
            Some(prepared) => (
                prepared.options.show_title_after_page_break,
                prepared.options.show_headings_after_page_break,
            ),
            None => (false, false),
        };
        match resume {
            Resume::Table => Ok(State::WriteTitle),
            Resume::BlockAnchor => {
                if show_title {
                    self.write_title(true)?;
                }
                self.write_row(RowType::Heading)?;
                Ok(State::WriteRow)
            }
            Resume::Row => {
                if show_title {
                    self.write_title(true)?;
                }
                if show_headings {
                    self.write_row(RowType::Heading)?;
                }
                self.write_row(RowType::Row)?;
                self.row_index += 1;
                Ok(State::WriteRow)
            }
        }
    }

    fn break_page(&mut self, resume: Resume) -> Result<()> {
        let from_page = self.stats.pages.len();
        self.render.finalize_page()?;
        self.render.start_new_page()?;
        self.stats.start_page();
        let options = self
            .current_block()
            .map(|prepared| &prepared.options)
            .unwrap_or(self.defaults);
        let top = Cursor {
            x: options.x_start,
            y: options.y_start,
        };
        self.cursor = top;
        self.page_fresh = true;
        log::debug!(
            "page break {from_page} -> {} before {resume:?} (table {}, block {}, row {})",
            from_page + 1,
            self.table_index,
            self.block_index,
            self.row_index
        );
        if let Some(logger) = &self.debug {
            logger.log_event(&json!({
                "type": "layout.page_break",
                "reason": format!("{resume:?}"),
                "from_page": from_page,
                "to_page": from_page + 1,
                "table": self.table_index,
                "block": self.block_index,
                "row": self.row_index,
            }));
            logger.increment("layout.page_break", 1);
        }
        Ok(())
    }

    fn current_block(&self) -> Option<&PreparedBlock> {
        self.tables
            .get(self.table_index)
            .and_then(|table| table.blocks.get(self.block_index))
    }

    /// Headings plus the first data row of the current block.
    fn anchor_height(&self) -> Pt {
        let Some(prepared) = self.current_block() else {
            return Pt::ZERO;
        };
        let block = &prepared.block;
        let first_row = block.rows.first().map(|row| {
            row_height(row, RowType::Row, &prepared.widths, &prepared.options, self.metrics)
        });
        row_height(
            &block.headings,
            RowType::Heading,
            &prepared.widths,
            &prepared.options,
            self.metrics,
        ) + first_row.unwrap_or(Pt::ZERO)
    }

    fn fits(&self, height: Pt) -> bool {
        let y_end = self
            .current_block()
            .map(|prepared| prepared.options.y_end)
            .unwrap_or(self.defaults.y_end);
        self.cursor.y - height >= y_end
    }

    /// Draws the table title. The first title uses the table's own options,
    /// which is what `start_table` measured; a title repeated after a break
    /// takes the options of the block it heads.
    fn write_title(&mut self, repeat: bool) -> Result<()> {
        let Some(table) = self.tables.get(self.table_index) else {
            return Ok(());
        };
        let Some(title) = table.title.as_deref() else {
            return Ok(());
        };
        let options = match table.blocks.get(self.block_index) {
            Some(prepared) if repeat => &prepared.options,
            _ => &table.options,
        };
        let height = title_height(Some(title), options, self.metrics);
        let bounds = Rect::new(self.cursor.x, self.cursor.y, options.table_width, height);
        let cell = Cell::new(title);
        self.render
            .draw_cell(bounds, &cell, &ResolvedCellStyle::for_title(options))?;
        self.render
            .draw_border(bounds, options.border_color, options.border_width)?;
        self.cursor.y -= height;
        self.page_fresh = false;
        self.stats.current_page().titles += 1;
        Ok(())
    }

    fn write_row(&mut self, row_type: RowType) -> Result<()> {
        let Some(prepared) = self
            .tables
            .get(self.table_index)
            .and_then(|table| table.blocks.get(self.block_index))
        else {
            return Ok(());
        };
        let row = match row_type {
            RowType::Heading => Some(&prepared.block.headings),
            RowType::Row => prepared.block.rows.get(self.row_index),
        };
        let Some(row) = row.filter(|row| !row.is_empty()) else {
            return Ok(());
        };
        let options = &prepared.options;
        let height = row_height(row, row_type, &prepared.widths, options, self.metrics);
        let style = options.row_style(row_type);
        let mut x = self.cursor.x;
        for (column, cell) in row.iter().enumerate() {
            let width = prepared.widths.get(column).copied().unwrap_or(Pt::ZERO);
            let bounds = Rect::new(x, self.cursor.y, width, height);
            match cell {
                Some(cell) => {
                    let resolved = ResolvedCellStyle::for_cell(cell, column, row_type, options);
                    self.render.draw_cell(bounds, cell, &resolved)?;
                }
                None => self.render.draw_filled_rect(bounds, style.blackout_color)?,
            }
            self.render
                .draw_border(bounds, options.border_color, options.border_width)?;
            x += width;
        }
        self.cursor.y -= height;
        self.page_fresh = false;
        let page = self.stats.current_page();
        match row_type {
            RowType::Heading => page.heading_rows += 1,
            RowType::Row => page.rows += 1,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::capture::SharedBuffer;
    use crate::error::TableError;
    use crate::table::row;
    use crate::testutil::{Event, RecordingAdapter};
    use crate::text::FixedAdvanceMetrics;
    use crate::types::Color;
    use serde_json::json;

    // Helvetica 6pt under FixedAdvanceMetrics: 3pt per character, 7.2pt per
    // line, so a one-line row is 9.2pt and an 18pt title is 23.6pt.
    fn small_page(extra: serde_json::Value) -> OptionOverrides {
        let mut value = json!({"page_width": 200, "page_height": 100});
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        OptionOverrides::from_json(&value).unwrap()
    }

    fn run(tables: &[TableSpec], options: &OptionOverrides) -> (Result<Cursor>, RecordingAdapter) {
        let metrics = FixedAdvanceMetrics::default();
        let mut render = RecordingAdapter::default();
        let result = layout_tables(tables, options, &metrics, &mut render);
        (result, render)
    }

    fn long_table(rows: usize) -> TableSpec {
        TableSpec::titled(
            "T",
            vec![ContentBlock::new(
                row(["h"]),
                (0..rows).map(|_| row(["r"])).collect(),
            )],
        )
    }

    fn mm(milli: i64) -> Pt {
        Pt::from_milli_i64(milli)
    }

    #[test]
    fn oversized_first_row_breaks_exactly_once() {
        let tall = vec!["a"; 84].join("\n");
        let table = TableSpec::new(vec![ContentBlock::new(Vec::new(), vec![row([tall])])]);
        let options = OptionOverrides::from_json(&json!({"page_width": 200, "page_height": 500}))
            .unwrap();
        let (result, render) = run(&[table], &options);
        let cursor = result.unwrap();

        assert_eq!(render.count(&Event::StartPage), 1);
        let start = render
            .events
            .iter()
            .position(|e| *e == Event::StartPage)
            .unwrap();
        let first_cell = render
            .events
            .iter()
            .position(|e| matches!(e, Event::Cell { .. }))
            .unwrap();
        assert!(start < first_cell);
        assert!(cursor.y < Pt::ZERO, "row is placed overfull");
        assert_eq!(render.events.last(), Some(&Event::FinalizePage));
    }

    #[test]
    fn title_and_headings_repeat_after_breaks() {
        let (result, render) = run(&[long_table(20)], &small_page(json!({})));
        result.unwrap();
        let pages = render.count(&Event::StartPage) + 1;
        assert_eq!(pages, 3);
        let cells = render.cells();
        assert_eq!(cells.iter().filter(|c| **c == "T").count(), pages);
        assert_eq!(cells.iter().filter(|c| **c == "h").count(), pages);
        assert_eq!(cells.iter().filter(|c| **c == "r").count(), 20);
        // Page 1: title to 76.4, headings to 67.2, then seven rows.
        let tops = render.tops_per_page();
        assert_eq!(tops[0].len(), 1 + 1 + 7);
        assert_eq!(tops[0][2], mm(67_200));
    }

    #[test]
    fn reprints_follow_the_flags() {
        let options = small_page(json!({
            "show_title_after_page_break": false,
            "show_headings_after_page_break": false
        }));
        let (result, render) = run(&[long_table(20)], &options);
        result.unwrap();
        let cells = render.cells();
        assert_eq!(cells.iter().filter(|c| **c == "T").count(), 1);
        assert_eq!(cells.iter().filter(|c| **c == "h").count(), 1);
        assert_eq!(cells.iter().filter(|c| **c == "r").count(), 20);
    }

    #[test]
    fn cursor_only_moves_down_between_breaks() {
        let (result, render) = run(&[long_table(40), long_table(5)], &small_page(json!({})));
        result.unwrap();
        for (page, tops) in render.tops_per_page().iter().enumerate() {
            if page > 0 {
                assert_eq!(tops.first(), Some(&Pt::from_i32(100)), "page {page}");
            }
            // Cells of one row share a top; rows strictly descend.
            assert!(tops.windows(2).all(|pair| pair[1] <= pair[0]), "page {page}");
            let mut distinct = tops.clone();
            distinct.dedup();
            assert!(distinct.windows(2).all(|pair| pair[1] < pair[0]));
        }
    }

    #[test]
    fn final_page_is_finalized_exactly_once() {
        let (result, render) = run(&[long_table(20)], &small_page(json!({})));
        result.unwrap();
        let starts = render.count(&Event::StartPage);
        assert_eq!(render.count(&Event::FinalizePage), starts + 1);
        assert_eq!(render.events.last(), Some(&Event::FinalizePage));
        assert!(
            render
                .events
                .windows(2)
                .all(|pair| pair != [Event::StartPage, Event::StartPage])
        );
    }

    #[test]
    fn spacing_separates_tables_and_cursor_is_returned() {
        let table = TableSpec::new(vec![ContentBlock::new(Vec::new(), vec![row(["x"])])]);
        let options = small_page(json!({"spacing": 5}));
        let (result, render) = run(&[table.clone(), table], &options);
        assert_eq!(result.unwrap(), Cursor { x: Pt::ZERO, y: mm(71_600) });
        assert_eq!(render.count(&Event::StartPage), 0);
    }

    #[test]
    fn initial_y_and_page_break_on_new_table() {
        let table = TableSpec::new(vec![ContentBlock::new(Vec::new(), vec![row(["x"])])]);
        let options = small_page(json!({"y_initial": 50, "page_break_on_new_table": true}));
        let (result, render) = run(&[table.clone(), table], &options);
        let tops = render.tops_per_page();
        assert_eq!(tops, vec![vec![Pt::from_i32(50)], vec![Pt::from_i32(100)]]);
        assert_eq!(result.unwrap().y, mm(90_800));
    }

    #[test]
    fn absent_cells_are_blacked_out_with_the_row_type_color() {
        let table = TableSpec::new(vec![ContentBlock::new(
            vec![Some(Cell::new("a")), None],
            vec![vec![None, Some(Cell::new("b"))]],
        )]);
        let options = small_page(json!({"headings_blackout_color": "#ff0000"}));
        let (result, render) = run(&[table], &options);
        result.unwrap();
        let fills: Vec<Color> = render
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Fill { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![Color::rgb(1.0, 0.0, 0.0), Color::cmyk(0.0, 0.0, 0.0, 70.0)]);
    }

    #[test]
    fn first_title_uses_table_options_and_repeats_use_block_options() {
        let block = ContentBlock::new(row(["h"]), (0..20).map(|_| row(["r"])).collect())
            .with_options(OptionOverrides::from_json(&json!({"title_padding": 10})).unwrap());
        let table = TableSpec::titled("T", vec![block]);
        let options = small_page(json!({}));
        let (result, render) = run(std::slice::from_ref(&table), &options);
        result.unwrap();

        let metrics = FixedAdvanceMetrics::default();
        let defaults = resolve(&LayoutOptions::default(), Some(&options), None).unwrap();
        let table_options = resolve(&defaults, Some(&table.options), None).unwrap();
        let block_options =
            resolve(&defaults, Some(&table.options), Some(&table.contents[0].options)).unwrap();
        let first = title_height(Some("T"), &table_options, &metrics);
        let repeated = title_height(Some("T"), &block_options, &metrics);
        assert_eq!((first, repeated), (mm(23_600), mm(43_600)));

        let heights: Vec<Pt> = render
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Cell { bounds, content, .. } if content == "T" => Some(bounds.height),
                _ => None,
            })
            .collect();
        assert!(heights.len() >= 2, "{heights:?}");
        assert_eq!(heights[0], first);
        assert!(heights[1..].iter().all(|h| *h == repeated), "{heights:?}");
    }

    #[test]
    fn block_options_do_not_leak_into_sibling_blocks() {
        let styled = ContentBlock::new(Vec::new(), vec![row(["a"])])
            .with_options(OptionOverrides::from_json(&json!({"row_text_color_default": "#ff0000"})).unwrap());
        let plain = ContentBlock::new(Vec::new(), vec![row(["b", "c"])]);
        let (result, render) = run(&[TableSpec::new(vec![styled, plain])], &small_page(json!({})));
        result.unwrap();
        let colors: Vec<(String, Color)> = render
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Cell { content, style, .. } => Some((content.clone(), style.text_color)),
                _ => None,
            })
            .collect();
        assert_eq!(colors[0], ("a".to_string(), Color::rgb(1.0, 0.0, 0.0)));
        assert_eq!(colors[1], ("b".to_string(), Color::BLACK));
        // The second block is sized for two columns over the same width.
        let widths: Vec<Pt> = render
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Border { bounds } => Some(bounds.width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![Pt::from_i32(200), Pt::from_i32(100), Pt::from_i32(100)]);
    }

    #[test]
    fn errors_abort_before_anything_is_drawn() {
        let good = long_table(3);
        let bad = TableSpec::new(vec![ContentBlock::new(row(["a", "b", "c"]), vec![row(["1", "2"])])]);
        let (result, render) = run(&[good.clone(), bad], &small_page(json!({})));
        assert!(matches!(result, Err(TableError::ColumnMismatch { .. })));
        assert!(render.events.is_empty());

        let too_wide = TableSpec::new(vec![ContentBlock::new(Vec::new(), vec![row([
            "abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyz",
        ])])]);
        let (result, render) = run(&[good, too_wide], &small_page(json!({})));
        assert!(matches!(result, Err(TableError::LayoutOverflow { .. })));
        assert!(render.events.is_empty());
    }

    #[test]
    fn page_breaks_are_traced_and_counted() {
        let sink = SharedBuffer::default();
        let logger = DebugLogger::from_writer(sink.clone());
        let defaults = resolve(&LayoutOptions::default(), Some(&small_page(json!({}))), None).unwrap();
        let metrics = FixedAdvanceMetrics::default();
        let mut render = RecordingAdapter::default();
        let outcome = FlowController::new(&defaults, &metrics, &mut render)
            .with_debug(Some(logger))
            .run(&[long_table(20)])
            .unwrap();

        assert_eq!(outcome.metrics.page_breaks, 2);
        assert_eq!(outcome.metrics.pages.len(), 3);
        assert_eq!(outcome.metrics.total_rows(), 20);
        assert_eq!(outcome.metrics.pages[1].titles, 1);

        let lines = sink.lines();
        let breaks: Vec<&serde_json::Value> = lines
            .iter()
            .filter(|l| l["type"] == "layout.page_break")
            .collect();
        assert_eq!(breaks.len(), 2);
        assert_eq!(breaks[0]["reason"], "Row");
        assert_eq!(breaks[1]["to_page"], 3);
        let summary = lines.last().unwrap();
        assert_eq!(summary["type"], "debug.summary");
        assert_eq!(summary["counts"]["layout.page_break"], 2);
    }
}
