use crate::options::OptionOverrides;
use crate::text::FontSpec;
use crate::types::Color;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Which style family a row draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowType {
    Heading,
    Row,
}

/// One table cell. Unset fields fall back to the row-type defaults of the
/// effective options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub content: String,
    pub text_color: Option<Color>,
    pub background_color: Option<Color>,
    pub font: Option<FontSpec>,
    pub align: Option<TextAlign>,
}

impl Cell {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn background_color(mut self, color: Color) -> Self {
        self.background_color = Some(color);
        self
    }

    pub fn font(mut self, font: FontSpec) -> Self {
        self.font = Some(font);
        self
    }

    pub fn align(mut self, align: TextAlign) -> Self {
        self.align = Some(align);
        self
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::new(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::new(value)
    }
}

/// A row of cells; `None` marks an absent value that is drawn blacked out.
pub type Row = Vec<Option<Cell>>;

/// Builds a row where every value is present.
pub fn row<I, C>(cells: I) -> Row
where
    I: IntoIterator<Item = C>,
    C: Into<Cell>,
{
    cells.into_iter().map(|cell| Some(cell.into())).collect()
}

/// One headings + rows unit. A table holds several blocks when its column
/// layout changes part way through.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentBlock {
    pub headings: Row,
    pub rows: Vec<Row>,
    pub options: OptionOverrides,
}

impl ContentBlock {
    pub fn new(headings: Row, rows: Vec<Row>) -> Self {
        Self {
            headings,
            rows,
            options: OptionOverrides::default(),
        }
    }

    pub fn with_options(mut self, options: OptionOverrides) -> Self {
        self.options = options;
        self
    }

    /// Widest row in the block, headings included.
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headings.len()))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSpec {
    pub title: Option<String>,
    pub contents: Vec<ContentBlock>,
    pub options: OptionOverrides,
}

impl TableSpec {
    pub fn new(contents: Vec<ContentBlock>) -> Self {
        Self {
            title: None,
            contents,
            options: OptionOverrides::default(),
        }
    }

    pub fn titled(title: impl Into<String>, contents: Vec<ContentBlock>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::new(contents)
        }
    }

    pub fn with_options(mut self, options: OptionOverrides) -> Self {
        self.options = options;
        self
    }
}
