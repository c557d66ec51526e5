use crate::error::{Result, TableError};
use crate::table::{RowType, TextAlign};
use crate::text::FontSpec;
use crate::types::{Color, Margins, Pt, Size};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Per-column width limits, keyed by zero-based column index.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ColumnWidthRestrictions {
    /// Columns kept at their natural content width.
    #[serde(deserialize_with = "fitted_columns")]
    pub fitted: BTreeSet<usize>,
    pub minimum: BTreeMap<usize, Pt>,
    pub maximum: BTreeMap<usize, Pt>,
}

impl ColumnWidthRestrictions {
    pub fn is_fitted(&self, column: usize) -> bool {
        self.fitted.contains(&column)
    }

    fn validate(&self) -> Result<()> {
        for (column, min) in &self.minimum {
            if *min < Pt::ZERO {
                return Err(TableError::InvalidConstraint(format!(
                    "column {column} has a negative minimum ({min})"
                )));
            }
            if let Some(max) = self.maximum.get(column) {
                if min > max {
                    return Err(TableError::InvalidConstraint(format!(
                        "column {column} minimum {min} exceeds maximum {max}"
                    )));
                }
            }
        }
        if let Some((column, max)) = self.maximum.iter().find(|(_, max)| **max < Pt::ZERO) {
            return Err(TableError::InvalidConstraint(format!(
                "column {column} has a negative maximum ({max})"
            )));
        }
        if let Some(column) = self
            .fitted
            .iter()
            .find(|c| self.minimum.contains_key(c) || self.maximum.contains_key(c))
        {
            return Err(TableError::InvalidConstraint(format!(
                "column {column} is fitted and also carries a minimum or maximum"
            )));
        }
        Ok(())
    }
}

// Accepts either a list of column indexes or the positional flag form
// `[true, false, true]`.
fn fitted_columns<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeSet<usize>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Entry {
        Flag(Option<bool>),
        Index(usize),
    }

    let entries = Vec::<Entry>::deserialize(deserializer)?;
    let flags = entries.iter().all(|e| matches!(e, Entry::Flag(_)));
    let indexes = entries.iter().all(|e| matches!(e, Entry::Index(_)));
    if !flags && !indexes {
        return Err(de::Error::custom(
            "fitted must be all column indexes or all booleans",
        ));
    }
    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(position, entry)| match entry {
            Entry::Flag(Some(true)) => Some(position),
            Entry::Flag(_) => None,
            Entry::Index(column) => Some(column),
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleStyle {
    pub font: FontSpec,
    pub text_color: Color,
    pub background_color: Color,
    pub alignment: TextAlign,
    /// Extra padding around the title on top of the cell padding.
    pub padding: Pt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowStyle {
    pub font: FontSpec,
    pub text_color_default: Color,
    /// Per-column text colors; `None` entries use the default.
    pub text_colors: Vec<Option<Color>>,
    pub background_color_default: Option<Color>,
    pub background_colors: Vec<Option<Color>>,
    /// Fill for absent cells.
    pub blackout_color: Color,
    pub text_alignment: TextAlign,
}

impl RowStyle {
    fn with_font(font: FontSpec) -> Self {
        Self {
            font,
            text_color_default: Color::BLACK,
            text_colors: Vec::new(),
            background_color_default: None,
            background_colors: Vec::new(),
            blackout_color: Color::cmyk(0.0, 0.0, 0.0, 70.0),
            text_alignment: TextAlign::Center,
        }
    }

    pub fn text_color(&self, column: usize) -> Color {
        self.text_colors
            .get(column)
            .copied()
            .flatten()
            .unwrap_or(self.text_color_default)
    }

    pub fn background_color(&self, column: usize) -> Option<Color> {
        self.background_colors
            .get(column)
            .copied()
            .flatten()
            .or(self.background_color_default)
    }
}

/// Effective configuration for laying out one block.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub page_width: Pt,
    pub page_height: Pt,
    /// Margin added to every side of all tables.
    pub table_margin: Pt,
    pub table_margin_left: Pt,
    pub table_margin_right: Pt,
    pub table_margin_top: Pt,
    pub table_margin_bottom: Pt,

    // Derived by `expand_geometry`.
    pub margins: Margins,
    pub table_width: Pt,
    pub x_start: Pt,
    pub x_stop: Pt,
    pub y_start: Pt,
    pub y_end: Pt,

    pinned_x_start: Option<Pt>,
    pinned_y_start: Option<Pt>,
    pinned_y_end: Option<Pt>,

    /// Starting cursor height for the first table of a call.
    pub y_initial: Option<Pt>,
    pub padding: Pt,
    /// Vertical gap left after each table.
    pub spacing: Pt,
    pub title: TitleStyle,
    pub headings: RowStyle,
    pub row: RowStyle,
    pub border_color: Color,
    pub border_width: Pt,
    pub page_break_on_new_table: bool,
    pub show_title_after_page_break: bool,
    pub show_headings_after_page_break: bool,
    /// Characters a cell may wrap on when computing its unbreakable width.
    pub break_for_min_width_on: Vec<char>,
    pub column_width_restrictions: ColumnWidthRestrictions,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        let page = Size::a4();
        let default_font = FontSpec::new("Helvetica", 6.0);
        let mut options = Self {
            page_width: page.width,
            page_height: page.height,
            table_margin: Pt::ZERO,
            table_margin_left: Pt::ZERO,
            table_margin_right: Pt::ZERO,
            table_margin_top: Pt::ZERO,
            table_margin_bottom: Pt::ZERO,
            margins: Margins::zero(),
            table_width: Pt::ZERO,
            x_start: Pt::ZERO,
            x_stop: Pt::ZERO,
            y_start: Pt::ZERO,
            y_end: Pt::ZERO,
            pinned_x_start: None,
            pinned_y_start: None,
            pinned_y_end: None,
            y_initial: None,
            padding: Pt::ZERO,
            spacing: Pt::ZERO,
            title: TitleStyle {
                font: FontSpec::new("Helvetica", 18.0),
                text_color: Color::cmyk(0.0, 0.0, 0.0, 0.0),
                background_color: Color::cmyk(100.0, 100.0, 0.0, 0.0),
                alignment: TextAlign::Center,
                padding: Pt::ZERO,
            },
            headings: RowStyle::with_font(default_font.clone()),
            row: RowStyle::with_font(default_font),
            border_color: Color::BLACK,
            border_width: Pt::from_i32(1),
            page_break_on_new_table: false,
            show_title_after_page_break: true,
            show_headings_after_page_break: true,
            break_for_min_width_on: vec![',', '/', ' '],
            column_width_restrictions: ColumnWidthRestrictions::default(),
        };
        options.expand_geometry();
        options
    }
}

impl LayoutOptions {
    pub fn row_style(&self, row_type: RowType) -> &RowStyle {
        match row_type {
            RowType::Heading => &self.headings,
            RowType::Row => &self.row,
        }
    }

    /// Recomputes page geometry from the page size and margin settings.
    /// Explicitly pinned start/end coordinates are kept.
    pub fn expand_geometry(&mut self) {
        self.margins = Margins {
            top: self.table_margin_top + self.table_margin,
            right: self.table_margin_right + self.table_margin,
            bottom: self.table_margin_bottom + self.table_margin,
            left: self.table_margin_left + self.table_margin,
        };
        self.table_width = self.page_width - self.margins.left - self.margins.right;
        self.x_start = self.pinned_x_start.unwrap_or(self.margins.left);
        self.x_stop = self.page_width - self.margins.right;
        self.y_start = self
            .pinned_y_start
            .unwrap_or(self.page_height - self.margins.top);
        self.y_end = self.pinned_y_end.unwrap_or(self.margins.bottom);
    }

    pub fn validate(&self) -> Result<()> {
        if self.table_width <= Pt::ZERO {
            return Err(TableError::InvalidConfiguration(format!(
                "margins leave no horizontal room (table width {})",
                self.table_width
            )));
        }
        if self.y_start <= self.y_end {
            return Err(TableError::InvalidConfiguration(format!(
                "vertical start {} is not above end {}",
                self.y_start, self.y_end
            )));
        }
        if self.padding < Pt::ZERO || self.title.padding < Pt::ZERO {
            return Err(TableError::InvalidConfiguration(
                "padding must not be negative".to_string(),
            ));
        }
        if self.border_width < Pt::ZERO {
            return Err(TableError::InvalidConfiguration(
                "border_width must not be negative".to_string(),
            ));
        }
        if self.break_for_min_width_on.is_empty() {
            return Err(TableError::InvalidConfiguration(
                "break_for_min_width_on needs at least one character".to_string(),
            ));
        }
        self.column_width_restrictions.validate()
    }
}

/// Distinguishes `"key": null` (explicitly cleared) from an absent key.
fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Sparse option layer. Each set field replaces the value of the layer below
/// it; compound values such as `column_width_restrictions` are replaced whole.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct OptionOverrides {
    pub page_width: Option<Pt>,
    pub page_height: Option<Pt>,
    pub table_margin: Option<Pt>,
    pub table_margin_left: Option<Pt>,
    pub table_margin_right: Option<Pt>,
    pub table_margin_top: Option<Pt>,
    pub table_margin_bottom: Option<Pt>,
    #[serde(alias = "xstart")]
    pub x_start: Option<Pt>,
    #[serde(alias = "ystart")]
    pub y_start: Option<Pt>,
    #[serde(alias = "yend")]
    pub y_end: Option<Pt>,
    pub y_initial: Option<Pt>,
    pub padding: Option<Pt>,
    pub spacing: Option<Pt>,

    pub title_font: Option<FontSpec>,
    pub title_text_color: Option<Color>,
    pub title_background_color: Option<Color>,
    pub title_text_alignment: Option<TextAlign>,
    pub title_padding: Option<Pt>,

    pub headings_font: Option<FontSpec>,
    pub headings_text_color_default: Option<Color>,
    pub headings_text_colors: Option<Vec<Option<Color>>>,
    #[serde(deserialize_with = "explicit_null")]
    pub headings_background_color_default: Option<Option<Color>>,
    pub headings_background_colors: Option<Vec<Option<Color>>>,
    pub headings_blackout_color: Option<Color>,
    pub headings_text_alignment: Option<TextAlign>,

    pub row_font: Option<FontSpec>,
    pub row_text_color_default: Option<Color>,
    pub row_text_colors: Option<Vec<Option<Color>>>,
    #[serde(deserialize_with = "explicit_null")]
    pub row_background_color_default: Option<Option<Color>>,
    pub row_background_colors: Option<Vec<Option<Color>>>,
    pub row_blackout_color: Option<Color>,
    pub row_text_alignment: Option<TextAlign>,

    pub border_color: Option<Color>,
    pub border_width: Option<Pt>,
    pub page_break_on_new_table: Option<bool>,
    pub show_title_after_page_break: Option<bool>,
    pub show_headings_after_page_break: Option<bool>,
    pub break_for_min_width_on: Option<Vec<char>>,
    pub column_width_restrictions: Option<ColumnWidthRestrictions>,
}

struct RowStyleLayer<'a> {
    font: &'a Option<FontSpec>,
    text_color_default: &'a Option<Color>,
    text_colors: &'a Option<Vec<Option<Color>>>,
    background_color_default: &'a Option<Option<Color>>,
    background_colors: &'a Option<Vec<Option<Color>>>,
    blackout_color: &'a Option<Color>,
    text_alignment: &'a Option<TextAlign>,
}

impl RowStyleLayer<'_> {
    fn apply_to(&self, style: &mut RowStyle) {
        set(&mut style.font, self.font);
        set(&mut style.text_color_default, self.text_color_default);
        set(&mut style.text_colors, self.text_colors);
        set(
            &mut style.background_color_default,
            self.background_color_default,
        );
        set(&mut style.background_colors, self.background_colors);
        set(&mut style.blackout_color, self.blackout_color);
        set(&mut style.text_alignment, self.text_alignment);
    }
}

fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *slot = value.clone();
    }
}

impl OptionOverrides {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Writes every set field into `options`. Geometry is not re-derived.
    pub fn apply_to(&self, options: &mut LayoutOptions) {
        set(&mut options.page_width, &self.page_width);
        set(&mut options.page_height, &self.page_height);
        set(&mut options.table_margin, &self.table_margin);
        set(&mut options.table_margin_left, &self.table_margin_left);
        set(&mut options.table_margin_right, &self.table_margin_right);
        set(&mut options.table_margin_top, &self.table_margin_top);
        set(&mut options.table_margin_bottom, &self.table_margin_bottom);
        if self.x_start.is_some() {
            options.pinned_x_start = self.x_start;
        }
        if self.y_start.is_some() {
            options.pinned_y_start = self.y_start;
        }
        if self.y_end.is_some() {
            options.pinned_y_end = self.y_end;
        }
        if self.y_initial.is_some() {
            options.y_initial = self.y_initial;
        }
        set(&mut options.padding, &self.padding);
        set(&mut options.spacing, &self.spacing);

        set(&mut options.title.font, &self.title_font);
        set(&mut options.title.text_color, &self.title_text_color);
        set(&mut options.title.background_color, &self.title_background_color);
        set(&mut options.title.alignment, &self.title_text_alignment);
        set(&mut options.title.padding, &self.title_padding);

        RowStyleLayer {
            font: &self.headings_font,
            text_color_default: &self.headings_text_color_default,
            text_colors: &self.headings_text_colors,
            background_color_default: &self.headings_background_color_default,
            background_colors: &self.headings_background_colors,
            blackout_color: &self.headings_blackout_color,
            text_alignment: &self.headings_text_alignment,
        }
        .apply_to(&mut options.headings);
        RowStyleLayer {
            font: &self.row_font,
            text_color_default: &self.row_text_color_default,
            text_colors: &self.row_text_colors,
            background_color_default: &self.row_background_color_default,
            background_colors: &self.row_background_colors,
            blackout_color: &self.row_blackout_color,
            text_alignment: &self.row_text_alignment,
        }
        .apply_to(&mut options.row);

        set(&mut options.border_color, &self.border_color);
        set(&mut options.border_width, &self.border_width);
        set(
            &mut options.page_break_on_new_table,
            &self.page_break_on_new_table,
        );
        set(
            &mut options.show_title_after_page_break,
            &self.show_title_after_page_break,
        );
        set(
            &mut options.show_headings_after_page_break,
            &self.show_headings_after_page_break,
        );
        set(
            &mut options.break_for_min_width_on,
            &self.break_for_min_width_on,
        );
        set(
            &mut options.column_width_restrictions,
            &self.column_width_restrictions,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeometryMode {
    /// Re-derive margins, table width and start/stop coordinates.
    Expand,
    /// Content-level overrides only; page geometry stays as resolved.
    NoMargins,
}

/// Merges `defaults` < `table` < `block` into the options for one block.
///
/// Every call starts from a clone of `defaults`, so sibling tables and blocks
/// never observe each other's overrides.
pub fn resolve(
    defaults: &LayoutOptions,
    table: Option<&OptionOverrides>,
    block: Option<&OptionOverrides>,
) -> Result<LayoutOptions> {
    let mut options = defaults.clone();
    let layers = [(table, GeometryMode::Expand), (block, GeometryMode::NoMargins)];
    for (layer, mode) in layers {
        if let Some(overrides) = layer {
            overrides.apply_to(&mut options);
        }
        if mode == GeometryMode::Expand {
            options.expand_geometry();
        }
    }
    options.validate()?;
    Ok(options)
}
