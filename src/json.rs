//! Loose JSON table descriptions.
//!
//! Accepts the permissive shapes callers tend to produce: a single table or a
//! list of tables, a single content object or a list of them, and cells given
//! as `null`, scalars, or objects with styling keys.

use crate::error::{Result, TableError};
use crate::options::OptionOverrides;
use crate::table::{Cell, ContentBlock, Row, TableSpec, TextAlign};
use crate::text::FontSpec;
use crate::types::Color;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn tables_from_str(input: &str) -> Result<Vec<TableSpec>> {
    let value: Value = serde_json::from_str(input)?;
    parse_tables(&value)
}

/// One table object or an array of them.
pub fn parse_tables(value: &Value) -> Result<Vec<TableSpec>> {
    match value {
        Value::Array(items) => items.iter().map(parse_table).collect(),
        Value::Object(_) => Ok(vec![parse_table(value)?]),
        other => Err(TableError::InvalidTable(format!(
            "expected a table object or an array of tables, got {}",
            kind(other)
        ))),
    }
}

pub fn parse_table(value: &Value) -> Result<TableSpec> {
    let Some(obj) = value.as_object() else {
        return Err(TableError::InvalidTable(format!(
            "table must be an object, got {}",
            kind(value)
        )));
    };
    let title = match obj.get("title") {
        None | Some(Value::Null) => None,
        Some(Value::String(title)) => Some(title.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(TableError::InvalidTable(format!(
                "title must be a string, got {}",
                kind(other)
            )));
        }
    };
    let contents = match obj.get("contents") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(blocks)) => blocks.iter().map(parse_block).collect::<Result<_>>()?,
        Some(block) => vec![parse_block(block)?],
    };
    Ok(TableSpec {
        title,
        contents,
        options: parse_options(obj.get("options"))?,
    })
}

fn parse_block(value: &Value) -> Result<ContentBlock> {
    let Some(obj) = value.as_object() else {
        return Ok(ContentBlock::default());
    };
    let headings = match obj.get("headings") {
        None | Some(Value::Null) => Vec::new(),
        Some(headings) => parse_row(headings)?,
    };
    let rows = match obj.get("rows") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(rows)) => rows.iter().map(parse_row).collect::<Result<_>>()?,
        Some(other) => {
            return Err(TableError::InvalidTable(format!(
                "rows must be an array of rows, got {}",
                kind(other)
            )));
        }
    };
    Ok(ContentBlock {
        headings,
        rows,
        options: parse_options(obj.get("options"))?,
    })
}

fn parse_row(value: &Value) -> Result<Row> {
    match value {
        Value::Array(cells) => cells.iter().map(parse_cell).collect(),
        other => Err(TableError::InvalidTable(format!(
            "row must be an array of cells, got {}",
            kind(other)
        ))),
    }
}

pub fn parse_cell(value: &Value) -> Result<Option<Cell>> {
    let cell = match value {
        Value::Null => return Ok(None),
        Value::Object(obj) => {
            let content = match obj.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) => String::new(),
                Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
                Some(other) => {
                    return Err(TableError::InvalidTable(format!(
                        "cell content must be a scalar, got {}",
                        kind(other)
                    )));
                }
                None => {
                    return Err(TableError::InvalidTable(
                        "cell object is missing \"content\"".to_string(),
                    ));
                }
            };
            Cell {
                content,
                text_color: field::<Color>(obj.get("text_color").or_else(|| obj.get("color")))?,
                background_color: field::<Color>(obj.get("background_color"))?,
                font: field::<FontSpec>(obj.get("font"))?,
                align: field::<TextAlign>(obj.get("align"))?,
            }
        }
        Value::String(s) => Cell::new(s.as_str()),
        Value::Number(_) | Value::Bool(_) => Cell::new(value.to_string()),
        Value::Array(_) => {
            return Err(TableError::InvalidTable(
                "cell must not be an array".to_string(),
            ));
        }
    };
    Ok(Some(cell))
}

fn field<T: DeserializeOwned>(value: Option<&Value>) -> Result<Option<T>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
    }
}

fn parse_options(value: Option<&Value>) -> Result<OptionOverrides> {
    match value {
        None | Some(Value::Null) => Ok(OptionOverrides::default()),
        Some(v @ Value::Object(_)) => OptionOverrides::from_json(v),
        Some(other) => Err(TableError::InvalidTable(format!(
            "options must be an object, got {}",
            kind(other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
