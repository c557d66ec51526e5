use crate::error::{Result, TableError};
use crate::table::{ContentBlock, TableSpec};

/// Returns the table's blocks in canonical form: at least one block, every
/// block with at least one (possibly empty) row, and row lengths consistent
/// with the block's headings.
///
/// A block without headings takes its column count from its first row, and
/// blocks of one table may use different column counts.
pub fn normalize_table(table: &TableSpec) -> Result<Vec<ContentBlock>> {
    normalize_blocks(&table.contents)
}

pub fn normalize_blocks(blocks: &[ContentBlock]) -> Result<Vec<ContentBlock>> {
    let mut normalized: Vec<ContentBlock> = if blocks.is_empty() {
        vec![ContentBlock::default()]
    } else {
        blocks.to_vec()
    };
    for (block_index, block) in normalized.iter_mut().enumerate() {
        if block.rows.is_empty() {
            block.rows.push(Vec::new());
        }
        check_columns(block_index, block)?;
    }
    Ok(normalized)
}

fn check_columns(block_index: usize, block: &ContentBlock) -> Result<()> {
    // A lone empty row is the placeholder for a block without rows.
    if matches!(block.rows.as_slice(), [only] if only.is_empty()) {
        return Ok(());
    }
    let mut expected = block.headings.len();
    for (row_index, row) in block.rows.iter().enumerate() {
        if row.len() != expected && expected > 0 {
            return Err(TableError::ColumnMismatch {
                block: block_index,
                row: row_index,
                expected,
                found: row.len(),
            });
        }
        expected = row.len();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row;

    #[test]
    fn empty_table_gets_one_empty_block() {
        let blocks = normalize_table(&TableSpec::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].headings.is_empty());
        assert_eq!(blocks[0].rows, vec![Vec::new()]);
    }

    #[test]
    fn short_row_under_headings_is_a_column_mismatch() {
        let table = TableSpec::new(vec![ContentBlock::new(
            row(["a", "b", "c"]),
            vec![row(["1", "2", "3"]), row(["4", "5"])],
        )]);
        let err = normalize_table(&table).unwrap_err();
        match err {
            TableError::ColumnMismatch {
                block,
                row,
                expected,
                found,
            } => {
                assert_eq!((block, row, expected, found), (0, 1, 3, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn headingless_block_sets_its_own_column_count() {
        let ok = TableSpec::new(vec![
            ContentBlock::new(row(["a", "b"]), vec![row(["1", "2"])]),
            ContentBlock::new(Vec::new(), vec![row(["1", "2", "3"]), row(["4", "5", "6"])]),
        ]);
        assert_eq!(normalize_table(&ok).unwrap().len(), 2);

        let bad = TableSpec::new(vec![ContentBlock::new(
            Vec::new(),
            vec![row(["1", "2", "3"]), row(["4"])],
        )]);
        assert!(matches!(
            normalize_table(&bad),
            Err(TableError::ColumnMismatch { row: 1, .. })
        ));
    }

    #[test]
    fn only_the_row_placeholder_skips_the_column_check() {
        let table = TableSpec::new(vec![ContentBlock::new(
            Vec::new(),
            vec![Vec::new(), row(["x", "y"])],
        )]);
        assert!(normalize_table(&table).is_ok());

        let explicit_empty = TableSpec::new(vec![ContentBlock::new(
            row(["a", "b"]),
            vec![row(["1", "2"]), Vec::new()],
        )]);
        assert!(matches!(
            normalize_table(&explicit_empty),
            Err(TableError::ColumnMismatch {
                row: 1,
                expected: 2,
                found: 0,
                ..
            })
        ));

        let headings_only = TableSpec::new(vec![ContentBlock::new(row(["a", "b"]), Vec::new())]);
        let blocks = normalize_table(&headings_only).unwrap();
        assert_eq!(blocks[0].rows, vec![Vec::new()]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let table = TableSpec::titled(
            "t",
            vec![
                ContentBlock::new(row(["a"]), Vec::new()),
                ContentBlock::new(Vec::new(), vec![vec![None, Some("x".into())]]),
            ],
        );
        let once = normalize_table(&table).unwrap();
        let twice = normalize_blocks(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once[0].rows, vec![Vec::new()]);
    }
}
