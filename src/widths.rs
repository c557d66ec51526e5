use crate::error::{Result, TableError};
use crate::options::{ColumnWidthRestrictions, LayoutOptions};
use crate::table::{ContentBlock, Row, RowType};
use crate::text::TextMetrics;
use crate::types::Pt;

/// Content-driven sizes of one block before fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalWidths {
    /// Widest cell per column, padding included.
    pub widths: Vec<Pt>,
    /// Widest unbreakable token per column, padding included.
    pub min_widths: Vec<Pt>,
}

pub fn natural_widths(
    block: &ContentBlock,
    options: &LayoutOptions,
    metrics: &dyn TextMetrics,
) -> NaturalWidths {
    let columns = block.column_count();
    let mut natural = NaturalWidths {
        widths: vec![Pt::ZERO; columns],
        min_widths: vec![Pt::ZERO; columns],
    };
    let rows = std::iter::once((RowType::Heading, &block.headings))
        .chain(block.rows.iter().map(|row| (RowType::Row, row)));
    for (row_type, row) in rows {
        measure_row(row, row_type, options, metrics, &mut natural);
    }
    natural
}

fn measure_row(
    row: &Row,
    row_type: RowType,
    options: &LayoutOptions,
    metrics: &dyn TextMetrics,
    natural: &mut NaturalWidths,
) {
    let style = options.row_style(row_type);
    let padding = options.padding * 2;
    for (column, cell) in row.iter().enumerate() {
        let font = cell
            .as_ref()
            .and_then(|c| c.font.as_ref())
            .unwrap_or(&style.font);
        let text = cell.as_ref().map(|c| c.content.as_str()).unwrap_or("");
        let width = text
            .split('\n')
            .map(|line| metrics.measure_width(line, font))
            .max()
            .unwrap_or(Pt::ZERO)
            + padding;
        natural.widths[column] = natural.widths[column].max(width);

        let token = text
            .split(|ch| ch == '\n' || options.break_for_min_width_on.contains(&ch))
            .filter(|token| !token.is_empty())
            .map(|token| metrics.measure_width(token, font))
            .max()
            .unwrap_or(Pt::ZERO);
        natural.min_widths[column] = natural.min_widths[column].max(token + padding);
    }
}

/// Computes final column widths for `block`, filling `options.table_width`
/// exactly whenever the constraints allow it.
pub fn solve_column_widths(
    block: &ContentBlock,
    options: &LayoutOptions,
    metrics: &dyn TextMetrics,
) -> Result<Vec<Pt>> {
    let natural = natural_widths(block, options, metrics);
    fit_widths(
        &natural,
        &options.column_width_restrictions,
        options.table_width,
    )
}

/// Applies explicit minimums, then shrinks or expands `natural` to
/// `table_width`.
pub fn fit_widths(
    natural: &NaturalWidths,
    restrictions: &ColumnWidthRestrictions,
    table_width: Pt,
) -> Result<Vec<Pt>> {
    let mut columns = Columns::new(natural, restrictions);
    for (&column, &minimum) in &restrictions.minimum {
        if column >= columns.widths.len() {
            continue;
        }
        let minimum = minimum.to_milli_i64();
        if columns.widths[column] < minimum && columns.min_widths[column] < minimum {
            columns.widths[column] = minimum;
        }
    }

    let target = table_width.to_milli_i64();
    let total = columns.total();
    if total > target {
        columns.shrink(target)?;
    } else if total > 0 && total < target {
        columns.expand(target);
    }
    Ok(columns.widths.into_iter().map(Pt::from_milli_i64).collect())
}

/// Working state in whole milli-points so every pass conserves the total.
struct Columns<'a> {
    widths: Vec<i64>,
    min_widths: Vec<i64>,
    restrictions: &'a ColumnWidthRestrictions,
}

impl<'a> Columns<'a> {
    fn new(natural: &NaturalWidths, restrictions: &'a ColumnWidthRestrictions) -> Self {
        Self {
            widths: natural.widths.iter().map(|w| w.to_milli_i64()).collect(),
            min_widths: natural.min_widths.iter().map(|w| w.to_milli_i64()).collect(),
            restrictions,
        }
    }

    fn total(&self) -> i64 {
        self.widths.iter().sum()
    }

    fn explicit_min(&self, column: usize) -> Option<i64> {
        self.restrictions
            .minimum
            .get(&column)
            .map(|min| min.to_milli_i64())
    }

    fn explicit_max(&self, column: usize) -> Option<i64> {
        self.restrictions
            .maximum
            .get(&column)
            .map(|max| max.to_milli_i64())
    }

    fn hard_min(&self, column: usize) -> i64 {
        self.explicit_min(column)
            .unwrap_or(0)
            .max(self.min_widths[column])
    }

    fn shrink(&mut self, target: i64) -> Result<()> {
        let mut pass = 0;
        loop {
            let excess = self.total() - target;
            if excess <= 0 {
                return Ok(());
            }
            pass += 1;
            // Re-partitioned every pass so the outcome does not depend on
            // which columns reach their floor first.
            let modable: Vec<usize> = (0..self.widths.len())
                .filter(|&column| {
                    !self.restrictions.is_fitted(column)
                        && self.explicit_min(column) != Some(self.widths[column])
                        && self.widths[column] > self.hard_min(column)
                })
                .collect();
            log::debug!(
                "shrink pass {pass}: excess {} across {} columns",
                Pt::from_milli_i64(excess),
                modable.len()
            );
            let weights: Vec<i64> = modable.iter().map(|&c| self.widths[c]).collect();
            let removals = proportional_shares(excess, &weights);
            let mut changed = false;
            for (&column, removal) in modable.iter().zip(removals) {
                let next = (self.widths[column] - removal).max(self.hard_min(column));
                if next != self.widths[column] {
                    self.widths[column] = next;
                    changed = true;
                }
            }
            if !changed {
                return Err(TableError::LayoutOverflow {
                    overage: Pt::from_milli_i64(excess),
                });
            }
        }
    }

    fn expand(&mut self, target: i64) {
        let mut pass = 0;
        loop {
            let deficit = target - self.total();
            if deficit <= 0 {
                return;
            }
            pass += 1;
            let modable: Vec<usize> = (0..self.widths.len())
                .filter(|&column| {
                    !self.restrictions.is_fitted(column)
                        && self.explicit_max(column) != Some(self.widths[column])
                })
                .collect();
            log::debug!(
                "expand pass {pass}: deficit {} across {} columns",
                Pt::from_milli_i64(deficit),
                modable.len()
            );
            if modable.is_empty() {
                return;
            }
            let count = modable.len() as i64;
            let (share, extra) = (deficit / count, deficit % count);
            let mut changed = false;
            for (position, &column) in modable.iter().enumerate() {
                let add = share + i64::from((position as i64) < extra);
                // Columns past their maximum are pulled down to it; the freed
                // width goes out again on the next pass.
                let mut next = self.widths[column] + add;
                if let Some(max) = self.explicit_max(column) {
                    next = next.min(max);
                }
                if next != self.widths[column] {
                    self.widths[column] = next;
                    changed = true;
                }
            }
            if !changed {
                return;
            }
        }
    }
}

/// Splits `amount` in proportion to `weights` so the parts sum to `amount`
/// exactly. Leftover units go to the largest remainders, lowest index first.
fn proportional_shares(amount: i64, weights: &[i64]) -> Vec<i64> {
    let total: i128 = weights.iter().map(|&w| w.max(0) as i128).sum();
    if total == 0 {
        return vec![0; weights.len()];
    }
    let mut shares = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (index, &weight) in weights.iter().enumerate() {
        let scaled = amount as i128 * weight.max(0) as i128;
        shares.push((scaled / total) as i64);
        remainders.push((scaled % total, index));
    }
    let mut leftover = amount - shares.iter().sum::<i64>();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, index) in remainders {
        if leftover <= 0 {
            break;
        }
        shares[index] += 1;
        leftover -= 1;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{OptionOverrides, resolve};
    use crate::table::row;
    use crate::text::FixedAdvanceMetrics;

    fn pt(v: i32) -> Pt {
        Pt::from_i32(v)
    }

    fn natural(widths: &[i32], min_widths: &[i32]) -> NaturalWidths {
        NaturalWidths {
            widths: widths.iter().copied().map(pt).collect(),
            min_widths: min_widths.iter().copied().map(pt).collect(),
        }
    }

    fn options_with(overrides: OptionOverrides) -> LayoutOptions {
        resolve(&LayoutOptions::default(), Some(&overrides), None).unwrap()
    }

    fn page_width(width: i32) -> OptionOverrides {
        OptionOverrides {
            page_width: Some(pt(width)),
            ..OptionOverrides::default()
        }
    }

    // Helvetica 6pt under FixedAdvanceMetrics: 3pt per character.
    // Column 0 is 6pt wide (min 6), column 1 is 69pt wide (min 33).
    fn sample_block() -> ContentBlock {
        ContentBlock::new(
            row(["id", "description"]),
            vec![row(["1", "a long description text"])],
        )
    }

    #[test]
    fn natural_widths_track_widest_cell_and_token() {
        let options = options_with(page_width(500));
        let natural = natural_widths(&sample_block(), &options, &FixedAdvanceMetrics::default());
        assert_eq!(natural.widths, vec![pt(6), pt(69)]);
        assert_eq!(natural.min_widths, vec![pt(6), pt(33)]);
    }

    #[test]
    fn break_characters_collapse_into_one_separator() {
        let options = options_with(page_width(500));
        let block = ContentBlock::new(Vec::new(), vec![row(["ab,,/ abcd/e"])]);
        let natural = natural_widths(&block, &options, &FixedAdvanceMetrics::default());
        assert_eq!(natural.min_widths, vec![pt(12)]);
    }

    #[test]
    fn explicit_line_breaks_bound_the_natural_width() {
        let options = options_with(page_width(500));
        let block = ContentBlock::new(Vec::new(), vec![row(["abc\nabcdef\nab"])]);
        let natural = natural_widths(&block, &options, &FixedAdvanceMetrics::default());
        assert_eq!(natural.widths, vec![pt(18)]);
        assert_eq!(natural.min_widths, vec![pt(18)]);
    }

    #[test]
    fn shrinks_proportionally_and_conserves_the_total() {
        let widths = fit_widths(
            &natural(&[50, 200, 50], &[10, 10, 10]),
            &ColumnWidthRestrictions::default(),
            pt(200),
        )
        .unwrap();
        assert_eq!(
            widths,
            vec![
                Pt::from_milli_i64(33_333),
                Pt::from_milli_i64(133_333),
                Pt::from_milli_i64(33_334)
            ]
        );
        assert_eq!(widths.iter().sum::<Pt>(), pt(200));
    }

    #[test]
    fn shrink_clamps_at_the_hard_minimum_and_repartitions() {
        let widths = fit_widths(
            &natural(&[50, 200, 50], &[40, 10, 10]),
            &ColumnWidthRestrictions::default(),
            pt(200),
        )
        .unwrap();
        assert_eq!(widths[0], pt(40));
        assert_eq!(widths.iter().sum::<Pt>(), pt(200));
        assert!(widths[2] >= pt(10));
    }

    #[test]
    fn expand_respects_maximum() {
        let mut restrictions = ColumnWidthRestrictions::default();
        restrictions.maximum.insert(0, pt(30));
        let widths = fit_widths(&natural(&[20, 40, 40], &[5, 5, 5]), &restrictions, pt(200)).unwrap();
        assert_eq!(widths, vec![pt(30), pt(85), pt(85)]);
    }

    #[test]
    fn expand_pulls_columns_above_their_maximum_down() {
        let mut restrictions = ColumnWidthRestrictions::default();
        restrictions.maximum.insert(0, pt(30));
        let widths = fit_widths(&natural(&[50, 10], &[5, 5]), &restrictions, pt(100)).unwrap();
        assert_eq!(widths, vec![pt(30), pt(70)]);
    }

    #[test]
    fn expand_stops_quietly_when_nothing_can_grow() {
        let mut restrictions = ColumnWidthRestrictions::default();
        restrictions.fitted.insert(0);
        restrictions.maximum.insert(1, pt(50));
        let widths = fit_widths(&natural(&[20, 40], &[5, 5]), &restrictions, pt(200)).unwrap();
        assert_eq!(widths, vec![pt(20), pt(50)]);
    }

    #[test]
    fn fitted_columns_keep_their_natural_width() {
        let metrics = FixedAdvanceMetrics::default();
        let block = sample_block();
        for width in [50, 100] {
            let mut overrides = page_width(width);
            overrides.column_width_restrictions = Some(ColumnWidthRestrictions {
                fitted: [0].into_iter().collect(),
                ..ColumnWidthRestrictions::default()
            });
            let options = options_with(overrides);
            let widths = solve_column_widths(&block, &options, &metrics).unwrap();
            assert_eq!(widths[0], pt(6));
            assert_eq!(widths.iter().sum::<Pt>(), pt(width));
        }
    }

    #[test]
    fn explicit_minimum_is_a_floor_during_shrink() {
        let metrics = FixedAdvanceMetrics::default();
        let mut overrides = page_width(60);
        overrides.column_width_restrictions = Some(ColumnWidthRestrictions {
            minimum: [(0, pt(20))].into_iter().collect(),
            ..ColumnWidthRestrictions::default()
        });
        let options = options_with(overrides);
        let widths = solve_column_widths(&sample_block(), &options, &metrics).unwrap();
        assert_eq!(widths, vec![pt(20), pt(40)]);
    }

    #[test]
    fn explicit_minimum_below_natural_minimum_is_ignored() {
        let mut restrictions = ColumnWidthRestrictions::default();
        restrictions.minimum.insert(0, pt(8));
        let widths = fit_widths(&natural(&[6, 20], &[10, 5]), &restrictions, pt(26)).unwrap();
        assert_eq!(widths, vec![pt(6), pt(20)]);
    }

    #[test]
    fn overflow_reports_the_overage() {
        let metrics = FixedAdvanceMetrics::default();
        let options = options_with(page_width(30));
        let err = solve_column_widths(&sample_block(), &options, &metrics).unwrap_err();
        match err {
            TableError::LayoutOverflow { overage } => assert_eq!(overage, pt(9)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn widths_fill_the_table_whenever_feasible() {
        let metrics = FixedAdvanceMetrics::default();
        for width in [40, 60, 75, 90, 333] {
            let options = options_with(page_width(width));
            let widths = solve_column_widths(&sample_block(), &options, &metrics).unwrap();
            assert_eq!(widths.iter().sum::<Pt>(), pt(width), "table width {width}");
            assert!(widths[0] >= pt(6) && widths[1] >= pt(33));
        }
    }

    #[test]
    fn empty_block_has_no_widths() {
        let options = options_with(page_width(100));
        let block = ContentBlock::new(Vec::new(), vec![Vec::new()]);
        let widths = solve_column_widths(&block, &options, &FixedAdvanceMetrics::default()).unwrap();
        assert!(widths.is_empty());
    }

    #[test]
    fn shares_sum_exactly() {
        assert_eq!(proportional_shares(100, &[1, 1, 1]), vec![34, 33, 33]);
        assert_eq!(proportional_shares(7, &[0, 0]), vec![0, 0]);
        assert_eq!(proportional_shares(10, &[3, 1]).iter().sum::<i64>(), 10);
    }
}
