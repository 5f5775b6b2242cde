// Periodic die-type labels laid over the grid.
// Visual expectation: the same 3x6 block of labels repeats across the wafer,
// starting from whichever die the user picked as the naming origin.

use crate::types::GridIndex;

pub const NUM_COLS: i64 = 3;
pub const NUM_ROWS: i64 = 6;

/// Reticle layout, column by column, bottom row last.
pub const DIE_NAMES: [&str; (NUM_COLS * NUM_ROWS) as usize] = [
    "0:No_NP", "1:MX_2x2", "2:MX_3x3", "3:MX_4x4", "4:32x16", " :Test1",
    "5:Oval", "6:2x2", "7:3x3", "8:4x4", "9:100x4", " :Test2",
    "A:D130", "B:D140", "C:D150", "D:D160", "E:D170", " :Test3",
];

/// Label of die `index` when `origin` is treated as the canonical origin die.
/// Total for any index, including negatives relative to the origin.
pub fn name_of(index: GridIndex, origin: GridIndex) -> &'static str {
    let c = index.col - origin.col;
    let r = index.row - origin.row;

    let die_col = c.rem_euclid(NUM_COLS);
    // Rows count upward inside the reticle.
    let die_row = NUM_ROWS - 1 - r.rem_euclid(NUM_ROWS);

    let idx = (die_col * NUM_ROWS + die_row) as usize;
    DIE_NAMES[idx % DIE_NAMES.len()]
}

/// Position of `label` in [`DIE_NAMES`], the stable report order.
pub fn label_order(label: &str) -> Option<usize> {
    DIE_NAMES.iter().position(|n| *n == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_die_is_bottom_of_first_column() {
        let o = GridIndex::new(0, 0);
        assert_eq!(name_of(o, o), " :Test1");
        assert_eq!(name_of(GridIndex::new(0, 5), o), "0:No_NP");
        assert_eq!(name_of(GridIndex::new(1, 0), o), " :Test2");
        assert_eq!(name_of(GridIndex::new(2, 1), o), "E:D170");
    }

    #[test]
    fn labels_repeat_every_3_columns_and_6_rows() {
        for origin in [GridIndex::new(0, 0), GridIndex::new(4, 7), GridIndex::new(-2, 3)] {
            for c in -4..10 {
                for r in -7..14 {
                    let base = name_of(GridIndex::new(c, r), origin);
                    for k in -2..3 {
                        assert_eq!(name_of(GridIndex::new(c + 3 * k, r), origin), base);
                        assert_eq!(name_of(GridIndex::new(c, r + 6 * k), origin), base);
                    }
                }
            }
        }
    }

    #[test]
    fn shifting_origin_moves_the_pattern() {
        let shifted = GridIndex::new(5, 9);
        assert_eq!(name_of(shifted, shifted), name_of(GridIndex::default(), GridIndex::default()));
    }

    #[test]
    fn one_block_covers_every_label_once() {
        let mut seen = vec![0; DIE_NAMES.len()];
        for c in 0..NUM_COLS {
            for r in 0..NUM_ROWS {
                let label = name_of(GridIndex::new(c, r), GridIndex::default());
                seen[label_order(label).unwrap()] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }
}
