use std::collections::BTreeMap;

use super::Label;

/// Train/test partition expressed as indices into the input rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Deterministic stratified split.
///
/// Within each class, rows are ordered by `blake3(seed|label|link)` and the first
/// `round(n * test_fraction)` go to `test`. A class always keeps at least one
/// row in `train`, and a single-row class never contributes to `test`.
pub fn stratified_split(rows: &[(&str, Label)], seed: &str, test_fraction: f64) -> Split {
    let test_fraction = test_fraction.clamp(0.0, 1.0);
    let mut by_class: BTreeMap<Label, Vec<(u128, usize)>> = BTreeMap::new();
    for (idx, (link, label)) in rows.iter().enumerate() {
        let hash = blake3::hash(format!("{seed}|{label}|{link}").as_bytes());
        let mut prefix = [0u8; 16];
        prefix.copy_from_slice(&hash.as_bytes()[..16]);
        let key = u128::from_le_bytes(prefix);
        by_class.entry(*label).or_default().push((key, idx));
    }

    let mut split = Split::default();
    for (_label, mut entries) in by_class {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let n = entries.len();
        let mut test_n = ((n as f64) * test_fraction).round() as usize;
        if n == 1 {
            test_n = 0;
        } else {
            test_n = test_n.min(n - 1);
        }
        for (pos, (_hash, idx)) in entries.into_iter().enumerate() {
            if pos < test_n {
                split.test.push(idx);
            } else {
                split.train.push(idx);
            }
        }
    }
    split.train.sort_unstable();
    split.test.sort_unstable();
    split
}
