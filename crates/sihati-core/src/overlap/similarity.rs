use std::collections::HashSet;

use crate::record::normalize_item;

/// Jaccard index over normalized items. Two empty lists score 0.
#[must_use]
pub fn jaccard<A, B>(a: &[A], b: &[B]) -> f64
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let set_a: HashSet<String> = a.iter().map(|s| normalize_item(s.as_ref())).collect();
    let set_b: HashSet<String> = b.iter().map(|s| normalize_item(s.as_ref())).collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }

    set_a.intersection(&set_b).count() as f64 / union as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev_row = vec![0usize; b.len() + 1];
    let mut curr_row = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr_row[j + 1] = if ca == cb {
                prev_row[j] + 1
            } else {
                prev_row[j + 1].max(curr_row[j])
            };
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Character-level longest-common-subsequence ratio, `2·LCS / (|a| + |b|)`,
/// computed case-insensitively. Two empty strings score 0.
#[must_use]
pub fn lcs_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }

    (2 * lcs_len(&a, &b)) as f64 / total as f64
}
