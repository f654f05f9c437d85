//! Near-duplicate paragraph filtering.
//!
//! Generated articles tend to restate the same paragraph with minor wording
//! changes, so the metric has to catch near-identical restatements, not just
//! shared vocabulary. The similarity ratio here is the classic
//! matching-blocks measure: recursively find the longest common substring,
//! then match the pieces to its left and right, and score
//! `2 * matched / (len_a + len_b)`.

use std::collections::HashMap;

/// Similarity ratio between two strings in `[0, 1]`.
///
/// `1.0` for two empty strings; symmetric in its arguments.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(similarity("abcd", "abcd"), 1.0);
/// assert_eq!(similarity("abcd", "bcde"), 0.75);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let matched = matching_total(&a, &b);
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

/// Whether `a` and `b` are near-duplicates under `threshold`.
///
/// The comparison is strict: a pair exactly at the threshold is kept.
pub fn is_near_duplicate(a: &str, b: &str, threshold: f64) -> bool {
    similarity(a, b) > threshold
}

/// Greedy order-preserving dedup: keep the first occurrence of each
/// near-duplicate cluster.
///
/// O(n²) in paragraph count; article bodies are bounded to low hundreds of
/// paragraphs so this is fine.
pub fn remove_near_duplicates(paragraphs: Vec<String>, threshold: f64) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for para in paragraphs {
        if !unique.iter().any(|kept| is_near_duplicate(&para, kept, threshold)) {
            unique.push(para);
        }
    }
    unique
}

/// Total characters covered by matching blocks between `a` and `b`.
fn matching_total(a: &[char], b: &[char]) -> usize {
    // Positions of each character in b, for the longest-match scan.
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &ch) in b.iter().enumerate() {
        b2j.entry(ch).or_default().push(j);
    }

    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k > 0 {
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
    }
    total
}

/// Longest block such that `a[i..i+k] == b[j..j+k]` within the given bounds.
///
/// Earliest block in `a` (then in `b`) wins ties, matching the conventional
/// matching-blocks algorithm.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
    // j2len[j] = length of the longest match ending at a[i], b[j].
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for (i, &ch) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(&ch) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j > 0 {
                    j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                new_j2len.insert(j, k);
                if k > bestsize {
                    besti = i + 1 - k;
                    bestj = j + 1 - k;
                    bestsize = k;
                }
            }
        }
        j2len = new_j2len;
    }
    (besti, bestj, bestsize)
}
