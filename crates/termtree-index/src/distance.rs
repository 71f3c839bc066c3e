//! Levenshtein edit distance over Unicode scalar values

/// Minimum number of single-character insertions, deletions and substitutions
/// turning `a` into `b`.
///
/// Works on `char`s rather than bytes, so `"café"` and `"cafe"` are one edit apart.
pub fn distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // Keep the shorter string on the inner loop so the rows stay small
    let (outer, inner) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };
    if inner.is_empty() {
        return outer.len();
    }

    let mut prev: Vec<usize> = (0..=inner.len()).collect();
    let mut curr: Vec<usize> = vec![0; inner.len() + 1];

    for (i, &oc) in outer.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &ic) in inner.iter().enumerate() {
            let cost = usize::from(oc != ic);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            let substitution = prev[j] + cost;
            curr[j + 1] = deletion.min(insertion).min(substitution);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[inner.len()]
}
