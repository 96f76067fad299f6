//! Answer matching: normalization, exact match and edit-distance similarity.

/// Normalize learner or authored text for comparison.
///
/// Lowercases, folds typographic apostrophes to `'`, drops every other
/// punctuation or symbol character and collapses whitespace.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' | '`' => '\'',
            other => other,
        })
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '\'')
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if `input` equals any accepted answer after normalization.
pub fn exact_match<S: AsRef<str>>(input: &str, accepted: &[S]) -> bool {
    let input = normalize(input);
    accepted.iter().any(|a| normalize(a.as_ref()) == input)
}

/// Calculate Levenshtein distance between two strings, counted in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;

        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Similarity percentage (0-100) between normalized `input` and `target`.
pub fn similarity(input: &str, target: &str) -> u8 {
    let a = normalize(input);
    let b = normalize(target);

    let max_len = a.chars().count().max(b.chars().count()).max(1);
    let distance = levenshtein_distance(&a, &b);

    let score = (1.0 - distance as f64 / max_len as f64) * 100.0;
    score.round().clamp(0.0, 100.0) as u8
}

/// Index and score of the accepted answer closest to `input`.
///
/// Ties keep the earliest answer. Returns `None` for an empty list.
pub fn best_similarity<S: AsRef<str>>(input: &str, accepted: &[S]) -> Option<(usize, u8)> {
    accepted
        .iter()
        .enumerate()
        .map(|(idx, a)| (idx, similarity(input, a.as_ref())))
        .fold(None, |best, (idx, score)| match best {
            Some((_, top)) if top >= score => best,
            _ => Some((idx, score)),
        })
}
