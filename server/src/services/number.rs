/// Two-letter units, checked before the single-letter table.
const LONG_SUFFIXES: &[(&str, f64)] = &[("aa", 1e36), ("ab", 1e39), ("ac", 1e42)];

/// Case matters: `q` and `Q` are different units in the game.
const SHORT_SUFFIXES: &[(char, f64)] = &[
    ('k', 1e3),
    ('K', 1e3),
    ('m', 1e6),
    ('M', 1e6),
    ('b', 1e9),
    ('B', 1e9),
    ('t', 1e12),
    ('T', 1e12),
    ('q', 1e15),
    ('Q', 1e18),
    ('s', 1e21),
    ('S', 1e24),
    ('o', 1e27),
    ('O', 1e27),
    ('n', 1e30),
    ('N', 1e30),
    ('d', 1e33),
    ('D', 1e33),
    ('U', 1e36),
];

const PREFIX_DECORATIONS: &[char] = &['$', 'x'];

pub fn normalize(text: &str) -> f64 {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim_start_matches(PREFIX_DECORATIONS).trim();
    if cleaned.is_empty() {
        return 0.0;
    }

    let (digits, multiplier) = split_suffix(cleaned);
    match digits.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => {
            let scaled = value * multiplier;
            if scaled.is_finite() {
                scaled
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Rounded integer form of [`normalize`], saturating at the `i64` range.
pub fn normalize_int(text: &str) -> i64 {
    // `as` saturates on overflow.
    normalize(text).round() as i64
}

pub fn looks_numeric(text: &str) -> bool {
    text.trim()
        .trim_start_matches(PREFIX_DECORATIONS)
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.' || c == '-')
}

fn split_suffix(text: &str) -> (&str, f64) {
    for (suffix, multiplier) in LONG_SUFFIXES {
        if let Some(digits) = text.strip_suffix(*suffix) {
            return (digits, *multiplier);
        }
    }
    if let Some(last) = text.chars().last() {
        if let Some((_, multiplier)) = SHORT_SUFFIXES.iter().find(|(c, _)| *c == last) {
            return (&text[..text.len() - last.len_utf8()], *multiplier);
        }
    }
    (text, 1.0)
}
