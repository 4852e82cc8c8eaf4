//! Pattern list format: prefixes separated by `|`, no escaping

/// Separator between prefixes in a pattern list
pub const DELIMITER: char = '|';

/// Every segment of a pattern list in order, empty ones included
pub fn segments(list: &str) -> impl Iterator<Item = &str> {
    list.split(DELIMITER)
}

/// Render patterns back into a pattern list
pub fn join_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, pattern) in patterns.into_iter().enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(pattern);
    }
    out
}
