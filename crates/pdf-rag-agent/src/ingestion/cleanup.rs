//! Normalisation of raw PDF text

/// Typographic characters PDF fonts commonly emit, with their plain-text
/// replacements
const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),   // Hyphen
    ('\u{2011}', "-"),   // Non-breaking hyphen
    ('\u{2013}', "-"),   // En dash
    ('\u{2014}', "--"),  // Em dash
    ('\u{2018}', "'"),   // Left single quote
    ('\u{2019}', "'"),   // Right single quote
    ('\u{201C}', "\""),  // Left double quote
    ('\u{201D}', "\""),  // Right double quote
    ('\u{2022}', "* "),  // Bullet
    ('\u{2026}', "..."), // Ellipsis
    ('\u{00A0}', " "),   // Non-breaking space
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Clean up extracted PDF text: map ligatures and typographic punctuation to
/// ASCII, drop NUL bytes, trim every line and remove blank lines.
pub fn cleanup_pdf_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\0' {
            continue;
        }
        match REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => result.push_str(to),
            None => result.push(c),
        }
    }

    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
