use std::borrow::Cow;

/// Strip control characters from feed-provided text before it reaches the
/// terminal. Newlines survive; tabs become spaces; everything else in the
/// control range (ESC included) is dropped.
pub fn sanitize(input: &str) -> Cow<'_, str> {
    if !input.chars().any(needs_scrub) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\t' => out.push(' '),
            '\r' => {}
            ch if ch.is_control() && ch != '\n' => {}
            ch => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Single-line variant for titles and labels.
pub fn sanitize_line(input: &str) -> String {
    sanitize(input)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn needs_scrub(ch: char) -> bool {
    ch.is_control() && ch != '\n'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(sanitize("Pillars of Creation"), Cow::Borrowed(_)));
    }

    #[test]
    fn strips_escape_sequences() {
        let hostile = "M31\x1b]52;c;ZXZpbA==\x07 galaxy\x1b[2J";
        assert_eq!(sanitize(hostile), "M31]52;c;ZXZpbA== galaxy[2J");
    }

    #[test]
    fn keeps_newlines_and_expands_tabs() {
        assert_eq!(sanitize("a\tb\r\nc"), "a b\nc");
    }

    #[test]
    fn sanitize_line_collapses_whitespace() {
        assert_eq!(sanitize_line("  The\nHorsehead   Nebula "), "The Horsehead Nebula");
    }
}
