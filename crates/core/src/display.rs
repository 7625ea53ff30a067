//! Rendering-safe token labels.
//!
//! Token text frequently consists of nothing but whitespace or control
//! characters; shown verbatim those render as empty chips. This transform
//! maps them to visible glyphs. It is presentation-only: concatenation
//! always uses the raw token text.

/// Build the display label for a raw token text.
///
/// Whitespace-only tokens collapse to a count (`␠` for a single space,
/// `␠×N` otherwise). In mixed content, spaces become `␠`, common control
/// characters get a glyph plus their escape (`⏎\n`, `⇥\t`, `␍\r`), and any
/// other control character is shown as `⟦U+XXXX⟧`.
pub fn token_display(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    if raw.chars().all(char::is_whitespace) {
        let mut chars = raw.chars();
        if let (Some(only), None) = (chars.next(), chars.next()) {
            if let Some(label) = whitespace_glyph(only) {
                return label.to_string();
            }
        }
        return format!("␠×{}", raw.chars().count());
    }

    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            ' ' => out.push('␠'),
            '\n' => out.push_str("⏎\\n"),
            '\t' => out.push_str("⇥\\t"),
            '\r' => out.push_str("␍\\r"),
            c if c.is_control() => {
                out.push_str(&format!("⟦U+{:04X}⟧", c as u32));
            }
            c => out.push(c),
        }
    }
    out
}

fn whitespace_glyph(ch: char) -> Option<&'static str> {
    match ch {
        ' ' => Some("␠"),
        '\n' => Some("⏎\\n"),
        '\t' => Some("⇥\\t"),
        '\r' => Some("␍\\r"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(token_display("Hello"), "Hello");
    }

    #[test]
    fn leading_space_becomes_glyph() {
        assert_eq!(token_display(" world"), "␠world");
    }

    #[test]
    fn single_space_token() {
        assert_eq!(token_display(" "), "␠");
    }

    #[test]
    fn space_run_shows_count() {
        assert_eq!(token_display("   "), "␠×3");
    }

    #[test]
    fn newline_and_tab_tokens() {
        assert_eq!(token_display("\n"), "⏎\\n");
        assert_eq!(token_display("\t"), "⇥\\t");
        assert_eq!(token_display("\r"), "␍\\r");
    }

    #[test]
    fn mixed_whitespace_shows_count() {
        assert_eq!(token_display(" \n"), "␠×2");
    }

    #[test]
    fn embedded_newline_in_text() {
        assert_eq!(token_display("a\nb"), "a⏎\\nb");
    }

    #[test]
    fn control_character_is_escaped() {
        assert_eq!(token_display("x\u{7}"), "x⟦U+0007⟧");
    }

    #[test]
    fn empty_token_stays_empty() {
        assert_eq!(token_display(""), "");
    }

    #[test]
    fn unicode_passes_through() {
        assert_eq!(token_display("héllo"), "héllo");
    }
}
