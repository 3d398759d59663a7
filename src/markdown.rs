//! Reply text preparation for Telegram's legacy Markdown parse mode.

/// Characters that open an entity in legacy Markdown
const MARKDOWN_SPECIAL: &[char] = &['_', '*', '`', '['];

/// Replace `:shortcode:` sequences with their emoji. Unknown shortcodes are kept verbatim.
pub fn resolve_emoji(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(':') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let resolved = after.find(':').and_then(|end| {
            emojis::get_by_shortcode(&after[..end]).map(|emoji| (emoji.as_str(), end))
        });

        match resolved {
            Some((glyph, end)) => {
                out.push_str(glyph);
                rest = &after[end + 1..];
            }
            None => {
                out.push(':');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Escape every entity-opening character so the text renders literally
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape underscores so they survive Markdown parsing as literal characters
pub fn escape_underscores(text: &str) -> String {
    text.replace('_', "\\_")
}
