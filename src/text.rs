// src/text.rs
//! Text normalization shared by the free-text path and the timeline aggregator.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Separator used for line breaks and between aggregated posts.
pub const SEPARATOR: &str = ",";

/// Marks the end of directly submitted text; the models were trained with it.
pub const DELIMITER: &str = "#DEMI#";

/// Placeholder for URLs in posts carrying a photo.
pub const PHOTO_PLACEHOLDER: &str = ".PHOTOIMAGE.";

/// Placeholder for every other URL (quoted posts, platform-internal links).
pub const QUOTATION_PLACEHOLDER: &str = ".QUOTATION.";

/// Replace each line-break variant (`\r\n`, `\r`, `\n`) with `sep`.
///
/// `\r\n` counts as one break. Idempotent as long as `sep` contains no line break.
pub fn normalize_newlines(text: &str, sep: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str(sep);
            }
            '\n' => out.push_str(sep),
            other => out.push(other),
        }
    }
    out
}

fn url_regex() -> &'static Regex {
    static RE_URL: OnceCell<Regex> = OnceCell::new();
    RE_URL.get_or_init(|| {
        Regex::new(r"https?://[\w/:%#$&?()~.=+\-]+").expect("url regex")
    })
}

/// Replace every embedded http(s) URL with `placeholder`.
pub fn replace_urls(text: &str, placeholder: &str) -> String {
    url_regex().replace_all(text, placeholder).into_owned()
}

/// Free-text path: newlines collapsed to `,` and the delimiter appended.
pub fn prepare_submitted(text: &str) -> String {
    format!("{}{}", normalize_newlines(text, SEPARATOR), DELIMITER)
}
