//! Minimal tag scanning for hand-maintained municipal pages.
//!
//! Good enough for flat `<h2>`/`<li>`/`<td>` content. Nested elements of the same tag are not
//! supported.

/// One `<tag ...>inner</tag>` occurrence with byte offsets into the scanned document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Block<'a> {
    pub start: usize,
    pub end: usize,
    pub inner: &'a str,
}

impl Block<'_> {
    pub fn text(&self) -> String {
        text(self.inner)
    }
}

/// Every `tag` block at or after byte `from`, matched case-insensitively.
pub(crate) fn blocks<'a>(html: &'a str, tag: &str, from: usize) -> Vec<Block<'a>> {
    // ASCII lowercasing keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();
    let open = format!("<{}", tag.to_ascii_lowercase());
    let close = format!("</{}>", tag.to_ascii_lowercase());

    let mut out = Vec::new();
    let mut pos = from;
    while let Some(rel) = lower.get(pos..).and_then(|rest| rest.find(&open)) {
        let start = pos + rel;
        let name_end = start + open.len();
        if !matches!(
            lower.as_bytes().get(name_end),
            Some(b'>' | b' ' | b'\t' | b'\r' | b'\n' | b'/')
        ) {
            pos = name_end;
            continue;
        }
        let Some(open_end) = lower[name_end..].find('>').map(|i| name_end + i + 1) else {
            break;
        };
        let Some(close_rel) = lower[open_end..].find(&close) else {
            break;
        };
        let inner_end = open_end + close_rel;
        let end = inner_end + close.len();
        out.push(Block {
            start,
            end,
            inner: &html[open_end..inner_end],
        });
        pos = end;
    }
    out
}

/// Visible text of an HTML fragment: tags dropped, common entities decoded, whitespace collapsed.
pub(crate) fn text(fragment: &str) -> String {
    let mut stripped = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
