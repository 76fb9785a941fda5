//! Escaping and light markup helpers for the rendered pages.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("code pattern is valid"));

/// Escape text for use in HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serialize a value as JSON that can be embedded in a `<script>` block.
pub fn script_safe_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn render_inline(text: &str) -> String {
    let text = BOLD_RE.replace_all(text, "<strong>$1</strong>");
    CODE_RE.replace_all(&text, "<code>$1</code>").into_owned()
}

/// Convert an aggregator explanation into HTML.
///
/// Supports `##`/`###` headings, `- ` list items, `**bold**` and
/// `` `code` ``. Explanations are authored in this crate, so embedded
/// HTML is passed through unchanged.
pub fn render_explanation(text: &str) -> String {
    let mut html = String::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut in_list = false;

    fn flush(html: &mut String, paragraph: &mut Vec<&str>) {
        if !paragraph.is_empty() {
            html.push_str(&format!("<p>{}</p>\n", render_inline(&paragraph.join(" "))));
            paragraph.clear();
        }
    }

    for line in text.lines() {
        let line = line.trim();

        if let Some(item) = line.strip_prefix("- ") {
            flush(&mut html, &mut paragraph);
            if !in_list {
                html.push_str("<ul>\n");
                in_list = true;
            }
            html.push_str(&format!("<li>{}</li>\n", render_inline(item)));
            continue;
        }

        if in_list {
            html.push_str("</ul>\n");
            in_list = false;
        }

        if line.is_empty() {
            flush(&mut html, &mut paragraph);
        } else if let Some(heading) = line.strip_prefix("### ") {
            flush(&mut html, &mut paragraph);
            html.push_str(&format!("<h3>{}</h3>\n", render_inline(heading)));
        } else if let Some(heading) = line.strip_prefix("## ") {
            flush(&mut html, &mut paragraph);
            html.push_str(&format!("<h2>{}</h2>\n", render_inline(heading)));
        } else {
            paragraph.push(line);
        }
    }

    flush(&mut html, &mut paragraph);
    if in_list {
        html.push_str("</ul>\n");
    }

    html
}
