// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use itertools::Itertools;
use pulldown_cmark::{Event, Parser};
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// Lower-cased, accent-folded, whitespace-collapsed copy of `input`.
///
/// This is the form stored in the normalized search columns and the form
/// search queries are reduced to before substring matching.
pub fn normalize_text(input: &str) -> String {
    input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// Visible text of an HTML fragment: scripts and styles dropped, tags
/// replaced by spaces, entities decoded.
pub fn html_to_text(html: &str) -> String {
    let without_blocks = SCRIPT_BLOCK.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_blocks, " ");
    html_escape::decode_html_entities(&without_tags).into_owned()
}

pub fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    for event in Parser::new(markdown) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::Html(html) | Event::InlineHtml(html) => out.push_str(&html_to_text(&html)),
            Event::SoftBreak | Event::HardBreak | Event::End(_) => out.push(' '),
            _ => {}
        }
    }
    out
}
