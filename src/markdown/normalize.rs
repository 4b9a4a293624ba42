//! Deterministic cleanup of emitted Markdown.
//!
//! Rules run in a fixed order and each one is a no-op on text it does not
//! match. The whole pass is repeated until the output stops changing, so
//! `normalize(normalize(x)) == normalize(x)`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::caption::classify;
use crate::model::ConversionRecord;

const MAX_ROUNDS: usize = 8;

/// Normalize without any image conversion records.
pub fn normalize(text: &str) -> String {
    Normalizer::default().normalize(text)
}

#[derive(Default)]
pub struct Normalizer {
    rewrites: Vec<(Regex, String)>,
}

impl Normalizer {
    /// Links to a converted file are rewritten to its replacement.
    pub fn new(conversions: &[ConversionRecord]) -> Self {
        let rewrites = conversions
            .iter()
            .filter(|c| c.from != c.to)
            .filter_map(|c| {
                let pattern = format!(
                    r"\]\(((?:[^()\s]*/)?){}\)",
                    regex::escape(&c.from.replace(' ', "%20"))
                );
                Regex::new(&pattern)
                    .ok()
                    .map(|re| (re, c.to.replace(' ', "%20")))
            })
            .collect();
        Self { rewrites }
    }

    pub fn normalize(&self, text: &str) -> String {
        let mut current = self.round(text);
        for _ in 1..MAX_ROUNDS {
            let next = self.round(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn round(&self, text: &str) -> String {
        let s = normalise_line_endings(text);
        let s = html_images_to_markdown(&s);
        let s = until_stable(s, strip_markup_tags);
        let s = until_stable(s, strip_image_attributes);
        let s = fix_nested_toc_links(&s);
        let s = until_stable(s, dedupe_caption_tokens);
        let s = self.rewrite_converted_links(&s);
        let s = trim_trailing_whitespace(&s);
        let s = collapse_blank_lines(&s);
        let s = dedupe_adjacent_caption_blocks(&s);
        finish(&s)
    }

    fn rewrite_converted_links(&self, input: &str) -> String {
        let mut out = input.to_string();
        for (re, to) in &self.rewrites {
            out = re
                .replace_all(&out, |caps: &Captures<'_>| format!("]({}{})", &caps[1], to))
                .into_owned();
        }
        out
    }
}

fn until_stable(mut s: String, rule: fn(&str) -> String) -> String {
    loop {
        let next = rule(&s);
        if next == s {
            return s;
        }
        s = next;
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

static RE_HTML_IMG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img\s[^>]*?src\s*=\s*"([^"]*)"[^>]*>"#).unwrap());

fn html_images_to_markdown(input: &str) -> String {
    RE_HTML_IMG.replace_all(input, "![]($1)").into_owned()
}

// Autolinks like <https://…> do not match: the scheme is followed by ':'.
static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>").unwrap());

fn strip_markup_tags(input: &str) -> String {
    RE_TAG.replace_all(input, "").into_owned()
}

static RE_IMAGE_ATTRS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!\[[^\]\n]*\]\([^)\n]*\))\{[^}\n]*\}").unwrap());

fn strip_image_attributes(input: &str) -> String {
    RE_IMAGE_ATTRS.replace_all(input, "$1").into_owned()
}

// [1 Introduction [2](#introduction)](#introduction) -> [1 Introduction](#introduction)
static RE_NESTED_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]\n]+?) \[[^\]\n]*\]\((#[^)\s]+)\)\]\(#[^)\s]+\)").unwrap()
});

fn fix_nested_toc_links(input: &str) -> String {
    RE_NESTED_LINK.replace_all(input, "[$1]($2)").into_owned()
}

static RE_DOUBLE_CAPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\*\*Figure[ \t\u{a0}]+(\d+)\*\*|Figure[ \t\u{a0}]+(\d+))[ \t\u{a0}]+Figure[ \t\u{a0}]+(\d+)\b",
    )
    .unwrap()
});

/// `**Figure 4** Figure 1 …` keeps the plain token; `Figure 3 Figure 3 …`
/// keeps one copy. Distinct plain numbers are left alone.
fn dedupe_caption_tokens(input: &str) -> String {
    RE_DOUBLE_CAPTION
        .replace_all(input, |caps: &Captures<'_>| {
            let second = &caps[3];
            match (caps.get(1), caps.get(2)) {
                (Some(_), _) => format!("Figure {second}"),
                (None, Some(first)) if first.as_str() == second => format!("Figure {second}"),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

fn is_caption_block(block: &str) -> bool {
    let inner = block.trim().trim_matches('*');
    !inner.contains('\n') && classify(inner).is_some()
}

fn dedupe_adjacent_caption_blocks(input: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    for block in input.split("\n\n") {
        let duplicate = is_caption_block(block) && kept.last().is_some_and(|prev| *prev == block);
        if !duplicate {
            kept.push(block);
        }
    }
    kept.join("\n\n")
}

fn finish(input: &str) -> String {
    let trimmed = input.trim_start_matches('\n').trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
