//! Summary rendering: the small markdown subset models answer with.
//!
//! Two constructs are recognised, everything else is verbatim text:
//!
//! - a line starting with `*` is a bullet item (its remainder, trimmed, is the content);
//!   a line starting with `**` opens a bold span instead;
//! - `**…**` inside a line is a bold span.
//!
//! [`copy_text`] is stricter: it also drops `*…*` and `***…***` emphasis.
//!
//! All functions here are pure. Rendering the same summary twice yields the
//! same blocks, and the stored summary is only ever borrowed.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// One rendered line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "spans", rename_all = "snake_case")]
pub enum Block {
    Bullet(Vec<Span>),
    Paragraph(Vec<Span>),
}

impl Block {
    pub fn spans(&self) -> &[Span] {
        match self {
            Block::Bullet(spans) | Block::Paragraph(spans) => spans,
        }
    }
}

/// A run of text inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", content = "text", rename_all = "snake_case")]
pub enum Span {
    Plain(String),
    Bold(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(t) | Span::Bold(t) => t,
        }
    }
}

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());

/// A `***`, `**` or `*` pair hugging non-blank text, longest delimiter first.
static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\*\*\*([^*\s](?:[^*]*[^*\s])?)\*\*\*",
        r"|\*\*([^*\s](?:[^*]*[^*\s])?)\*\*",
        r"|\*([^*\s](?:[^*]*[^*\s])?)\*",
    ))
    .unwrap()
});

/// Render `summary` into display blocks.
///
/// With `highlight` off, bold delimiters are still stripped but the text is
/// not emphasised.
pub fn render(summary: &str, highlight: bool) -> Vec<Block> {
    summary
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match bullet_content(line) {
            Some(content) => Block::Bullet(parse_spans(content, highlight)),
            None => Block::Paragraph(parse_spans(line, highlight)),
        })
        .collect()
}

/// Plain prose for the clipboard: bullet markers and every emphasis
/// delimiter (`*…*`, `**…**`, `***…***`, nested or not) removed. A lone `*`
/// between spaces, as in `2 * 3`, is text and stays.
pub fn copy_text(summary: &str) -> String {
    summary
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| strip_emphasis(bullet_content(line).unwrap_or(line)))
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Terminal rendering: `•` bullets and ANSI bold.
pub fn to_ansi(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|block| {
            let body: String = block
                .spans()
                .iter()
                .map(|span| match span {
                    Span::Plain(t) => t.clone(),
                    Span::Bold(t) => format!("\x1b[1m{t}\x1b[0m"),
                })
                .collect();
            match block {
                Block::Bullet(_) => format!("  • {body}"),
                Block::Paragraph(_) => body,
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bullet_content(trimmed: &str) -> Option<&str> {
    if trimmed.starts_with('*') && !trimmed.starts_with("**") {
        Some(trimmed[1..].trim())
    } else {
        None
    }
}

/// Peel emphasis pairs innermost first until none are left.
fn strip_emphasis(line: &str) -> String {
    let mut text = line.to_string();
    loop {
        let next = RE_EMPHASIS
            .replace_all(&text, |caps: &Captures| {
                (1..=3)
                    .find_map(|i| caps.get(i))
                    .map_or("", |m| m.as_str())
                    .to_string()
            })
            .into_owned();
        if next == text {
            return text;
        }
        text = next;
    }
}

fn parse_spans(content: &str, highlight: bool) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for caps in RE_BOLD.captures_iter(content) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            push_plain(&mut spans, &content[last..whole.start()]);
        }
        if highlight {
            spans.push(Span::Bold(inner.as_str().to_string()));
        } else {
            push_plain(&mut spans, inner.as_str());
        }
        last = whole.end();
    }
    if last < content.len() {
        push_plain(&mut spans, &content[last..]);
    }
    spans
}

/// Append plain text, merging with a preceding plain span.
fn push_plain(spans: &mut Vec<Span>, text: &str) {
    if let Some(Span::Plain(prev)) = spans.last_mut() {
        prev.push_str(text);
    } else {
        spans.push(Span::Plain(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> Span {
        Span::Plain(s.to_string())
    }

    fn bold(s: &str) -> Span {
        Span::Bold(s.to_string())
    }

    #[test]
    fn bullet_with_bold_then_paragraph() {
        let blocks = render("* **Point** detail\nPlain line", true);
        assert_eq!(
            blocks,
            vec![
                Block::Bullet(vec![bold("Point"), plain(" detail")]),
                Block::Paragraph(vec![plain("Plain line")]),
            ]
        );
    }

    #[test]
    fn highlight_off_strips_delimiters_without_emphasis() {
        let blocks = render("* **Point** detail", false);
        assert_eq!(blocks, vec![Block::Bullet(vec![plain("Point detail")])]);
    }

    #[test]
    fn blank_lines_are_dropped() {
        let blocks = render("\n\nFirst\n   \n\r\nSecond\n", true);
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| matches!(b, Block::Paragraph(_))));
    }

    #[test]
    fn leading_bold_is_not_a_bullet() {
        let blocks = render("**Key:** value", true);
        assert_eq!(blocks, vec![Block::Paragraph(vec![bold("Key:"), plain(" value")])]);
    }

    #[test]
    fn bullet_without_space() {
        let blocks = render("*tight", true);
        assert_eq!(blocks, vec![Block::Bullet(vec![plain("tight")])]);
    }

    #[test]
    fn multiple_bold_spans_keep_order() {
        let blocks = render("a **b** c **d**", true);
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![plain("a "), bold("b"), plain(" c "), bold("d")])]
        );
    }

    #[test]
    fn unmatched_delimiters_stay_verbatim() {
        let blocks = render("2 ** 3 is eight", true);
        assert_eq!(blocks, vec![Block::Paragraph(vec![plain("2 ** 3 is eight")])]);
    }

    #[test]
    fn rendering_is_idempotent() {
        let summary = "Intro **bold**\n* one\n* **two** more\nOutro";
        assert_eq!(render(summary, true), render(summary, true));
        assert_eq!(copy_text(summary), copy_text(summary));
    }

    #[test]
    fn copy_text_has_no_markers() {
        let summary = "**Title** intro\n* **Point** detail\n*tight\n\nEnd";
        let copied = copy_text(summary);
        assert_eq!(copied, "Title intro\nPoint detail\ntight\nEnd");
        assert!(!copied.contains('*'));
    }

    #[test]
    fn copy_text_strips_single_and_triple_emphasis() {
        assert_eq!(copy_text("***Key idea*** matters"), "Key idea matters");
        assert_eq!(copy_text("* item with *emphasis*"), "item with emphasis");
        assert_eq!(copy_text("**bold with *nested* part**"), "bold with nested part");
        assert_eq!(copy_text("*  spaced bullet with **two** and *one*"), "spaced bullet with two and one");
    }

    #[test]
    fn copy_text_of_emphasis_heavy_output_has_no_markers() {
        let summary = "***Overview:*** the paper *proposes* a **new** model.\n\
                       * ***Attention*** only\n\
                       *   *No* recurrence, **no *convolutions***\n\
                       **Results:** strong *BLEU*";
        let copied = copy_text(summary);
        assert!(!copied.contains('*'), "markers left in {copied:?}");
        assert_eq!(
            copied,
            "Overview: the paper proposes a new model.\n\
             Attention only\n\
             No recurrence, no convolutions\n\
             Results: strong BLEU"
        );
    }

    #[test]
    fn copy_text_keeps_arithmetic_stars() {
        assert_eq!(copy_text("2 * 3 = 6"), "2 * 3 = 6");
    }

    #[test]
    fn ansi_output_marks_bullets_and_bold() {
        let out = to_ansi(&render("* **Point** detail\nPlain line", true));
        assert_eq!(out, "  • \x1b[1mPoint\x1b[0m detail\nPlain line");
    }

    #[test]
    fn blocks_serialise_with_type_tags() {
        let json = serde_json::to_string(&render("* **P** d", true)).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"bullet","spans":[{"style":"bold","text":"P"},{"style":"plain","text":" d"}]}]"#
        );
    }
}
