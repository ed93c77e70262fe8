//! Extraction helpers for puzzle-site pages.
//!
//! The pages are small and regular, so targeted patterns are enough: puzzle
//! parts live in `<article>` elements and solved parts are followed by a
//! "Your puzzle answer was" paragraph.

use std::sync::LazyLock;

use regex::Regex;

static ARTICLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article[^>]*>(.*?)</article>").unwrap());

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2[^>]*>\s*-*\s*(.*?)\s*-*\s*</h2>").unwrap());

static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Your puzzle answer was\s*<code>(.*?)</code>").unwrap()
});

static PRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre[^>]*>\s*(?:<code[^>]*>)?(.*?)(?:</code>)?\s*</pre>").unwrap()
});

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h2[^>]*>(.*?)</h2>").unwrap());

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<code[^>]*>(.*?)</code>").unwrap());

static EM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<em[^>]*>(.*?)</em>").unwrap());

static LI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap());

static BLOCK_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</(p|ul|ol|h2)>").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());

static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Inner HTML of every `<article>` on the page, in document order.
pub fn articles(html: &str) -> Vec<&str> {
    ARTICLE_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

/// Puzzle title from the first heading, without the surrounding dashes.
pub fn title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(&strip_tags(m.as_str())).trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Answers shown for solved parts, part 1 first.
pub fn solved_answers(html: &str) -> Vec<String> {
    ANSWER_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| decode_entities(&strip_tags(m.as_str())).trim().to_string())
        .collect()
}

/// Plain text of the first article, or of the whole page without one.
pub fn main_text(html: &str) -> String {
    let body = articles(html).into_iter().next().unwrap_or(html);
    decode_entities(&strip_tags(body)).trim().to_string()
}

pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").into_owned()
}

pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Convert article HTML to Markdown.
///
/// Handles the elements puzzle text uses: headings, paragraphs, lists,
/// links, emphasis, inline code and preformatted blocks.
pub fn to_markdown(html: &str) -> String {
    let md = PRE_RE.replace_all(html, |c: &regex::Captures<'_>| {
        format!("\n```\n{}\n```\n", strip_tags(&c[1]).trim_end())
    });
    let md = HEADING_RE.replace_all(&md, |c: &regex::Captures<'_>| {
        format!("\n## {}\n", strip_tags(&c[1]).trim())
    });
    let md = LINK_RE.replace_all(&md, "[$2]($1)");
    let md = CODE_RE.replace_all(&md, "`$1`");
    let md = EM_RE.replace_all(&md, "**$1**");
    let md = LI_RE.replace_all(&md, |c: &regex::Captures<'_>| {
        format!("- {}\n", c[1].trim())
    });
    let md = BLOCK_END_RE.replace_all(&md, "\n\n");
    let md = decode_entities(&strip_tags(&md));
    BLANK_LINES_RE.replace_all(md.trim(), "\n\n").into_owned()
}
