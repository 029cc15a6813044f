//! Markdown rendering using pulldown-cmark.
//!
//! On top of CommonMark:
//! - leading `---` front matter is skipped
//! - `[!INCLUDE [title](path)]` lines are replaced by the rendered include
//! - `<xref:uid>` autolinks resolve through the xref resolver
//! - headings get slug ids, raw HTML contributes its `id`/`name` attributes

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd, html};
use regex::Regex;

use super::{LinkSink, MarkupRenderer, RenderOutput};
use crate::error::BuildError;

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\[!INCLUDE\s*\[[^\]]*\]\(\s*<?([^)>]+?)>?\s*\)\s*\]\s*$").unwrap()
});

static HTML_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b(?:id|name)\s*=\s*["']([^"']+)["']"#).unwrap());

#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_HEADING_ATTRIBUTES,
        }
    }

    /// Render one include-free chunk starting at 1-based line `first_line`.
    fn render_chunk(
        &self,
        chunk: &str,
        first_line: usize,
        links: &dyn LinkSink,
        out: &mut RenderOutput,
    ) -> Result<(), BuildError> {
        if chunk.trim().is_empty() {
            return Ok(());
        }

        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(chunk.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        let line_of = |offset: usize| first_line + line_starts.partition_point(|&s| s <= offset) - 1;

        let mut events: Vec<Event<'_>> = Vec::new();
        let mut heading: Option<PendingHeading<'_>> = None;
        let mut autolink_text: Option<String> = None;

        for (event, range) in Parser::new_ext(chunk, self.options).into_offset_iter() {
            let line = Some(line_of(range.start));
            if let Event::Html(raw) | Event::InlineHtml(raw) = &event {
                out.ids
                    .extend(HTML_ID.captures_iter(raw).map(|caps| caps[1].to_string()));
            }

            let event = match event {
                Event::Start(Tag::Link {
                    link_type: LinkType::Autolink,
                    dest_url,
                    title,
                    id,
                }) if dest_url
                    .get(..5)
                    .is_some_and(|scheme| scheme.eq_ignore_ascii_case("xref:")) =>
                {
                    let uid = &dest_url[5..];
                    let link = links.xref(uid, line)?;
                    autolink_text = Some(link.display.unwrap_or_else(|| uid.to_string()));
                    Event::Start(Tag::Link {
                        link_type: LinkType::Autolink,
                        dest_url: CowStr::from(link.href),
                        title,
                        id,
                    })
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => Event::Start(Tag::Link {
                    link_type,
                    dest_url: CowStr::from(links.link(&dest_url, line)?.href),
                    title,
                    id,
                }),
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => Event::Start(Tag::Image {
                    link_type,
                    dest_url: CowStr::from(links.link(&dest_url, line)?.href),
                    title,
                    id,
                }),
                Event::Text(_) if autolink_text.is_some() => continue,
                Event::End(TagEnd::Link) => {
                    if let Some(text) = autolink_text.take() {
                        push(&mut events, &mut heading, Event::Text(CowStr::from(text)));
                    }
                    Event::End(TagEnd::Link)
                }
                other => other,
            };

            match event {
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) => {
                    heading = Some(PendingHeading {
                        level,
                        id,
                        classes,
                        attrs,
                        events: Vec::new(),
                        text: String::new(),
                    });
                }
                Event::End(TagEnd::Heading(_)) if heading.is_some() => {
                    if let Some(pending) = heading.take() {
                        pending.finish(&mut events, &mut out.ids);
                    }
                }
                event => push(&mut events, &mut heading, event),
            }
        }

        html::push_html(&mut out.html, events.into_iter());
        Ok(())
    }
}

impl MarkupRenderer for MarkdownRenderer {
    fn render(&self, text: &str, links: &dyn LinkSink) -> Result<RenderOutput, BuildError> {
        let (body, first_line) = strip_front_matter(text);
        let mut out = RenderOutput::default();

        let mut chunk = String::new();
        let mut chunk_line = first_line;
        let mut in_fence = false;

        for (idx, line) in body.split_inclusive('\n').enumerate() {
            let line_no = first_line + idx;
            let trimmed = line.trim();
            if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
                in_fence = !in_fence;
            }

            if !in_fence && let Some(caps) = INCLUDE.captures(trimmed) {
                self.render_chunk(&chunk, chunk_line, links, &mut out)?;
                chunk.clear();
                chunk_line = line_no + 1;

                if let Some(included) = links.include(&caps[1], Some(line_no))? {
                    out.html.push_str(&included.html);
                    out.ids.extend(included.ids);
                }
                continue;
            }
            chunk.push_str(line);
        }
        self.render_chunk(&chunk, chunk_line, links, &mut out)?;

        Ok(out)
    }
}

// ============================================================================
// Headings
// ============================================================================

struct PendingHeading<'a> {
    level: HeadingLevel,
    id: Option<CowStr<'a>>,
    classes: Vec<CowStr<'a>>,
    attrs: Vec<(CowStr<'a>, Option<CowStr<'a>>)>,
    events: Vec<Event<'a>>,
    text: String,
}

impl<'a> PendingHeading<'a> {
    /// Emit the heading with an explicit or unique slug id.
    fn finish(self, events: &mut Vec<Event<'a>>, ids: &mut rustc_hash::FxHashSet<String>) {
        let id = match self.id {
            Some(id) => id.to_string(),
            None => unique_slug(&self.text, ids),
        };
        ids.insert(id.clone());

        events.push(Event::Start(Tag::Heading {
            level: self.level,
            id: Some(CowStr::from(id)),
            classes: self.classes,
            attrs: self.attrs,
        }));
        events.extend(self.events);
        events.push(Event::End(TagEnd::Heading(self.level)));
    }
}

/// Route an event into the open heading, if any.
fn push<'a>(events: &mut Vec<Event<'a>>, heading: &mut Option<PendingHeading<'a>>, event: Event<'a>) {
    match heading {
        Some(pending) => {
            if let Event::Text(text) | Event::Code(text) = &event {
                pending.text.push_str(text);
            }
            pending.events.push(event);
        }
        None => events.push(event),
    }
}

/// Lowercase, alphanumerics kept, whitespace and `-` become single dashes.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn unique_slug(text: &str, taken: &rustc_hash::FxHashSet<String>) -> String {
    let base = slugify(text);
    if !taken.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}

/// Skip a leading `---` fenced block. Returns the body and its first line.
fn strip_front_matter(text: &str) -> (&str, usize) {
    let opens = text
        .strip_prefix("---")
        .is_some_and(|rest| rest.starts_with('\n') || rest.starts_with("\r\n"));
    if !opens {
        return (text, 1);
    }

    let mut offset = 0;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if idx > 0 && line.trim_end() == "---" {
            return (&text[offset + line.len()..], idx + 2);
        }
        offset += line.len();
    }
    (text, 1)
}

// ============================================================================
// Tests
// ============================================================================
