use anyhow::{anyhow, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// Most spaces a single space element may expand to
const MAX_REPEATED_SPACES: usize = 1024;

/// Element names that carry paragraph text in an office XML part
pub struct ParagraphTags {
    /// Elements that delimit a paragraph
    pub paragraphs: &'static [&'static [u8]],
    /// Element holding run text. `None` takes all text inside a paragraph.
    pub text: Option<&'static [u8]>,
    /// Element that inline tabs, breaks and spaces must sit in. `None`
    /// accepts them anywhere inside a paragraph.
    pub run: Option<&'static [u8]>,
    pub tab: &'static [u8],
    pub line_breaks: &'static [&'static [u8]],
    /// Space element with an optional repeat count attribute
    pub space: Option<(&'static [u8], &'static str)>,
}

pub const ODT_TAGS: ParagraphTags = ParagraphTags {
    paragraphs: &[b"text:p", b"text:h"],
    text: None,
    run: None,
    tab: b"text:tab",
    line_breaks: &[b"text:line-break"],
    space: Some((b"text:s", "text:c")),
};

pub const DOCX_TAGS: ParagraphTags = ParagraphTags {
    paragraphs: &[b"w:p"],
    text: Some(b"w:t"),
    run: Some(b"w:r"),
    tab: b"w:tab",
    line_breaks: &[b"w:br", b"w:cr"],
    space: None,
};

/// Read one member of an office document archive as UTF-8
pub fn read_archive_member(bytes: Vec<u8>, member: &str) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("Document is not a valid ZIP container")?;
    let mut file = archive
        .by_name(member)
        .with_context(|| format!("Document has no {member} part"))?;

    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .with_context(|| format!("Failed to read {member}"))?;
    Ok(xml)
}

/// Collect paragraph text, one paragraph per line
pub fn extract_paragraphs(xml: &str, tags: &ParagraphTags) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut para_depth = 0usize;
    let mut text_depth = 0usize;
    let mut run_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if tags.paragraphs.contains(&name.as_ref()) {
                    para_depth += 1;
                } else if tags.text == Some(name.as_ref()) {
                    text_depth += 1;
                } else if tags.run == Some(name.as_ref()) {
                    run_depth += 1;
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if tags.paragraphs.contains(&name.as_ref()) {
                    if para_depth == 0 {
                        paragraphs.push(String::new());
                    }
                } else if para_depth > 0 && (tags.run.is_none() || run_depth > 0) {
                    push_inline(&e, tags, &mut current)?;
                }
            }
            Ok(Event::Text(t)) => {
                let capture = match tags.text {
                    Some(_) => text_depth > 0,
                    None => para_depth > 0,
                };
                if capture {
                    let text = t.unescape().context("Invalid escape in document text")?;
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if tags.paragraphs.contains(&name.as_ref()) && para_depth > 0 {
                    para_depth -= 1;
                    if para_depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                } else if tags.text == Some(name.as_ref()) && text_depth > 0 {
                    text_depth -= 1;
                } else if tags.run == Some(name.as_ref()) && run_depth > 0 {
                    run_depth -= 1;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "Malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}

fn push_inline(e: &BytesStart<'_>, tags: &ParagraphTags, current: &mut String) -> Result<()> {
    let name = e.name();
    if name.as_ref() == tags.tab {
        current.push('\t');
    } else if tags.line_breaks.contains(&name.as_ref()) {
        current.push('\n');
    } else if let Some((space, count_attr)) = tags.space {
        if name.as_ref() == space {
            let count = match e.try_get_attribute(count_attr)? {
                Some(attr) => std::str::from_utf8(&attr.value)
                    .ok()
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(1),
                None => 1,
            };
            current.push_str(&" ".repeat(count.min(MAX_REPEATED_SPACES)));
        }
    }
    Ok(())
}
