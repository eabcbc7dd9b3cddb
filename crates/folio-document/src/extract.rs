// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-text extraction from source documents headed for text-to-PDF layout.

use std::io::{Cursor, Read};

use folio_core::error::{FolioError, Result};
use tracing::{debug, instrument};
use zip::ZipArchive;

/// Shown whenever a binary Office format is submitted.
pub const LEGACY_OFFICE_MESSAGE: &str = "Legacy formats (.doc, .xls, .ppt) are binary and need a desktop office suite to convert. Please save as .docx/.xlsx or PDF.";

/// Reject binary Office files by extension.
pub fn reject_legacy_office(name: &str) -> Result<()> {
    let lower = name.to_ascii_lowercase();
    if [".doc", ".xls", ".ppt"].iter().any(|ext| lower.ends_with(ext)) {
        return Err(FolioError::UnsupportedFormat(LEGACY_OFFICE_MESSAGE.into()));
    }
    Ok(())
}

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn open_archive<'a>(bytes: &'a [u8], kind: &str) -> Result<Archive<'a>> {
    ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| FolioError::UnsupportedFormat(format!("not a valid {kind} file: {err}")))
}

fn read_part(archive: &mut Archive<'_>, path: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(FolioError::UnsupportedFormat(format!("{path}: {err}"))),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

fn parse_xml<'a>(content: &'a str, path: &str) -> Result<roxmltree::Document<'a>> {
    roxmltree::Document::parse(content)
        .map_err(|err| FolioError::UnsupportedFormat(format!("{path} is not valid XML: {err}")))
}

/// Body text of a Word document, one line per paragraph.
#[instrument(skip_all, fields(bytes = bytes.len()))]
pub fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes, "Word")?;
    let body = read_part(&mut archive, "word/document.xml")?.ok_or_else(|| {
        FolioError::UnsupportedFormat("Word document has no word/document.xml".into())
    })?;
    let doc = parse_xml(&body, "word/document.xml")?;

    let mut paragraphs = Vec::new();
    for paragraph in doc.descendants().filter(|n| n.tag_name().name() == "p") {
        let mut line = String::new();
        for node in paragraph.descendants() {
            match node.tag_name().name() {
                "t" => line.push_str(node.text().unwrap_or_default()),
                "tab" => line.push('\t'),
                "br" | "cr" => line.push('\n'),
                _ => {}
            }
        }
        paragraphs.push(line);
    }
    let text = paragraphs.join("\n");
    if text.trim().is_empty() {
        return Err(FolioError::Validation(
            "Could not extract text from this Word document. It might be empty or contain only images.".into(),
        ));
    }
    debug!(paragraphs = paragraphs.len(), "Word text extracted");
    Ok(text)
}

/// Cell values of every worksheet, rows as tab-separated lines and sheets
/// separated by a blank line.
#[instrument(skip_all, fields(bytes = bytes.len()))]
pub fn xlsx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = open_archive(bytes, "Excel")?;

    let shared: Vec<String> = match read_part(&mut archive, "xl/sharedStrings.xml")? {
        Some(content) => {
            let doc = parse_xml(&content, "xl/sharedStrings.xml")?;
            doc.descendants()
                .filter(|n| n.tag_name().name() == "si")
                .map(|si| {
                    si.descendants()
                        .filter(|n| n.tag_name().name() == "t")
                        .filter_map(|n| n.text())
                        .collect()
                })
                .collect()
        }
        None => Vec::new(),
    };

    let mut sheets: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("xl/worksheets/") && name.ends_with(".xml"))
        .map(str::to_owned)
        .collect();
    sheets.sort_by_key(|name| sheet_number(name));

    let mut blocks = Vec::new();
    for path in &sheets {
        let Some(content) = read_part(&mut archive, path)? else {
            continue;
        };
        let doc = parse_xml(&content, path)?;
        let mut lines = Vec::new();
        for row in doc.descendants().filter(|n| n.tag_name().name() == "row") {
            let cells: Vec<String> = row
                .children()
                .filter(|n| n.tag_name().name() == "c")
                .map(|cell| cell_value(cell, &shared))
                .collect();
            if cells.iter().any(|value| !value.is_empty()) {
                lines.push(cells.join("\t"));
            }
        }
        blocks.push(lines.join("\n"));
    }
    if blocks.iter().all(|block| block.trim().is_empty()) {
        return Err(FolioError::Validation(
            "Could not find any cell values in this spreadsheet.".into(),
        ));
    }
    debug!(sheets = blocks.len(), "Spreadsheet text extracted");
    Ok(blocks.join("\n\n"))
}

fn sheet_number(path: &str) -> u32 {
    path.trim_start_matches("xl/worksheets/sheet")
        .trim_end_matches(".xml")
        .parse()
        .unwrap_or(u32::MAX)
}

fn cell_value(cell: roxmltree::Node<'_, '_>, shared: &[String]) -> String {
    let child_text = |name: &str| {
        cell.descendants()
            .filter(|n| n.tag_name().name() == name)
            .filter_map(|n| n.text())
            .collect::<String>()
    };
    match cell.attribute("t") {
        Some("s") => child_text("v")
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| shared.get(index).cloned())
            .unwrap_or_default(),
        Some("inlineStr") => child_text("t"),
        Some("b") => match child_text("v").trim() {
            "1" => "TRUE".into(),
            _ => "FALSE".into(),
        },
        _ => child_text("v"),
    }
}

/// Readable text from Markdown: markup removed, block structure kept.
pub fn markdown_text(markdown: &str) -> String {
    let mut out = Vec::new();
    let mut in_fence = false;
    for raw in markdown.lines() {
        let line = raw.trim_end();
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push(line.to_owned());
            continue;
        }
        if is_rule(trimmed) {
            out.push(String::new());
            continue;
        }
        let mut body = trimmed.trim_start_matches('#').trim_start();
        if body.len() == trimmed.len() {
            body = trimmed;
        }
        body = body.trim_start_matches('>').trim_start();
        let body = strip_list_marker(body);
        out.push(strip_inline_markdown(body));
    }
    out.join("\n")
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ["-", "*", "_"]
            .iter()
            .any(|marker| compact.chars().all(|c| c.to_string() == *marker))
}

fn strip_list_marker(line: &str) -> &str {
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest;
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0
        && let Some(rest) = line[digits..].strip_prefix(". ")
    {
        return rest;
    }
    line
}

/// Links and images keep their text; emphasis and code markers go.
fn strip_inline_markdown(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '!' if chars.get(i + 1) == Some(&'[') => i += 1,
            '[' => {
                if let Some(close) = find(&chars, i + 1, ']')
                    && chars.get(close + 1) == Some(&'(')
                    && let Some(end) = find(&chars, close + 2, ')')
                {
                    out.extend(&chars[i + 1..close]);
                    i = end + 1;
                } else {
                    out.push(c);
                    i += 1;
                }
            }
            '*' | '_' | '`' | '~' => i += 1,
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1]);
                i += 2;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn find(chars: &[char], from: usize, target: char) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|&c| c == target)
        .map(|offset| from + offset)
}

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "header", "footer", "blockquote", "pre", "table", "ul", "ol", "hr",
];

/// Visible text of an HTML document. Scripts and styles are dropped, block
/// elements end lines, common entities are decoded.
pub fn html_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;
    let mut skip_until: Option<&'static str> = None;

    while let Some(open) = rest.find('<') {
        if skip_until.is_none() {
            out.push_str(&decode_entities(&rest[..open]));
        }
        let after = &rest[open..];
        if after.starts_with("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }
        let Some(close) = after.find('>') else {
            rest = "";
            break;
        };
        let tag = &after[1..close];
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        let closing = tag.starts_with('/');

        match (skip_until, closing) {
            (Some(until), true) if name == until => skip_until = None,
            (Some(_), _) => {}
            (None, false) if name == "script" => skip_until = Some("script"),
            (None, false) if name == "style" => skip_until = Some("style"),
            (None, _) if BLOCK_TAGS.contains(&name.as_str()) => {
                if !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
            }
            _ => {}
        }
        rest = &after[close + 1..];
    }
    if skip_until.is_none() {
        out.push_str(&decode_entities(rest));
    }

    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let decoded = after.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &after[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, end))
        });
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::{Part, build_package, xlsx_from_rows};

    fn docx(body: &str) -> Vec<u8> {
        build_package(&[
            Part::new("[Content_Types].xml", "<Types/>"),
            Part::new(
                "word/document.xml",
                format!(
                    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
                ),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let bytes = docx(
            "<w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space=\"preserve\"> world</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t><w:tab/><w:t>col</w:t></w:r></w:p>",
        );
        assert_eq!(docx_text(&bytes).unwrap(), "Hello world\nSecond\tcol");
    }

    #[test]
    fn empty_docx_is_a_validation_error() {
        let bytes = docx("<w:p/>");
        assert!(matches!(docx_text(&bytes), Err(FolioError::Validation(_))));
    }

    #[test]
    fn non_zip_is_unsupported() {
        assert!(matches!(
            docx_text(b"plain text"),
            Err(FolioError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn xlsx_rows_are_tab_separated() {
        let rows = vec![
            vec!["Name".to_owned(), "Qty".to_owned()],
            vec!["Apples".to_owned(), "3".to_owned()],
        ];
        let bytes = xlsx_from_rows(&rows).unwrap();
        assert_eq!(xlsx_text(&bytes).unwrap(), "Name\tQty\nApples\t3");
    }

    #[test]
    fn xlsx_shared_strings_resolve() {
        let bytes = build_package(&[
            Part::new("[Content_Types].xml", "<Types/>"),
            Part::new(
                "xl/sharedStrings.xml",
                "<sst><si><t>first</t></si><si><r><t>sec</t></r><r><t>ond</t></r></si></sst>",
            ),
            Part::new(
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>1</v></c><c r="B1"><v>42</v></c><c r="C1" t="b"><v>1</v></c></row></sheetData></worksheet>"#,
            ),
        ])
        .unwrap();
        assert_eq!(xlsx_text(&bytes).unwrap(), "second\t42\tTRUE");
    }

    #[test]
    fn legacy_extensions_rejected() {
        assert!(reject_legacy_office("report.DOC").is_err());
        assert!(reject_legacy_office("sheet.xls").is_err());
        assert!(reject_legacy_office("report.docx").is_ok());
    }

    #[test]
    fn markdown_markup_is_removed() {
        let md = "# Title\n\nSome **bold** and _em_ with [a link](http://x).\n\n- item one\n2. item two\n\n---\n```\nlet x = 1;\n```";
        let text = markdown_text(md);
        assert_eq!(
            text,
            "Title\n\nSome bold and em with a link.\n\nitem one\nitem two\n\n\nlet x = 1;"
        );
    }

    #[test]
    fn html_visible_text_only() {
        let html = "<html><head><style>p{color:red}</style><script>alert(1)</script></head><body><h1>Hi &amp; bye</h1><p>One   <b>two</b></p><!-- note --><p>&#65;&#x42;</p></body></html>";
        assert_eq!(html_text(html), "Hi & bye\nOne two\nAB");
    }
}
