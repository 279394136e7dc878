//! `.docx` mail-merge
//!
//! A docx is a zip archive of XML parts. Tags are written `{name}` in the
//! document body, headers and footers. Word often splits a tag across runs,
//! so run markup between `{` and `}` is dropped when the text in between
//! forms a valid tag name and the dropped markup closes exactly what it opens.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::DocError;

const MAX_TAG_LEN: usize = 64;

/// Elements a split tag may cross
const RUN_MARKUP: [&str; 3] = ["w:r", "w:t", "w:rPr"];

/// Parts of the archive that carry user-visible text
fn is_mergeable(name: &str) -> bool {
    name == "word/document.xml"
        || ((name.starts_with("word/header") || name.starts_with("word/footer"))
            && name.ends_with(".xml"))
}

/// Merge `fields` into a docx held in memory and return the new archive
pub fn merge_docx(template: &[u8], fields: &HashMap<String, String>) -> Result<Vec<u8>, DocError> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() {
            writer.add_directory(name, options.clone())?;
            continue;
        }

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut data)?;

        if is_mergeable(&name) {
            let xml = String::from_utf8(data)
                .map_err(|e| DocError::Encoding(format!("{}: {}", name, e)))?;
            data = merge_xml(&xml, fields).into_bytes();
        }

        writer.start_file(name, options.clone())?;
        writer.write_all(&data)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Replace every `{tag}` in the text content of `xml`. Unknown tags render
/// empty; values are XML-escaped.
pub fn merge_xml(xml: &str, fields: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut copied = 0;
    let mut cursor = 0;

    while let Some(open) = next_text_brace(xml, cursor) {
        match read_tag(xml, open + 1) {
            Some((name, end)) => {
                out.push_str(&xml[copied..open]);
                let value = fields.get(&name).map(String::as_str).unwrap_or("");
                out.push_str(&escape_xml(value));
                copied = end;
                cursor = end;
            }
            None => cursor = open + 1,
        }
    }

    out.push_str(&xml[copied..]);
    out
}

/// Position of the next `{` outside markup, scanning from a text position
fn next_text_brace(xml: &str, from: usize) -> Option<usize> {
    let mut in_markup = false;
    for (offset, byte) in xml.as_bytes()[from..].iter().enumerate() {
        match byte {
            b'<' => in_markup = true,
            b'>' => in_markup = false,
            b'{' if !in_markup => return Some(from + offset),
            _ => {}
        }
    }
    None
}

/// Read a tag name starting just after `{`, skipping run markup. Returns the
/// name and the index just past the closing `}`.
fn read_tag(xml: &str, start: usize) -> Option<(String, usize)> {
    let bytes = xml.as_bytes();
    let mut name = String::new();
    // Elements the tag leaves, and elements it enters before `}`
    let mut closed: Vec<&str> = Vec::new();
    let mut opened: Vec<&str> = Vec::new();
    let mut pos = start;

    while pos < bytes.len() {
        match bytes[pos] {
            b'<' => {
                let end = pos + xml[pos..].find('>')?;
                let markup = &xml[pos + 1..end];
                pos = end + 1;
                if markup.ends_with('/') {
                    continue;
                }
                let (closing, element) = match markup.strip_prefix('/') {
                    Some(rest) => (true, rest),
                    None => (false, markup),
                };
                let element = element.split_whitespace().next().unwrap_or("");
                if !RUN_MARKUP.contains(&element) {
                    return None;
                }
                if !closing {
                    opened.push(element);
                } else if opened.last() == Some(&element) {
                    opened.pop();
                } else if opened.is_empty() {
                    closed.push(element);
                } else {
                    return None;
                }
            }
            b'}' if !name.is_empty() => {
                if !opened.iter().eq(closed.iter().rev()) {
                    return None;
                }
                return Some((name, pos + 1));
            }
            b if b.is_ascii_alphanumeric() || b == b'_' => {
                if name.len() == MAX_TAG_LEN {
                    return None;
                }
                name.push(b as char);
                pos += 1;
            }
            _ => return None,
        }
    }
    None
}

pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_simple_tags() {
        let xml = "<w:t>Pay {txtname} the sum of {txtamount}</w:t>";
        let merged = merge_xml(xml, &fields(&[("txtname", "Otieno & Sons"), ("txtamount", "1,000.00")]));
        assert_eq!(merged, "<w:t>Pay Otieno &amp; Sons the sum of 1,000.00</w:t>");
    }

    #[test]
    fn collapses_tags_split_across_runs() {
        let xml = "<w:r><w:t>{txt</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>name}</w:t></w:r>";
        let merged = merge_xml(xml, &fields(&[("txtname", "Achieng")]));
        assert_eq!(merged, "<w:r><w:t>Achieng</w:t></w:r>");
    }

    #[test]
    fn tags_spanning_paragraphs_or_unbalanced_runs_are_left_alone() {
        let across_paragraphs =
            "<w:p><w:r><w:t>{txt</w:t></w:r></w:p><w:p><w:r><w:t>name}</w:t></w:r></w:p>";
        let merged = merge_xml(across_paragraphs, &fields(&[("txtname", "Achieng")]));
        assert_eq!(merged, across_paragraphs);

        let unbalanced = "<w:r><w:t>{txt</w:t></w:r><w:t>name}</w:t>";
        let merged = merge_xml(unbalanced, &fields(&[("txtname", "Achieng")]));
        assert_eq!(merged, unbalanced);
    }

    #[test]
    fn unknown_tags_render_empty_and_braces_in_markup_survive() {
        let xml = r#"<w:p w:rsid="{ABC}"><w:t>[{missing}] {not a tag}</w:t></w:p>"#;
        let merged = merge_xml(xml, &HashMap::new());
        assert_eq!(merged, r#"<w:p w:rsid="{ABC}"><w:t>[] {not a tag}</w:t></w:p>"#);
    }

    #[test]
    fn merges_docx_archive() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<()> = FileOptions::default();
        writer.start_file("[Content_Types].xml", options.clone()).unwrap();
        writer.write_all(b"<Types>{txtname}</Types>").unwrap();
        writer.start_file("word/document.xml", options.clone()).unwrap();
        writer.write_all(b"<w:t>{txtname}</w:t>").unwrap();
        writer.start_file("word/footer1.xml", options).unwrap();
        writer.write_all(b"<w:t>{txtdate}</w:t>").unwrap();
        let template = writer.finish().unwrap().into_inner();

        let output = merge_docx(
            &template,
            &fields(&[("txtname", "Kamau"), ("txtdate", "19th October 2026")]),
        )
        .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(output)).unwrap();
        let read = |archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str| {
            let mut s = String::new();
            archive.by_name(name).unwrap().read_to_string(&mut s).unwrap();
            s
        };
        assert_eq!(read(&mut archive, "word/document.xml"), "<w:t>Kamau</w:t>");
        assert_eq!(read(&mut archive, "word/footer1.xml"), "<w:t>19th October 2026</w:t>");
        assert_eq!(read(&mut archive, "[Content_Types].xml"), "<Types>{txtname}</Types>");
    }

    #[test]
    fn rejects_non_zip_template() {
        assert!(merge_docx(b"not a zip", &HashMap::new()).is_err());
    }
}
