//! Minimal `.docx` writer: one numbered paragraph per problem, nothing else.
//!
//! A docx file is a zip package of WordprocessingML parts. We emit only the
//! three parts Word needs to open it: content types, package relationships and
//! the main document.

use std::io::{Cursor, Write};

use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::util::xml_escape;

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DOCX_FILE_NAME: &str = "problems.docx";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#;

const DOCUMENT_TAIL: &str = "<w:sectPr/></w:body></w:document>";

#[derive(Debug, Error)]
pub enum DocxError {
  #[error("zip packaging failed: {0}")]
  Zip(#[from] zip::result::ZipError),
  #[error("writing document part failed: {0}")]
  Io(#[from] std::io::Error),
}

/// Body XML for the problems, `"{index}. {content}"` per paragraph, 1-based.
pub fn document_xml(problems: &[String]) -> String {
  let mut xml = String::from(DOCUMENT_HEAD);
  for (i, problem) in problems.iter().enumerate() {
    let text = xml_escape(&format!("{}. {}", i + 1, problem));
    xml.push_str(r#"<w:p><w:r><w:t xml:space="preserve">"#);
    xml.push_str(&text);
    xml.push_str("</w:t></w:r></w:p>");
  }
  xml.push_str(DOCUMENT_TAIL);
  xml
}

/// Package the problems as a docx file and return its bytes.
pub fn write_docx(problems: &[String]) -> Result<Vec<u8>, DocxError> {
  let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
  let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

  let parts = [
    ("[Content_Types].xml", CONTENT_TYPES.to_string()),
    ("_rels/.rels", PACKAGE_RELS.to_string()),
    ("word/document.xml", document_xml(problems)),
  ];
  for (name, body) in parts {
    zip.start_file(name, options)?;
    zip.write_all(body.as_bytes())?;
  }

  let cursor = zip.finish()?;
  Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Read;
  use zip::ZipArchive;

  fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
    let mut file = archive.by_name(name).expect("part present");
    let mut out = String::new();
    file.read_to_string(&mut out).expect("utf-8 part");
    out
  }

  #[test]
  fn paragraphs_are_numbered_from_one() {
    let problems = vec!["Find x.".to_string(), "Find y.".to_string()];
    let bytes = write_docx(&problems).expect("docx");
    let doc = read_part(&bytes, "word/document.xml");
    assert_eq!(doc.matches("<w:p>").count(), 2);
    assert!(doc.contains(">1. Find x.<"));
    assert!(doc.contains(">2. Find y.<"));
    assert!(read_part(&bytes, "[Content_Types].xml").contains("/word/document.xml"));
  }

  #[test]
  fn markup_is_escaped() {
    let doc = document_xml(&["a < b & c".to_string()]);
    assert!(doc.contains("1. a &lt; b &amp; c"));
  }

  #[test]
  fn empty_list_still_produces_a_document() {
    let bytes = write_docx(&[]).expect("docx");
    let doc = read_part(&bytes, "word/document.xml");
    assert!(!doc.contains("<w:p>"));
    assert!(doc.ends_with(DOCUMENT_TAIL));
  }
}
