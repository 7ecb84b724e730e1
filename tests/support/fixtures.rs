//! Document fixtures built in memory, plus fake converter programs.
//!
//! Each integration test binary uses a different subset, hence the
//! `dead_code` allowance.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use prkeeper_core::convert::{ConversionResult, ConvertError, LegacyConverter};
use prkeeper_core::classify::RawDocument;
use zip::write::SimpleFileOptions;

/// Core-properties part with the given fields; `None` omits the element.
pub fn core_xml(creator: Option<&str>, title: Option<&str>, created: Option<&str>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    );
    if let Some(creator) = creator {
        xml.push_str(&format!("<dc:creator>{creator}</dc:creator>"));
    }
    if let Some(title) = title {
        xml.push_str(&format!("<dc:title>{title}</dc:title>"));
    }
    if let Some(created) = created {
        xml.push_str(&format!(
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#
        ));
    }
    xml.push_str("</cp:coreProperties>");
    xml
}

/// A minimal word-processing package, optionally carrying `docProps/core.xml`.
pub fn docx_bytes(core: Option<&str>) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer
        .start_file("[Content_Types].xml", options)
        .expect("start content types");
    writer
        .write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .expect("write content types");
    writer
        .start_file("word/document.xml", options)
        .expect("start document part");
    writer
        .write_all(br#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#)
        .expect("write document part");
    if let Some(core) = core {
        writer
            .start_file("docProps/core.xml", options)
            .expect("start core part");
        writer.write_all(core.as_bytes()).expect("write core part");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// The Alice / Brief / 2021-05-01 package.
pub fn alice_docx() -> Vec<u8> {
    docx_bytes(Some(&core_xml(
        Some("Alice"),
        Some("Brief"),
        Some("2021-05-01T10:00:00Z"),
    )))
}

/// A one-page PDF with an optional document-information dictionary.
pub fn pdf_bytes(info: Option<Dictionary>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    if let Some(info) = info {
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);
    }
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

/// A PDF whose `CreationDate` is `D:20190312153000`.
pub fn dated_pdf() -> Vec<u8> {
    pdf_bytes(Some(dictionary! {
        "Author" => Object::string_literal("Clerk"),
        "CreationDate" => Object::string_literal("D:20190312153000"),
    }))
}

/// A PDF with a `CreationDate` in the given string form.
pub fn pdf_created(date: &str) -> Vec<u8> {
    pdf_bytes(Some(dictionary! {
        "CreationDate" => Object::string_literal(date),
    }))
}

/// OLE2 compound file with a `WordDocument` directory entry.
pub fn legacy_doc_bytes() -> Vec<u8> {
    let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.resize(512, 0);
    bytes.extend("WordDocument".encode_utf16().flat_map(u16::to_le_bytes));
    bytes.resize(1536, 0);
    bytes
}

/// The kind of page an archive serves for a missing document.
pub fn html_error_page() -> Vec<u8> {
    b"<!DOCTYPE html>\n<html><head><title>Error</title></head><body>File not found</body></html>"
        .to_vec()
}

/// Converter double that writes scripted output next to its input and
/// counts invocations.
#[derive(Clone)]
pub struct ScriptedConverter {
    output: Option<Vec<u8>>,
    calls: Arc<Mutex<usize>>,
}

impl ScriptedConverter {
    /// Produces `bytes` as the converted document.
    pub fn producing(bytes: Vec<u8>) -> Self {
        Self {
            output: Some(bytes),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Always reports a failed conversion.
    pub fn failing() -> Self {
        Self {
            output: None,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of conversions attempted so far.
    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock")
    }
}

impl LegacyConverter for ScriptedConverter {
    fn convert(&self, document: RawDocument) -> Result<ConversionResult, ConvertError> {
        *self.calls.lock().expect("calls lock") += 1;
        let Some(bytes) = &self.output else {
            return Ok(ConversionResult::Failed);
        };
        let path = document.path().with_extension("docx");
        std::fs::write(&path, bytes).expect("write converted fixture");
        Ok(ConversionResult::Converted(RawDocument::new(document.id(), path)))
    }
}

/// Writes an executable shell script standing in for the office suite.
///
/// The script receives `--headless --convert-to <fmt> --outdir <dir> <input>`
/// and runs `body` with `outdir`, `input` and `stem` variables set. Every
/// invocation appends a line to `<dir>/calls.log`.
#[cfg(unix)]
pub fn fake_converter(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let log = dir.join("calls.log");
    let script = format!(
        "#!/bin/sh\noutdir=\"$5\"\ninput=\"$6\"\nname=$(basename \"$input\")\nstem=\"${{name%.*}}\"\necho \"$*\" >> \"{}\"\n{body}\n",
        log.display()
    );
    let path = dir.join(name);
    std::fs::write(&path, script).expect("write fake converter");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod fake converter");
    path
}

/// Number of times the fake converters in `dir` were invoked.
pub fn fake_converter_calls(dir: &Path) -> usize {
    std::fs::read_to_string(dir.join("calls.log"))
        .map(|log| log.lines().count())
        .unwrap_or(0)
}
