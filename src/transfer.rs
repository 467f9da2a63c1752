//! Plain-text import and export of sheets.

use regex::Regex;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::OnceLock;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::model::Sheet;

pub const ARCHIVE_NAME: &str = "sheets.zip";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("could not build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("could not write archive entry: {0}")]
    Io(#[from] std::io::Error),
    #[error("browser refused the operation: {0}")]
    Browser(String),
}

impl From<JsValue> for TransferError {
    fn from(value: JsValue) -> Self {
        TransferError::Browser(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}

pub fn sheet_name_from_file(file_name: &str) -> String {
    file_name
        .strip_suffix(".txt")
        .unwrap_or(file_name)
        .to_string()
}

pub fn is_text_file(file_name: &str, mime_type: &str) -> bool {
    mime_type == "text/plain" || file_name.to_ascii_lowercase().ends_with(".txt")
}

pub fn export_file_name(sheet: &Sheet) -> String {
    let cleaned: String = sheet
        .name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "untitled.txt".to_string()
    } else {
        format!("{cleaned}.txt")
    }
}

/// Reduces editor markup to the text a reader would see.
pub fn strip_markup(html: &str) -> String {
    static RE_BREAK: OnceLock<Regex> = OnceLock::new();
    static RE_BLOCK_END: OnceLock<Regex> = OnceLock::new();
    static RE_COMMENT: OnceLock<Regex> = OnceLock::new();
    static RE_TAG: OnceLock<Regex> = OnceLock::new();

    let re_break = RE_BREAK.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
    let re_block_end = RE_BLOCK_END
        .get_or_init(|| Regex::new(r"(?i)</(p|div|li|h[1-6]|blockquote|pre)\s*>").unwrap());
    let re_comment = RE_COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
    // A bare `<` in plain text is not a tag.
    let re_tag = RE_TAG.get_or_init(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap());

    let text = re_break.replace_all(html, "\n");
    let text = re_block_end.replace_all(&text, "\n");
    let text = re_comment.replace_all(&text, "");
    let text = re_tag.replace_all(&text, "");
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.trim_end().to_string()
}

/// Zip with one plain-text entry per sheet. Clashing names are numbered.
pub fn build_archive(sheets: &[Sheet]) -> Result<Vec<u8>, TransferError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut used = HashSet::new();

    for sheet in sheets {
        let base = export_file_name(sheet);
        let mut entry = base.clone();
        let mut n = 2;
        while !used.insert(entry.clone()) {
            let stem = base.strip_suffix(".txt").unwrap_or(&base);
            entry = format!("{stem} ({n}).txt");
            n += 1;
        }
        writer.start_file(entry, options)?;
        writer.write_all(strip_markup(&sheet.content).as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

pub async fn read_text_file(file: &web_sys::File) -> Result<String, TransferError> {
    let text = JsFuture::from(file.text()).await?;
    text.as_string()
        .ok_or_else(|| TransferError::Browser(format!("{} is not readable as text", file.name())))
}

pub fn download_text(file_name: &str, text: &str) -> Result<(), TransferError> {
    let parts = js_sys::Array::of1(&JsValue::from_str(text));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type("text/plain;charset=utf-8");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)?;
    download_blob(file_name, &blob)
}

pub fn download_bytes(file_name: &str, bytes: &[u8], mime_type: &str) -> Result<(), TransferError> {
    let array = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&array);
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime_type);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    download_blob(file_name, &blob)
}

fn download_blob(file_name: &str, blob: &web_sys::Blob) -> Result<(), TransferError> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| TransferError::Browser("no document".to_string()))?;
    let body = document
        .body()
        .ok_or_else(|| TransferError::Browser("no document body".to_string()))?;
    let url = web_sys::Url::create_object_url_with_blob(blob)?;
    let anchor: web_sys::HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into()
        .map_err(|_| TransferError::Browser("could not create a link".to_string()))?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    body.append_child(&anchor)?;
    anchor.click();
    body.remove_child(&anchor)?;
    web_sys::Url::revoke_object_url(&url)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SheetId;
    use chrono::{TimeZone, Utc};
    use std::io::Read;
    use zip::ZipArchive;

    fn sheet(name: &str, content: &str) -> Sheet {
        let at = Utc.with_ymd_and_hms(2024, 2, 2, 10, 0, 0).unwrap();
        Sheet::new(SheetId(at.timestamp_millis()), name, content, at)
    }

    #[test]
    fn strips_only_a_trailing_txt() {
        assert_eq!(sheet_name_from_file("notes.txt"), "notes");
        assert_eq!(sheet_name_from_file("my.txt.backup"), "my.txt.backup");
        assert_eq!(sheet_name_from_file("README"), "README");
    }

    #[test]
    fn recognises_text_files() {
        assert!(is_text_file("a.txt", ""));
        assert!(is_text_file("a", "text/plain"));
        assert!(!is_text_file("photo.png", "image/png"));
    }

    #[test]
    fn strip_markup_keeps_line_structure() {
        let html = "<p>Buy <strong>milk</strong> &amp; eggs</p><ol><li>one</li><li>two</li></ol><p>a<br>b</p>";
        assert_eq!(strip_markup(html), "Buy milk & eggs\none\ntwo\na\nb");
        assert_eq!(strip_markup("plain text"), "plain text");
        assert_eq!(strip_markup("&lt;tag&gt;"), "<tag>");
    }

    #[test]
    fn strip_markup_keeps_comparisons_in_plain_text() {
        assert_eq!(strip_markup("if a < b and c > d"), "if a < b and c > d");
        assert_eq!(strip_markup("x<3 >_<"), "x<3 >_<");
        assert_eq!(strip_markup("<p>kept<!-- <b>gone</b> --></p>"), "kept");
    }

    #[test]
    fn export_names_are_file_safe() {
        assert_eq!(export_file_name(&sheet("Groceries", "")), "Groceries.txt");
        assert_eq!(export_file_name(&sheet("a/b:c", "")), "a_b_c.txt");
        assert_eq!(export_file_name(&sheet("   ", "")), "untitled.txt");
    }

    #[test]
    fn archive_holds_plain_text_per_sheet() {
        let sheets = vec![
            sheet("Groceries", "<p>milk</p>"),
            sheet("Groceries", "<p>eggs</p>"),
            sheet("Ideas", ""),
        ];
        let bytes = build_archive(&sheets).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);

        let mut read = |name: &str| {
            let mut text = String::new();
            archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
            text
        };
        assert_eq!(read("Groceries.txt"), "milk");
        assert_eq!(read("Groceries (2).txt"), "eggs");
        assert_eq!(read("Ideas.txt"), "");
    }

    #[test]
    fn archive_keeps_raw_text_with_angle_brackets() {
        let bytes = build_archive(&[sheet("Logic", "if a < b and c > d")]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        archive
            .by_name("Logic.txt")
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "if a < b and c > d");
    }
}
