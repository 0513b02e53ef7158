//! Batch conversion: many uploaded SQL files in, one ZIP archive out

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::dialect::Dialect;
use crate::error::ConvertError;
use crate::schema::OutputMode;
use crate::service::ConversionService;

pub const ARCHIVE_NAME: &str = "converted_queries.zip";

/// One uploaded file as received from the multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub dialect_from: Dialect,
    pub dialect_to: Dialect,
    pub mode: OutputMode,
}

/// Archive entry produced for one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub name: String,
    pub content: String,
    pub failed: bool,
}

/// Convert every file independently; a failing file becomes an `_error.txt` entry
pub async fn convert_files(
    service: &ConversionService,
    files: Vec<UploadedFile>,
    options: BatchOptions,
) -> Vec<BatchEntry> {
    let mut entries = Vec::with_capacity(files.len());
    let mut used_names = HashSet::new();

    for (index, file) in files.into_iter().enumerate() {
        let (stem, ext) = split_name(file.file_name.as_deref(), index, options.mode);

        let result = match decode_utf8(&file.content) {
            Some(query) => {
                service
                    .convert_text(&query, options.dialect_from, options.dialect_to, options.mode)
                    .await
            }
            None => Err(ConvertError::validation("files", "file is not valid UTF-8")),
        };

        let entry = match result {
            Ok(converted) => BatchEntry {
                name: unique_name(&mut used_names, &stem, "_converted", &ext),
                content: converted,
                failed: false,
            },
            Err(e) => {
                warn!("Batch file '{}{}' failed: {}", stem, ext, e);
                BatchEntry {
                    name: unique_name(&mut used_names, &stem, "_error", ".txt"),
                    content: format!("Conversion failed: {}", failure_message(&e)),
                    failed: true,
                }
            }
        };
        entries.push(entry);
    }

    let failed = entries.iter().filter(|e| e.failed).count();
    info!(
        "Batch converted {} files ({} failed) {} -> {}",
        entries.len(),
        failed,
        options.dialect_from,
        options.dialect_to
    );
    entries
}

/// Write entries into a deflate-compressed ZIP archive
pub fn write_archive(entries: &[BatchEntry]) -> anyhow::Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(entry.name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", entry.name))?;
        zip.write_all(entry.content.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

fn failure_message(err: &ConvertError) -> String {
    match err {
        ConvertError::Validation { message, .. } => message.clone(),
        ConvertError::Translation(message) => message.clone(),
        ConvertError::Internal(_) => "internal error".to_string(),
    }
}

fn decode_utf8(bytes: &[u8]) -> Option<String> {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Split an upload name into (stem, extension), dropping any directory part
fn split_name(file_name: Option<&str>, index: usize, mode: OutputMode) -> (String, String) {
    let default_ext = match mode {
        OutputMode::Sql => ".sql",
        OutputMode::Pyspark | OutputMode::Python => ".py",
    };

    let base = file_name
        .and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty());

    let Some(base) = base else {
        return (format!("file_{}", index + 1), default_ext.to_string());
    };

    let path = Path::new(base);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base)
        .to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| default_ext.to_string());
    (stem, ext)
}

fn unique_name(used: &mut HashSet<String>, stem: &str, suffix: &str, ext: &str) -> String {
    let mut name = format!("{}{}{}", stem, suffix, ext);
    let mut n = 2;
    while used.contains(&name) {
        name = format!("{}{}_{}{}", stem, suffix, n, ext);
        n += 1;
    }
    used.insert(name.clone());
    name
}
