//! Archive Delivery - XPlanArchiv packaging
//!
//! One deflated zip entry named `xplan.gml`, saved as `<slug>.zip`.

use chrono::{DateTime, Utc};
use deunicode::deunicode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::hashing::sha256_hex;
use crate::mapper::{Conversion, ConvertError};
use crate::validation::ValidationViolation;

pub const ENTRY_NAME: &str = "xplan.gml";
const FALLBACK_SLUG: &str = "xplan";

/// Filesystem-safe variant of a plan name: `Am Markt (Süd)` -> `Am_Markt_Sud`
pub fn slugify_safe(name: &str) -> String {
    let cleaned: String = deunicode(name)
        .chars()
        .filter_map(|c| match c {
            '_' => Some(' '),
            c if c.is_ascii_alphanumeric() || c.is_whitespace() => Some(c),
            _ => None,
        })
        .collect();

    let slug = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

pub fn download_name(plan_name: &str) -> String {
    format!("{}.zip", slugify_safe(plan_name))
}

/// Zip `contents` as the single entry `entry_name`.
pub fn archive_bytes(entry_name: &str, contents: &str) -> Result<Vec<u8>, ConvertError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(entry_name, options)?;
    writer.write_all(contents.as_bytes())?;

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Write the archive to `out_dir/download_name` and return its path.
pub fn archive_and_offer(
    entry_name: &str,
    contents: &str,
    download_name: &str,
    out_dir: &Path,
) -> Result<PathBuf, ConvertError> {
    let bytes = archive_bytes(entry_name, contents)?;
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(download_name);
    fs::write(&path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "archive written");
    Ok(path)
}

/// What the CLI prints after a conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub plan_name: String,
    pub archive: Option<PathBuf>,
    pub entry: String,
    pub document_id: String,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
    pub violations: Vec<ValidationViolation>,
}

impl ConversionReport {
    pub fn new(conversion: &Conversion, rendered: &str, archive: Option<PathBuf>) -> Self {
        Self {
            plan_name: conversion.feature.name.clone(),
            archive,
            entry: ENTRY_NAME.to_string(),
            document_id: conversion.ids.document.clone(),
            sha256: sha256_hex(rendered.as_bytes()),
            created_at: Utc::now(),
            violations: conversion.validation.violations.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_slugify_german_names() {
        assert_eq!(slugify_safe("Am Markt (Süd)"), "Am_Markt_Sud");
        assert_eq!(slugify_safe("Straße 12/3"), "Strasse_123");
        assert_eq!(slugify_safe("  Ölmühle_Nord  "), "Olmuhle_Nord");
    }

    #[test]
    fn test_slugify_transliterates_other_latin_scripts() {
        assert_eq!(slugify_safe("École Ñandú"), "Ecole_Nandu");
    }

    #[test]
    fn test_slugify_never_empty() {
        assert_eq!(slugify_safe("!!!"), "xplan");
        assert_eq!(download_name(""), "xplan.zip");
    }

    #[test]
    fn test_archive_has_single_entry() {
        let bytes = archive_bytes(ENTRY_NAME, "<a>ü</a>\n").unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 1);

        let mut text = String::new();
        zip.by_name(ENTRY_NAME).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "<a>ü</a>\n");
    }

    #[test]
    fn test_archive_and_offer_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = archive_and_offer(ENTRY_NAME, "<a/>", "Plan_1.zip", dir.path()).unwrap();
        assert_eq!(path, dir.path().join("Plan_1.zip"));
        assert!(path.exists());
    }
}
