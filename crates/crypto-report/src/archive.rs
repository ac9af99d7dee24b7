//! Report Archive
//!
//! Lookup of generated reports in the output directory. Files are named
//! `daily_crypto_report_{YYYY-MM-DD}.{md|pdf}`; the date string doubles as the
//! report id.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::model::ReportFormat;

const FILE_PREFIX: &str = "daily_crypto_report_";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// `daily_crypto_report_2025-05-08.md`
pub fn report_file_name(date: NaiveDate, extension: &str) -> String {
    format!("{FILE_PREFIX}{}.{extension}", date.format(DATE_FORMAT))
}

/// Inverse of [`report_file_name`] for the archived formats
pub fn parse_report_file_name(name: &str) -> Option<(NaiveDate, ReportFormat)> {
    let rest = name.strip_prefix(FILE_PREFIX)?;
    let (date, extension) = rest.rsplit_once('.')?;
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    let format = extension.parse().ok()?;
    Some((date, format))
}

/// One archived report and the formats it is available in
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub id: String,
    pub date: NaiveDate,
    pub title: String,
    pub formats: Vec<ReportFormat>,
}

impl ReportEntry {
    pub fn has_format(&self, format: ReportFormat) -> bool {
        self.formats.contains(&format)
    }
}

/// Read-only view over the report output directory
#[derive(Clone, Debug)]
pub struct ReportArchive {
    dir: PathBuf,
}

impl ReportArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All reports, newest first. A missing directory is an empty archive.
    pub async fn list(&self) -> Result<Vec<ReportEntry>> {
        let mut by_date: BTreeMap<NaiveDate, Vec<ReportFormat>> = BTreeMap::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some((date, format)) = parse_report_file_name(&name.to_string_lossy()) else {
                continue;
            };
            let formats = by_date.entry(date).or_default();
            if !formats.contains(&format) {
                formats.push(format);
            }
        }

        Ok(by_date
            .into_iter()
            .rev()
            .map(|(date, mut formats)| {
                formats.sort_by_key(|f| f.extension());
                ReportEntry {
                    id: date.format(DATE_FORMAT).to_string(),
                    date,
                    title: format!("Daily Crypto Market Report - {}", date.format(DATE_FORMAT)),
                    formats,
                }
            })
            .collect())
    }

    /// Newest report available in `format`
    pub async fn latest(&self, format: ReportFormat) -> Result<Option<ReportEntry>> {
        Ok(self.list().await?.into_iter().find(|e| e.has_format(format)))
    }

    /// Report by id; ids that are not dates never match
    pub async fn find(&self, report_id: &str) -> Result<Option<ReportEntry>> {
        if NaiveDate::parse_from_str(report_id, DATE_FORMAT).is_err() {
            return Ok(None);
        }
        Ok(self.list().await?.into_iter().find(|e| e.id == report_id))
    }

    /// Path of `entry` in `format`, if the archive holds it
    pub fn file_path(&self, entry: &ReportEntry, format: ReportFormat) -> Option<PathBuf> {
        entry
            .has_format(format)
            .then(|| self.dir.join(report_file_name(entry.date, format.extension())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_file_names() {
        assert_eq!(report_file_name(date(8), "md"), "daily_crypto_report_2025-05-08.md");
        assert_eq!(
            parse_report_file_name("daily_crypto_report_2025-05-08.pdf"),
            Some((date(8), ReportFormat::Pdf))
        );
        assert_eq!(parse_report_file_name("daily_crypto_report_2025-05-08.html"), None);
        assert_eq!(parse_report_file_name("daily_crypto_report_latest.md"), None);
        assert_eq!(parse_report_file_name("notes.md"), None);
    }

    #[tokio::test]
    async fn test_list_groups_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "daily_crypto_report_2025-05-07.md");
        touch(dir.path(), "daily_crypto_report_2025-05-08.md");
        touch(dir.path(), "daily_crypto_report_2025-05-08.pdf");
        touch(dir.path(), "daily_crypto_report_2025-05-08.html");
        touch(dir.path(), "unrelated.txt");

        let archive = ReportArchive::new(dir.path());
        let entries = archive.list().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "2025-05-08");
        assert_eq!(entries[0].formats, vec![ReportFormat::Md, ReportFormat::Pdf]);
        assert_eq!(entries[1].id, "2025-05-07");
        assert_eq!(entries[1].formats, vec![ReportFormat::Md]);
    }

    #[tokio::test]
    async fn test_latest_respects_format() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "daily_crypto_report_2025-05-07.pdf");
        touch(dir.path(), "daily_crypto_report_2025-05-08.md");

        let archive = ReportArchive::new(dir.path());
        assert_eq!(archive.latest(ReportFormat::Pdf).await.unwrap().unwrap().date, date(7));
        assert_eq!(archive.latest(ReportFormat::Md).await.unwrap().unwrap().date, date(8));
    }

    #[tokio::test]
    async fn test_find_and_file_path() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "daily_crypto_report_2025-05-08.md");
        let archive = ReportArchive::new(dir.path());

        let entry = archive.find("2025-05-08").await.unwrap().unwrap();
        assert_eq!(
            archive.file_path(&entry, ReportFormat::Md),
            Some(dir.path().join("daily_crypto_report_2025-05-08.md"))
        );
        assert_eq!(archive.file_path(&entry, ReportFormat::Pdf), None);

        assert!(archive.find("2025-05-09").await.unwrap().is_none());
        assert!(archive.find("../etc/passwd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ReportArchive::new(dir.path().join("nope"));
        assert!(archive.list().await.unwrap().is_empty());
        assert!(archive.latest(ReportFormat::Pdf).await.unwrap().is_none());
    }
}
