//! Discovery and dating of the documents from a corpus directory

use crate::{Result, Year};
use anyhow::Context;
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};
use tokio::fs;

/// Document from the corpus, dated from its file name
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Document {
    /// Location of the document
    pub path: PathBuf,

    /// File name of the document, for logging purposes
    pub name: Box<str>,

    /// Year that the document is attributed to
    pub year: Year,

    /// Size of the document on disk
    pub len: u64,
}
//
impl Document {
    /// Truth that the document is stored in gzip-compressed form
    pub fn is_gzipped(&self) -> bool {
        self.name.ends_with(".gz")
    }
}

/// List the dated documents that lie directly inside of a directory
///
/// Subdirectories and other non-file entries are ignored, as are files whose
/// name contains no year. Documents are sorted by file name.
pub async fn list_documents(dir: &Path) -> Result<Vec<Document>> {
    let context = || format!("listing documents in {}", dir.display());
    let mut entries = fs::read_dir(dir).await.with_context(context)?;
    let mut documents = Vec::new();
    while let Some(entry) = entries.next_entry().await.with_context(context)? {
        // Only keep regular files, following symlinks
        let path = entry.path();
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                log::trace!("Ignoring {} as it is not a regular file", path.display());
                continue;
            }
            Err(e) => {
                log::debug!("Ignoring {} as it cannot be inspected: {e}", path.display());
                continue;
            }
        };

        // Attribute the document to a year, or ignore it
        let name: Box<str> = entry.file_name().to_string_lossy().into();
        let Some(year) = extract_year(&name) else {
            log::info!("No date detected in file name {name:?}, ignoring it");
            continue;
        };
        log::trace!("Attributed {name:?} to year {year}");
        documents.push(Document {
            path,
            year: year.into(),
            name,
            len: metadata.len(),
        });
    }
    documents.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    Ok(documents)
}

/// Extract a year from a file name
///
/// The year is the leftmost group of 4 consecutive digits. Longer runs of
/// digits are not treated specially, so a date like "20150315" yields "2015".
pub fn extract_year(file_name: &str) -> Option<&str> {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    let year =
        YEAR.get_or_init(|| Regex::new(r"\d{4}").expect("year pattern should be a valid regex"));
    year.find(file_name).map(|found| found.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn year_extraction() {
        assert_eq!(extract_year("report_2020.txt"), Some("2020"));
        assert_eq!(extract_year("1999-notes-2004.txt"), Some("1999"));
        assert_eq!(extract_year("20150315.txt"), Some("2015"));
        assert_eq!(extract_year("v12_345_6789"), Some("6789"));
        assert_eq!(extract_year("v123.txt"), None);
        assert_eq!(extract_year("misc.txt"), None);
        assert_eq!(extract_year(""), None);
    }

    #[tokio::test]
    async fn listing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b_2021.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a_2020.txt"), "aa").unwrap();
        std::fs::write(dir.path().join("c_2020.txt.gz"), "").unwrap();
        std::fs::write(dir.path().join("misc.txt"), "no date").unwrap();
        std::fs::create_dir(dir.path().join("sub_1990")).unwrap();
        std::fs::write(dir.path().join("sub_1990").join("nested_1990.txt"), "x").unwrap();

        let documents = list_documents(dir.path()).await.unwrap();
        let summary = documents
            .iter()
            .map(|doc| (&*doc.name, &*doc.year, doc.len, doc.is_gzipped()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            [
                ("a_2020.txt", "2020", 2, false),
                ("b_2021.txt", "2021", 1, false),
                ("c_2020.txt.gz", "2020", 0, true),
            ]
        );
        assert_eq!(documents[0].path, dir.path().join("a_2020.txt"));
    }

    #[tokio::test]
    async fn missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(list_documents(&dir.path().join("nowhere")).await.is_err());
    }
}
