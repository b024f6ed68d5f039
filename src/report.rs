//! Tabulation of yearly term frequencies and CSV output

use crate::{config::Config, stats::CorpusStats, Result, Year};
use anyhow::Context;
use csv_async::{AsyncWriterBuilder, QuoteStyle, Terminator};
use rayon::prelude::*;
use std::{
    ffi::OsString,
    fmt,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
};

/// Table of term frequencies by year
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// Columns of the table, in increasing order
    years: Box<[Year]>,

    /// One row per reported term, in user-specified term order
    rows: Vec<Row>,
}
//
impl Report {
    /// Compute term frequencies from the corpus statistics
    ///
    /// Terms which were not found in any document are left out, unless the
    /// configuration asks for them to be kept.
    pub fn new(config: &Config, stats: &CorpusStats) -> Self {
        let years = stats.years().cloned().collect::<Box<[_]>>();
        let rows = (config.terms.par_iter().enumerate())
            .filter_map(|(term_idx, term)| {
                let Some(hits) = stats.term_hits(term_idx) else {
                    if config.keep_unmatched {
                        return Some(Row {
                            term: term.text().into(),
                            cells: vec![Cell::Absent; years.len()].into(),
                        });
                    }
                    log::debug!("Term {:?} was never found, leaving it out", term.text());
                    return None;
                };
                let cells = (years.iter())
                    .map(|year| match hits.get(year) {
                        Some(&hits) => {
                            let documents = stats
                                .documents(year)
                                .expect("hits can only be recorded for years with documents");
                            Cell::Percent(percentage(hits, documents))
                        }
                        None => Cell::Absent,
                    })
                    .collect();
                Some(Row {
                    term: term.text().into(),
                    cells,
                })
            })
            .collect();
        Self { years, rows }
    }

    /// Write the table as CSV
    ///
    /// Fields are written as-is, without quoting.
    pub async fn write_csv(&self, mut output: impl AsyncWrite + Unpin) -> Result<()> {
        // Without any year column, rows are bare terms, which the CSV writer
        // would quote when empty
        if self.years.is_empty() {
            output.write_all(b"Word\n").await?;
            for Row { term, .. } in &self.rows {
                output.write_all(term.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
            output.flush().await?;
            return Ok(());
        }

        let mut writer = AsyncWriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .create_writer(output);
        let header = std::iter::once("Word").chain(self.years.iter().map(|year| &**year));
        writer.write_record(header).await?;
        for Row { term, cells } in &self.rows {
            let fields = std::iter::once(term.to_string()).chain(cells.iter().map(Cell::to_string));
            writer.write_record(fields).await?;
        }
        writer.flush().await?;
        Ok(())
    }

    /// Save the table into a CSV file, replacing any existing file
    ///
    /// The table is first written to a temporary file next to the final one,
    /// which is then moved into place. Therefore, the output file is left
    /// untouched if anything goes wrong.
    ///
    /// If the output is a symbolic link, the file that it points to is
    /// replaced and the link is kept.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let path = fs::canonicalize(path).await.unwrap_or_else(|_| path.to_owned());
        let temp_path = temporary_path(&path);
        let result = self.save_as(&temp_path, &path).await;
        if result.is_err() {
            if let Err(e) = fs::remove_file(&temp_path).await {
                log::debug!("Failed to clean up {}: {e}", temp_path.display());
            }
        }
        result
    }

    /// Implementation of [`save()`](Self::save)
    async fn save_as(&self, temp_path: &Path, path: &Path) -> Result<()> {
        let context = || format!("writing results to {}", temp_path.display());
        let mut file = BufWriter::new(File::create(temp_path).await.with_context(context)?);
        self.write_csv(&mut file).await.with_context(context)?;
        file.flush().await.with_context(context)?;
        file.into_inner().sync_all().await.with_context(context)?;
        fs::rename(temp_path, path)
            .await
            .with_context(|| format!("moving results into {}", path.display()))?;
        log::info!(
            "Wrote frequencies of {} terms over {} years into {}",
            self.rows.len(),
            self.years.len(),
            path.display()
        );
        Ok(())
    }
}

/// Row of the output table
#[derive(Clone, Debug, PartialEq)]
struct Row {
    /// Term, as specified by the user
    term: Box<str>,

    /// Frequency of the term on each year
    cells: Box<[Cell]>,
}

/// Frequency of a term over one year
#[derive(Clone, Copy, Debug, PartialEq)]
enum Cell {
    /// Percentage of the year's documents that contain the term
    Percent(f64),

    /// The term was not found in any document from that year
    Absent,
}
//
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Debug formatting is the shortest representation that round
            // trips, and always has a fractional part
            Self::Percent(percent) => write!(f, "{percent:?}"),
            Self::Absent => f.write_str("0"),
        }
    }
}

/// Percentage of a year's documents which contain a term
fn percentage(hits: NonZeroUsize, documents: NonZeroUsize) -> f64 {
    debug_assert!(hits <= documents, "there cannot be more hits than documents");
    (hits.get() as f64 / documents.get() as f64) * 100.0
}

/// Location of the temporary file used while writing some output
pub(crate) fn temporary_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::DocumentHits;
    use tempfile::TempDir;

    fn stats(config: &Config, documents: &[(&str, &str)]) -> CorpusStats {
        let mut stats = CorpusStats::new(config.terms.len());
        for (year, text) in documents {
            stats.add_document(DocumentHits::scan((*year).into(), text, &config.terms));
        }
        stats
    }

    async fn csv(report: &Report) -> String {
        let mut out = Vec::new();
        report.write_csv(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn unmatched_terms_are_omitted() {
        let config = Config::for_tests(Path::new("."), "alpha,gamma,delta");
        let stats = stats(&config, &[("2020", "alpha beta alpha"), ("2020", "gamma")]);
        let report = Report::new(&config, &stats);
        assert_eq!(csv(&report).await, "Word,2020\nalpha,50.0\ngamma,50.0\n");
    }

    #[tokio::test]
    async fn unmatched_terms_can_be_kept() {
        let mut config = Config::for_tests(Path::new("."), "alpha,delta");
        config.keep_unmatched = true;
        let stats = stats(&config, &[("2020", "alpha"), ("2021", "beta")]);
        let report = Report::new(&config, &stats);
        assert_eq!(csv(&report).await, "Word,2020,2021\nalpha,100.0,0\ndelta,0,0\n");
    }

    #[tokio::test]
    async fn years_are_sorted_and_absent_cells_are_zero() {
        let config = Config::for_tests(Path::new("."), "Foo, bar");
        let stats = stats(
            &config,
            &[
                ("2003", "FOO"),
                ("1999", "foo bar"),
                ("2003", "nothing"),
                ("2003", "f o o"),
                ("2001", "nothing"),
            ],
        );
        let report = Report::new(&config, &stats);
        assert_eq!(
            csv(&report).await,
            "Word,1999,2001,2003\nFoo,100.0,0,33.33333333333333\n bar,100.0,0,0\n"
        );
    }

    #[tokio::test]
    async fn duplicate_terms_get_their_own_rows() {
        let config = Config::for_tests(Path::new("."), "cat,dog,cat");
        let stats = stats(&config, &[("1990", "cat"), ("1990", "CAT CAT"), ("1990", "")]);
        let report = Report::new(&config, &stats);
        assert_eq!(
            csv(&report).await,
            "Word,1990\ncat,66.66666666666666\ncat,66.66666666666666\n"
        );
    }

    #[tokio::test]
    async fn empty_corpus() {
        let config = Config::for_tests(Path::new("."), "alpha");
        let report = Report::new(&config, &CorpusStats::new(1));
        assert_eq!(csv(&report).await, "Word\n");
    }

    #[tokio::test]
    async fn empty_corpus_with_unmatched_terms() {
        let mut config = Config::for_tests(Path::new("."), "alpha,,beta");
        config.keep_unmatched = true;
        let report = Report::new(&config, &CorpusStats::new(3));
        assert_eq!(csv(&report).await, "Word\nalpha\n\nbeta\n");

        let config = Config {
            keep_unmatched: true,
            ..Config::for_tests(Path::new("."), "")
        };
        let report = Report::new(&config, &CorpusStats::new(1));
        assert_eq!(csv(&report).await, "Word\n\n");
    }

    #[test]
    fn percentages() {
        let nz = |x| NonZeroUsize::new(x).unwrap();
        for (hits, documents) in [(1, 1), (1, 3), (2, 3), (7, 7), (1, 1000)] {
            let percent = percentage(nz(hits), nz(documents));
            assert!((0.0..=100.0).contains(&percent));
            assert_eq!(percent, hits as f64 / documents as f64 * 100.0);
        }
        assert_eq!(Cell::Percent(50.0).to_string(), "50.0");
        assert_eq!(Cell::Percent(100.0).to_string(), "100.0");
        assert_eq!(Cell::Absent.to_string(), "0");
    }

    #[tokio::test]
    async fn save_replaces_existing_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.csv");
        std::fs::write(&output, "some much longer previous content\nwith two lines\n").unwrap();

        let config = Config::for_tests(dir.path(), "alpha");
        let stats = stats(&config, &[("2020", "alpha")]);
        let report = Report::new(&config, &stats);
        report.save(&output).await.unwrap();
        report.save(&output).await.unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Word,2020\nalpha,100.0\n");
        assert!(!temporary_path(&output).exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn failed_save_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("missing").join("out.csv");
        let config = Config::for_tests(dir.path(), "alpha");
        let report = Report::new(&config, &CorpusStats::new(1));
        assert!(report.save(&output).await.is_err());
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn save_through_symlink() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.csv");
        let output = dir.path().join("out.csv");
        std::fs::write(&target, "previous\n").unwrap();
        std::os::unix::fs::symlink(&target, &output).unwrap();

        let config = Config::for_tests(dir.path(), "alpha");
        let stats = stats(&config, &[("2020", "alpha")]);
        Report::new(&config, &stats).save(&output).await.unwrap();

        let link = std::fs::symlink_metadata(&output).unwrap();
        assert!(link.file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "Word,2020\nalpha,100.0\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn temporary_paths() {
        assert_eq!(
            temporary_path(Path::new("results/out.csv")),
            Path::new("results/.out.csv.tmp")
        );
        assert_eq!(temporary_path(Path::new("out.csv")), Path::new(".out.csv.tmp"));
    }
}
