//! Reading of corpus documents and collection of their statistics

use crate::{
    config::{Config, UnreadablePolicy},
    corpus::Document,
    progress::{ProgressConfig, ProgressReport, ProgressTracker, Work},
    stats::{CorpusStats, DocumentHits},
    Result,
};
use anyhow::Context;
use async_compression::tokio::bufread::GzipDecoder;
use std::sync::Arc;
use tokio::{
    fs::File,
    io::{AsyncReadExt, BufReader},
    task::JoinSet,
};

/// Scan a set of documents and merge their statistics
///
/// Documents are read concurrently, but their statistics are integrated one
/// at a time, so the result does not depend on completion order.
pub async fn scan_corpus(
    config: Arc<Config>,
    documents: Vec<Document>,
    report: &ProgressReport,
) -> Result<CorpusStats> {
    // Track document processing
    let total_bytes = documents.iter().map(|document| document.len).sum::<u64>();
    let scanned = report.add(
        "Scanning documents",
        ProgressConfig::new(Work::Steps(documents.len())),
    );
    let bytes = report.add(
        "Reading document data",
        ProgressConfig::new(Work::Bytes(total_bytes)).dont_show_rate_eta(),
    );

    // Keep up to config.jobs documents in flight, and integrate their
    // statistics as they come in
    let mut pending = documents.into_iter();
    let mut in_flight = JoinSet::new();
    let mut stats = CorpusStats::new(config.terms.len());
    loop {
        while in_flight.len() < config.jobs.get() {
            let Some(document) = pending.next() else {
                break;
            };
            in_flight.spawn(scan_document(config.clone(), document, bytes.clone()));
        }
        let Some(hits) = in_flight.join_next().await else {
            break;
        };
        if let Some(hits) = hits.context("collecting results from one document")?? {
            stats.add_document(hits);
        }
        scanned.make_progress(1);
    }
    Ok(stats)
}

/// Check which terms appear in a document
///
/// Returns `None` if the document could not be read and the configuration
/// says that it should be skipped.
async fn scan_document(
    config: Arc<Config>,
    document: Document,
    bytes: ProgressTracker,
) -> Result<Option<DocumentHits>> {
    log::debug!("Processing {:?} for year {}", document.name, document.year);
    let text = read_text(&document).await;
    bytes.make_progress(document.len);
    let text = match (text, config.on_unreadable) {
        (Ok(text), _) => text,
        (Err(e), UnreadablePolicy::Abort) => return Err(e),
        (Err(e), UnreadablePolicy::Skip) => {
            log::warn!("Skipping unreadable document {:?}: {e:#}", document.name);
            return Ok(None);
        }
    };

    let hits = DocumentHits::scan(document.year.clone(), &text, &config.terms);
    for term in hits.found_terms(&config.terms) {
        log::debug!("Found {:?} in {:?}", term.text(), document.name);
    }
    Ok(Some(hits))
}

/// Read the full text of a document, decompressing it if needed
async fn read_text(document: &Document) -> Result<String> {
    let context = || format!("reading document {}", document.path.display());
    let mut file = BufReader::new(File::open(&document.path).await.with_context(context)?);
    let mut raw = Vec::new();
    if document.is_gzipped() {
        GzipDecoder::new(file)
            .read_to_end(&mut raw)
            .await
            .with_context(context)?;
    } else {
        file.read_to_end(&mut raw).await.with_context(context)?;
    }
    String::from_utf8(raw)
        .with_context(|| format!("decoding document {} as UTF-8 text", document.path.display()))
}
