//! Term usage statistics

use crate::{add_nz_usize, config::Term, Year};
use std::{
    collections::{btree_map, BTreeMap},
    num::NonZeroUsize,
};

/// Number of documents per year, sorted by year
///
/// Years with no document are absent, which is why counts are non-zero.
pub type YearCounts = BTreeMap<Year, NonZeroUsize>;

/// Knowledge about a single document
///
/// Produced independently for each document, then integrated into
/// [`CorpusStats`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DocumentHits {
    /// Year that the document is attributed to
    year: Year,

    /// Truth that each configured term appears in the document
    found: Box<[bool]>,
}
//
impl DocumentHits {
    /// Check which terms appear in a document's text
    pub fn scan(year: Year, text: &str, terms: &[Term]) -> Self {
        let text = text.to_uppercase();
        Self {
            year,
            found: terms.iter().map(|term| term.is_in(&text)).collect(),
        }
    }

    /// Terms which appear in the document
    pub fn found_terms<'terms>(
        &'terms self,
        terms: &'terms [Term],
    ) -> impl Iterator<Item = &'terms Term> + 'terms {
        terms
            .iter()
            .zip(self.found.iter())
            .filter_map(|(term, &found)| found.then_some(term))
    }
}

/// Cumulative knowledge across all documents of the corpus
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CorpusStats {
    /// Number of documents for each year
    documents: YearCounts,

    /// For each configured term, number of documents containing it each year
    hits: Box<[YearCounts]>,
}
//
impl CorpusStats {
    /// Set up the accumulator for a certain number of terms
    pub fn new(num_terms: usize) -> Self {
        Self {
            documents: YearCounts::new(),
            hits: vec![YearCounts::new(); num_terms].into(),
        }
    }

    /// Integrate knowledge from a new document
    ///
    /// Each document counts towards its year, and adds at most one hit per
    /// term, no matter how many times the term appears.
    pub fn add_document(&mut self, document: DocumentHits) {
        assert_eq!(
            document.found.len(),
            self.hits.len(),
            "document should be scanned for the configured terms"
        );
        for (term_hits, &found) in self.hits.iter_mut().zip(document.found.iter()) {
            if found {
                increment(term_hits, &document.year);
            }
        }
        increment(&mut self.documents, &document.year);
    }

    /// Years where documents were seen, in increasing order
    pub fn years(&self) -> impl Iterator<Item = &Year> + '_ {
        self.documents.keys()
    }

    /// Number of documents attributed to a year, if any
    pub fn documents(&self, year: &str) -> Option<NonZeroUsize> {
        self.documents.get(year).copied()
    }

    /// Total number of documents seen so far
    pub fn num_documents(&self) -> usize {
        self.documents.values().map(|count| count.get()).sum()
    }

    /// Yearly number of documents where a term appears
    ///
    /// Returns `None` if the term was not found in any document.
    pub fn term_hits(&self, term_idx: usize) -> Option<&YearCounts> {
        let hits = &self.hits[term_idx];
        let consistent = |(year, count): (&Year, &NonZeroUsize)| {
            self.documents(year).is_some_and(|docs| docs >= *count)
        };
        debug_assert!(hits.iter().all(consistent), "there cannot be more hits than documents");
        (!hits.is_empty()).then_some(hits)
    }
}

/// Add one document to a year's count
fn increment(counts: &mut YearCounts, year: &Year) {
    match counts.entry(year.clone()) {
        btree_map::Entry::Occupied(o) => {
            let count = o.into_mut();
            *count = add_nz_usize(*count, NonZeroUsize::MIN);
        }
        btree_map::Entry::Vacant(v) => {
            v.insert(NonZeroUsize::MIN);
        }
    }
}
