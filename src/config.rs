//! Processing pipeline configuration

use crate::Args;
use clap::ValueEnum;
use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

/// Final process configuration
///
/// This is the result of digesting validated [`Args`]. Please refer to
/// [`Args`] to know more about common fields.
#[allow(missing_docs)]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Config {
    /// Directory containing the documents
    pub corpus: PathBuf,

    /// Terms to search for, in user-specified order
    pub terms: Box<[Term]>,

    /// Path to the output CSV file
    pub output: PathBuf,

    // Other fields have the same meaning as in Args
    pub on_unreadable: UnreadablePolicy,
    pub keep_unmatched: bool,
    pub jobs: NonZeroUsize,
}
//
impl Config {
    /// Determine process configuration from CLI arguments
    pub(crate) fn new(args: Args) -> Arc<Self> {
        let Args {
            corpus_directory,
            word_list,
            output_csv,
            debug: _,
            interactive: _,
            on_unreadable,
            keep_unmatched,
            jobs,
        } = args;
        let terms = parse_word_list(&word_list);
        log::debug!("Will search for terms {terms:?}");
        Arc::new(Self {
            corpus: corpus_directory,
            terms,
            output: output_csv,
            on_unreadable,
            keep_unmatched,
            jobs,
        })
    }
}

/// What should be done about a document that cannot be read as text
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, ValueEnum)]
pub enum UnreadablePolicy {
    /// Fail the whole run
    #[default]
    Abort,

    /// Log a warning and leave the document out of the statistics
    Skip,
}

/// Search term
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Term {
    /// Term as specified by the user, used for display
    text: Box<str>,

    /// Upper-case version of the term, used for matching
    needle: Box<str>,
}
//
impl Term {
    /// Prepare to search for a term
    pub fn new(text: &str) -> Self {
        Self {
            text: text.into(),
            needle: text.to_uppercase().into(),
        }
    }

    /// Term as specified by the user
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Truth that this term appears in some text, which must have been
    /// converted to upper case beforehand
    pub fn is_in(&self, uppercase_text: &str) -> bool {
        uppercase_text.contains(&*self.needle)
    }
}

/// Split a comma-separated list of terms
///
/// Terms are neither trimmed nor deduplicated, each entry of the list will
/// get its own output row.
pub fn parse_word_list(list: &str) -> Box<[Term]> {
    list.split(',').map(Term::new).collect()
}

#[cfg(test)]
impl Config {
    /// Configuration with default settings for a given corpus and word list
    pub fn for_tests(corpus: &std::path::Path, word_list: &str) -> Self {
        Self {
            corpus: corpus.to_owned(),
            terms: parse_word_list(word_list),
            output: corpus.join("out.csv"),
            on_unreadable: UnreadablePolicy::default(),
            keep_unmatched: false,
            jobs: NonZeroUsize::new(4).unwrap(),
        }
    }
}
