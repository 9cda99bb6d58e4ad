//! # Tab-separated sentiment corpora
//!
//! A corpus file is a TSV file whose first line is a header. Two columns are selected
//! by index: the sentence and its integer label. The Naver sentiment movie corpus
//! (NSMC) layout (`id`, `document`, `label`) is the default.
use crate::common::error::KoBertError;
use rust_bert::resources::{RemoteResource, ResourceProvider};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// # NSMC corpus files
pub struct NsmcCorpusResources;

impl NsmcCorpusResources {
    /// Shared under CC0 1.0 by Lucy Park at <https://github.com/e9t/nsmc>.
    pub const TRAIN: (&'static str, &'static str) = (
        "nsmc/ratings_train",
        "https://raw.githubusercontent.com/e9t/nsmc/master/ratings_train.txt",
    );
    /// Shared under CC0 1.0 by Lucy Park at <https://github.com/e9t/nsmc>.
    pub const TEST: (&'static str, &'static str) = (
        "nsmc/ratings_test",
        "https://raw.githubusercontent.com/e9t/nsmc/master/ratings_test.txt",
    );
}

/// Resolves a corpus resource (local or remote) to a local file path.
pub fn resolve_corpus(resource: &dyn ResourceProvider) -> Result<PathBuf, KoBertError> {
    Ok(resource.get_local_path()?)
}

/// Default remote training corpus (NSMC train split)
pub fn default_train_corpus() -> Box<dyn ResourceProvider + Send> {
    Box::new(RemoteResource::from_pretrained(NsmcCorpusResources::TRAIN))
}

/// Default remote evaluation corpus (NSMC test split)
pub fn default_test_corpus() -> Box<dyn ResourceProvider + Send> {
    Box::new(RemoteResource::from_pretrained(NsmcCorpusResources::TEST))
}

/// Column positions of the sentence and label fields in a corpus row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIndices {
    pub sentence_idx: usize,
    pub label_idx: usize,
}

impl FieldIndices {
    pub fn new(sentence_idx: usize, label_idx: usize) -> FieldIndices {
        FieldIndices {
            sentence_idx,
            label_idx,
        }
    }
}

impl Default for FieldIndices {
    fn default() -> Self {
        FieldIndices {
            sentence_idx: 1,
            label_idx: 2,
        }
    }
}

/// # Labelled sentence read from a corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub text: String,
    pub label: i64,
}

/// Reads all records of a TSV corpus file, discarding the header line.
///
/// # Arguments
///
/// * `path` - TSV file location
/// * `fields` - indices of the sentence and label columns
///
/// # Example
///
/// ```no_run
/// use kobert_sentiment::data::{load_corpus, FieldIndices};
///
/// let records = load_corpus("ratings_test.txt", FieldIndices::new(1, 2))?;
/// # Ok::<(), kobert_sentiment::KoBertError>(())
/// ```
pub fn load_corpus<P: AsRef<Path>>(
    path: P,
    fields: FieldIndices,
) -> Result<Vec<Record>, KoBertError> {
    let file = File::open(path.as_ref()).map_err(|error| {
        KoBertError::IOError(format!("{}: {}", path.as_ref().display(), error))
    })?;
    read_corpus(BufReader::new(file), fields)
}

/// Reads TSV records from any reader, discarding the header line.
pub fn read_corpus<R: Read>(reader: R, fields: FieldIndices) -> Result<Vec<Record>, KoBertError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let line = row.position().map(|position| position.line()).unwrap_or(0);
        let text = row.get(fields.sentence_idx).ok_or_else(|| {
            KoBertError::CorpusError(format!(
                "line {}: no sentence field at index {}",
                line, fields.sentence_idx
            ))
        })?;
        let label = row.get(fields.label_idx).ok_or_else(|| {
            KoBertError::CorpusError(format!(
                "line {}: no label field at index {}",
                line, fields.label_idx
            ))
        })?;
        let label = label.trim().parse::<i64>().map_err(|_| {
            KoBertError::CorpusError(format!("line {}: invalid label {:?}", line, label))
        })?;
        records.push(Record {
            text: text.to_string(),
            label,
        });
    }
    Ok(records)
}
