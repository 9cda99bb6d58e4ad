use crate::common::error::KoBertError;
use crate::data::corpus::{load_corpus, FieldIndices, Record};
use crate::data::tokenization::{SentenceTransform, TokenizerOption};
use std::path::Path;

/// # Encoded corpus example
/// `token_ids` and `segment_ids` always hold `max_len` positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedExample {
    pub token_ids: Vec<i64>,
    pub valid_length: i64,
    pub segment_ids: Vec<i64>,
    pub label: i64,
}

/// # Tokenized sentiment dataset
/// Every record is encoded once at construction time and kept in memory.
#[derive(Debug, Clone)]
pub struct SentimentDataset {
    examples: Vec<EncodedExample>,
    max_len: usize,
}

impl SentimentDataset {
    /// Encodes a sequence of records with a sentence transform.
    pub fn new(records: &[Record], transform: &SentenceTransform) -> SentimentDataset {
        let examples = records
            .iter()
            .map(|record| {
                let encoded = transform.encode(&record.text);
                EncodedExample {
                    token_ids: encoded.token_ids,
                    valid_length: encoded.valid_length,
                    segment_ids: encoded.segment_ids,
                    label: record.label,
                }
            })
            .collect();
        SentimentDataset {
            examples,
            max_len: transform.max_len(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&EncodedExample> {
        self.examples.get(index)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn iter(&self) -> impl Iterator<Item = &EncodedExample> {
        self.examples.iter()
    }
}

/// Loads and tokenizes a TSV corpus.
///
/// A tokenizer source is required: either a vocabulary file from which a tokenizer is
/// built, or an existing tokenizer (which takes precedence).
///
/// # Arguments
///
/// * `corpus_path` - TSV corpus, first line discarded
/// * `fields` - sentence and label column indices
/// * `max_len` - number of positions of every encoded example
/// * `vocab` - optional WordPiece vocabulary file (`vocab.txt`)
/// * `tokenizer` - optional tokenizer
///
/// # Returns
///
/// * `Err(KoBertError::MissingTokenizerSource)` when neither `vocab` nor `tokenizer` is given
pub fn load_dataset<P: AsRef<Path>>(
    corpus_path: P,
    fields: FieldIndices,
    max_len: usize,
    vocab: Option<&Path>,
    tokenizer: Option<&TokenizerOption>,
) -> Result<SentimentDataset, KoBertError> {
    let owned_tokenizer;
    let tokenizer = match (tokenizer, vocab) {
        (Some(tokenizer), _) => tokenizer,
        (None, Some(vocab_path)) => {
            owned_tokenizer = TokenizerOption::from_vocab_file(vocab_path)?;
            &owned_tokenizer
        }
        (None, None) => return Err(KoBertError::MissingTokenizerSource),
    };

    let records = load_corpus(corpus_path, fields)?;
    let transform = SentenceTransform::new(tokenizer, max_len);
    Ok(SentimentDataset::new(&records, &transform))
}
