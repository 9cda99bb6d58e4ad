//! # Corpus loading, tokenization and batching
//!
//! Records flow from a TSV corpus through a [`SentenceTransform`] into a
//! [`SentimentDataset`] of fixed-length examples, then through a [`DataLoader`] into
//! [`Batch`] tensors.

mod batch;
mod corpus;
mod dataset;
mod tokenization;

pub use batch::{Batch, DataLoader};
pub use corpus::{
    default_test_corpus, default_train_corpus, load_corpus, read_corpus, resolve_corpus,
    FieldIndices, NsmcCorpusResources, Record,
};
pub use dataset::{load_dataset, EncodedExample, SentimentDataset};
pub use tokenization::{EncodedSentence, SentenceTransform, SpecialTokens, TokenizerOption};
