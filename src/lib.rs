//! Fine-tuning and batch inference of BERT sentence classifiers for Korean sentiment
//! analysis, built on [rust-bert](https://github.com/guillaume-be/rust-bert) and
//! [tch-rs](https://github.com/LaurentMazare/tch-rs).
//!
//! The crate covers the path from a labelled TSV corpus to a fine-tuned checkpoint and
//! back to class probabilities:
//! - `data`: corpus loading, tokenizer adapter (WordPiece or SentencePiece), fixed-length
//!   encoding and batching
//! - `model`: attention mask construction, single-head and aspect classifiers on top of
//!   a BERT encoder
//! - `kobert`: resources of the pretrained KoBERT encoder
//! - `training`: options, parameter groups, learning rate schedule and the epoch loop
//! - `pipelines`: fine-tuning and sentiment analysis entry points
//!
//! ```no_run
//! use kobert_sentiment::pipelines::fine_tuning::{fine_tune, FineTuningConfig};
//! use kobert_sentiment::pipelines::sentiment::{sentiment_analysis, SentimentAnalysisConfig};
//! use rust_bert::resources::LocalResource;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut config = FineTuningConfig::default();
//! config.encoder_resources.model_resource = Some(Box::new(LocalResource {
//!     local_path: "kobert/rust_model.ot".into(),
//! }));
//! let report = fine_tune(config)?;
//! println!("{:?}", report.epochs.last());
//!
//! let output = sentiment_analysis(SentimentAnalysisConfig::new("model.pt", "ratings_test.txt"))?;
//! println!("accuracy: {:.4}", output.accuracy);
//! # Ok(())
//! # }
//! ```
//!
//! # Loading pretrained encoder weights
//!
//! The encoder weights are read with `tch`. Weights exported from Python to a `.npz`
//! archive (one array per parameter, `BertModel` naming) can be converted with
//! `kobert-sentiment convert kobert.npz rust_model.ot`.

pub mod common;
pub mod data;
pub mod kobert;
pub mod model;
pub mod pipelines;
pub mod training;

pub use common::error::KoBertError;
