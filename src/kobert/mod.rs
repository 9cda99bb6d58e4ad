//! # KoBERT: Korean BERT pretrained encoder
//!
//! KoBERT (SK Telecom) is a BERT-base encoder with a SentencePiece vocabulary of 8002
//! pieces trained on Korean Wikipedia. This module provides the resources of the
//! pretrained model and loads them for fine-tuning:
//! - Configuration file following the [Transformers library](https://github.com/huggingface/transformers) layout
//! - Vocabulary (`vocab.txt`), the token to id table of the word embedding matrix
//! - SentencePiece model (`spiece.model`) segmenting text into vocabulary pieces. Without it
//!   the vocabulary is used as a WordPiece vocabulary.
//! - Model weights in a format readable by `tch` (`.ot` or `.safetensors`). Names must
//!   follow the `BertModel` layout without prefix (`embeddings.word_embeddings.weight`, ...).
//!   Weights exported to `.npz` can be converted with `kobert-sentiment convert`. There is
//!   no remote default: fine-tuning requires a local weights file.
//!
//! ```no_run
//! use kobert_sentiment::kobert::{load_pretrained, EncoderResources};
//!
//! let pretrained = load_pretrained(&EncoderResources::default())?;
//! println!("hidden size: {}", pretrained.config.hidden_size);
//! # Ok::<(), kobert_sentiment::KoBertError>(())
//! ```

mod pretrained;

pub use pretrained::{
    load_pretrained, load_pretrained_weights, EncoderResources, KoBertConfigResources,
    KoBertVocabResources, PretrainedEncoder,
};
