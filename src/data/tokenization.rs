//! # Tokenizer adapter
//!
//! Turns a raw sentence into the fixed-length inputs expected by a BERT encoder:
//! `[CLS] tokens [SEP]` truncated to `max_len`, padded with `[PAD]`, with single-segment
//! ids and the count of non-padding positions.
use crate::common::error::KoBertError;
use rust_tokenizers::tokenizer::{BertTokenizer, SentencePieceTokenizer, Tokenizer};
use rust_tokenizers::vocab::{
    BertVocab, SentencePieceModel, SentencePieceVocab, Vocab,
};
use std::path::Path;

/// # Abstraction that holds a particular tokenizer
pub enum TokenizerOption {
    /// WordPiece tokenizer reading a `vocab.txt` vocabulary
    Bert(BertTokenizer),
    /// SentencePiece segmentation with ids taken from a `vocab.txt` table (KoBERT)
    SentencePiece(SentencePieceTokenizer),
}

impl TokenizerOption {
    /// Builds a WordPiece tokenizer from a `vocab.txt` file. Casing is preserved.
    pub fn from_vocab_file<P: AsRef<Path>>(path: P) -> Result<Self, KoBertError> {
        let path = utf8_path(path.as_ref())?;
        Ok(TokenizerOption::Bert(BertTokenizer::from_file(
            path, false, false,
        )?))
    }

    /// Builds a SentencePiece tokenizer whose pieces are mapped to ids through a
    /// `vocab.txt` table.
    ///
    /// The SentencePiece model only segments the text. Piece ids and the special tokens
    /// (`[UNK]`, `[PAD]`, `[CLS]`, `[SEP]`, `[MASK]`) come from the vocabulary file, one
    /// token per line, line number being the id. Pieces missing from the table map to
    /// `[UNK]`. Casing is preserved.
    ///
    /// # Arguments
    ///
    /// * `model_path` - SentencePiece model (`spiece.model`)
    /// * `vocab_path` - vocabulary indexing the encoder embedding table (`vocab.txt`)
    pub fn from_sentencepiece_files<P: AsRef<Path>, V: AsRef<Path>>(
        model_path: P,
        vocab_path: V,
    ) -> Result<Self, KoBertError> {
        let model = SentencePieceModel::from_file(utf8_path(model_path.as_ref())?)?;
        let id_table = BertVocab::from_file(utf8_path(vocab_path.as_ref())?)?;
        let special_tokens = SpecialTokens::default();
        // `SpecialTokenMap` is not publicly re-exported by rust_tokenizers 8.1.1; every field
        // is overwritten below, so only the type (not the contents) comes from `id_table`.
        let mut special_token_map = id_table.special_token_map.clone();
        special_token_map.unk_token = special_tokens.unk;
        special_token_map.pad_token = Some(special_tokens.pad);
        special_token_map.bos_token = None;
        special_token_map.sep_token = Some(special_tokens.sep);
        special_token_map.cls_token = Some(special_tokens.cls);
        special_token_map.eos_token = None;
        special_token_map.mask_token = Some(special_tokens.mask);
        special_token_map.additional_special_tokens = None;
        let vocab = SentencePieceVocab::from_values_and_special_token_map(
            id_table.values().clone(),
            special_token_map,
        )?;
        Ok(TokenizerOption::SentencePiece(
            SentencePieceTokenizer::from_existing_vocab_and_model(vocab, model, false),
        ))
    }

    /// Builds the tokenizer of a pretrained encoder: SentencePiece when a model is given,
    /// WordPiece otherwise.
    pub fn from_files<V: AsRef<Path>, P: AsRef<Path>>(
        vocab_path: V,
        sentencepiece_model_path: Option<P>,
    ) -> Result<Self, KoBertError> {
        match sentencepiece_model_path {
            Some(model_path) => {
                TokenizerOption::from_sentencepiece_files(model_path, vocab_path)
            }
            None => TokenizerOption::from_vocab_file(vocab_path),
        }
    }

    /// Interface method to tokenization
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.tokenize(text),
            Self::SentencePiece(ref tokenizer) => tokenizer.tokenize(text),
        }
    }

    /// Interface method to convert tokens to ids
    pub fn convert_tokens_to_ids(&self, tokens: &[String]) -> Vec<i64> {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
            Self::SentencePiece(ref tokenizer) => tokenizer.convert_tokens_to_ids(tokens),
        }
    }

    /// Vocabulary id of a token, falling back to the unknown token id
    pub fn token_to_id(&self, token: &str) -> i64 {
        match *self {
            Self::Bert(ref tokenizer) => tokenizer.vocab().token_to_id(token),
            Self::SentencePiece(ref tokenizer) => tokenizer.vocab().token_to_id(token),
        }
    }
}

/// Special tokens framing and padding an encoded sentence
#[derive(Debug, Clone)]
pub struct SpecialTokens {
    pub unk: String,
    pub cls: String,
    pub sep: String,
    pub pad: String,
    pub mask: String,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        SpecialTokens {
            unk: "[UNK]".to_string(),
            cls: "[CLS]".to_string(),
            sep: "[SEP]".to_string(),
            pad: "[PAD]".to_string(),
            mask: "[MASK]".to_string(),
        }
    }
}

/// Fixed-length encoding of a single sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSentence {
    pub token_ids: Vec<i64>,
    pub valid_length: i64,
    pub segment_ids: Vec<i64>,
}

/// # Single sentence transform
/// Encodes sentences to `max_len` positions for single-segment classification.
pub struct SentenceTransform<'a> {
    tokenizer: &'a TokenizerOption,
    max_len: usize,
    cls_id: i64,
    sep_id: i64,
    pad_id: i64,
}

impl<'a> SentenceTransform<'a> {
    pub fn new(tokenizer: &'a TokenizerOption, max_len: usize) -> SentenceTransform<'a> {
        SentenceTransform::new_with_special_tokens(tokenizer, max_len, &SpecialTokens::default())
    }

    pub fn new_with_special_tokens(
        tokenizer: &'a TokenizerOption,
        max_len: usize,
        special_tokens: &SpecialTokens,
    ) -> SentenceTransform<'a> {
        SentenceTransform {
            tokenizer,
            max_len,
            cls_id: tokenizer.token_to_id(&special_tokens.cls),
            sep_id: tokenizer.token_to_id(&special_tokens.sep),
            pad_id: tokenizer.token_to_id(&special_tokens.pad),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn encode(&self, text: &str) -> EncodedSentence {
        let mut content_ids = self
            .tokenizer
            .convert_tokens_to_ids(&self.tokenizer.tokenize(text));
        content_ids.truncate(self.max_len.saturating_sub(2));

        let mut token_ids = Vec::with_capacity(self.max_len);
        token_ids.push(self.cls_id);
        token_ids.extend(content_ids);
        token_ids.push(self.sep_id);
        // max_len below 2 cannot hold both markers
        token_ids.truncate(self.max_len);

        let valid_length = token_ids.len() as i64;
        token_ids.resize(self.max_len, self.pad_id);

        EncodedSentence {
            token_ids,
            valid_length,
            segment_ids: vec![0; self.max_len],
        }
    }
}

fn utf8_path(path: &Path) -> Result<&str, KoBertError> {
    path.to_str()
        .ok_or_else(|| KoBertError::IOError(format!("non UTF-8 path: {}", path.display())))
}
