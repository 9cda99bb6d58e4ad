//! # Sentiment classification model
//!
//! A pretrained BERT encoder receives pre-computed word embeddings, segment ids and an
//! attention mask derived from the valid length of each row. Its pooled output goes
//! through an optional dropout and a linear projection to the class logits, followed by
//! a softmax.
//!
//! Two heads are provided:
//! - [`SentimentClassifier`]: single head, encoder trained end-to-end unless frozen
//! - [`AspectSentimentClassifier`]: two parallel heads, the first one is used for training and
//!   prediction. Its encoder is frozen by default.
//!
//! All model variables live in a single `tch::nn::VarStore`: the encoder at the root
//! (`embeddings`, `encoder`, `pooler`) and the head under `classifier`
//! (`classifier_1` / `classifier_2` for the aspect variant).

mod attention_mask;
mod classifier;

pub use attention_mask::gen_attention_mask;
pub use classifier::{
    build_classifier, AspectSentimentClassifier, ClassifierConfig, ClassifierHead,
    ClassifierOutput, ClassifierVariant, KoBertEncoder, SentimentClassifier,
};
