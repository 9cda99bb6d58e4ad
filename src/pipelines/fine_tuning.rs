//! # Fine-tuning pipeline
//! Trains a sentiment classifier on a labelled TSV corpus, evaluating on a second corpus
//! after every epoch, and writes the checkpoint. Defaults to KoBERT fine-tuned on the
//! NSMC train split and evaluated on the NSMC test split.
//!
//! ```no_run
//! use kobert_sentiment::pipelines::fine_tuning::{fine_tune, FineTuningConfig};
//! use kobert_sentiment::training::TrainingConfig;
//! use rust_bert::resources::LocalResource;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut config = FineTuningConfig::default();
//! config.options = TrainingConfig {
//!     num_epochs: 2,
//!     ..Default::default()
//! };
//! config.encoder_resources.model_resource = Some(Box::new(LocalResource {
//!     local_path: "kobert/rust_model.ot".into(),
//! }));
//! let report = fine_tune(config)?;
//! for epoch in report.epochs {
//!     println!("{} {:.4} {:.4}", epoch.epoch, epoch.train_accuracy, epoch.test_accuracy);
//! }
//! # Ok(())
//! # }
//! ```

use crate::common::error::KoBertError;
use crate::data::{
    default_test_corpus, default_train_corpus, load_dataset, resolve_corpus, FieldIndices,
};
use crate::kobert::{load_pretrained, load_pretrained_weights, EncoderResources};
use crate::model::build_classifier;
use crate::training::{Trainer, TrainingConfig, TrainingReport};
use rust_bert::resources::ResourceProvider;
use std::path::PathBuf;
use tch::{nn, Device};

/// Default checkpoint location, overwritten by every run
pub const DEFAULT_CHECKPOINT: &str = "model.pt";

/// # Configuration of a fine-tuning run
pub struct FineTuningConfig {
    pub options: TrainingConfig,
    pub encoder_resources: EncoderResources,
    pub train_corpus: Box<dyn ResourceProvider + Send>,
    pub test_corpus: Box<dyn ResourceProvider + Send>,
    pub fields: FieldIndices,
    pub checkpoint_path: PathBuf,
    pub device: Device,
    /// Train from a randomly initialized encoder when no pretrained weights are given
    pub random_init: bool,
}

impl Default for FineTuningConfig {
    fn default() -> Self {
        FineTuningConfig {
            options: TrainingConfig::default(),
            encoder_resources: EncoderResources::default(),
            train_corpus: default_train_corpus(),
            test_corpus: default_test_corpus(),
            fields: FieldIndices::default(),
            checkpoint_path: PathBuf::from(DEFAULT_CHECKPOINT),
            device: Device::cuda_if_available(),
            random_init: false,
        }
    }
}

/// Fine-tunes a classifier and saves it to `config.checkpoint_path`.
///
/// # Returns
///
/// * `Err(KoBertError::InvalidConfigurationError)` when the encoder resources hold no
///   pretrained weights and `random_init` is not set
pub fn fine_tune(config: FineTuningConfig) -> Result<TrainingReport, KoBertError> {
    let options = &config.options;
    if config.encoder_resources.model_resource.is_none() && !config.random_init {
        return Err(KoBertError::InvalidConfigurationError(
            "no pretrained encoder weights given, set `random_init` to train from scratch"
                .to_string(),
        ));
    }
    let pretrained = load_pretrained(&config.encoder_resources)?;

    let train_path = resolve_corpus(config.train_corpus.as_ref())?;
    let test_path = resolve_corpus(config.test_corpus.as_ref())?;
    let train_dataset = load_dataset(
        &train_path,
        config.fields,
        options.max_len,
        None,
        Some(&pretrained.tokenizer),
    )?;
    let test_dataset = load_dataset(
        &test_path,
        config.fields,
        options.max_len,
        None,
        Some(&pretrained.tokenizer),
    )?;
    tracing::info!(
        "{} training and {} evaluation examples",
        train_dataset.len(),
        test_dataset.len()
    );

    let mut var_store = nn::VarStore::new(config.device);
    let model = build_classifier(
        var_store.root(),
        options.classifier,
        &pretrained.config,
        &options.classifier_config(),
    )?;
    match pretrained.weights_path {
        Some(ref weights_path) => load_pretrained_weights(&mut var_store, weights_path)?,
        None => tracing::warn!("Training from a randomly initialized encoder"),
    }

    Trainer::new(model.as_ref(), &var_store, options, &config.checkpoint_path)
        .train(&train_dataset, &test_dataset)
}
