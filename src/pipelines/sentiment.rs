// Copyright 2019 Guillaume Becquin
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Sentiment analysis pipeline
//! Runs a fine-tuned checkpoint over a labelled TSV corpus and returns the class
//! probabilities of every row together with the accuracy, or classifies ad-hoc sentences.
//! The encoder configuration and vocabulary default to KoBERT and are downloaded to
//! `~/.cache/.rustbert/kobert`.
//!
//! ```no_run
//! use kobert_sentiment::pipelines::sentiment::{sentiment_analysis, SentimentAnalysisConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = SentimentAnalysisConfig::new("model.pt", "ratings_test.txt");
//! let output = sentiment_analysis(config)?;
//! println!("accuracy: {:.4}", output.accuracy);
//! # Ok(())
//! # }
//! ```

use crate::common::error::KoBertError;
use crate::data::{
    load_dataset, DataLoader, FieldIndices, Record, SentenceTransform, SentimentDataset,
    TokenizerOption,
};
use crate::kobert::{load_pretrained, EncoderResources};
use crate::model::{build_classifier, ClassifierHead};
use crate::training::{process_batch, Phase, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tch::{nn, Device, Kind, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Polarity of a binary sentiment label (NSMC convention: 0 negative, 1 positive)
pub enum SentimentPolarity {
    Positive,
    Negative,
}

impl SentimentPolarity {
    pub fn from_label(label: i64) -> Option<SentimentPolarity> {
        match label {
            0 => Some(SentimentPolarity::Negative),
            1 => Some(SentimentPolarity::Positive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Sentiment returned by the model.
pub struct Sentiment {
    /// Predicted class
    pub label: i64,
    /// Probability of the predicted class
    pub score: f64,
}

impl Sentiment {
    pub fn polarity(&self) -> Option<SentimentPolarity> {
        SentimentPolarity::from_label(self.label)
    }
}

/// # Configuration of a corpus-level sentiment analysis run
pub struct SentimentAnalysisConfig {
    /// Checkpoint written by the training loop
    pub checkpoint_path: PathBuf,
    /// Labelled TSV corpus
    pub corpus_path: PathBuf,
    pub fields: FieldIndices,
    /// `max_len`, `batch_size`, `log_interval` and the classifier settings are used
    pub options: TrainingConfig,
    pub encoder_resources: EncoderResources,
    pub device: Device,
    /// Log progress every `log_interval` batches
    pub show: bool,
}

impl SentimentAnalysisConfig {
    /// Default settings for a checkpoint and an NSMC-formatted corpus
    pub fn new<C: AsRef<Path>, P: AsRef<Path>>(
        checkpoint_path: C,
        corpus_path: P,
    ) -> SentimentAnalysisConfig {
        SentimentAnalysisConfig {
            checkpoint_path: checkpoint_path.as_ref().to_path_buf(),
            corpus_path: corpus_path.as_ref().to_path_buf(),
            fields: FieldIndices::default(),
            options: TrainingConfig::default(),
            encoder_resources: EncoderResources::default(),
            device: Device::cuda_if_available(),
            show: false,
        }
    }
}

/// Output of a corpus-level run
pub struct SentimentAnalysisOutput {
    /// Probabilities of shape (*num_examples*, *num_classes*), row `i` is corpus row `i`
    pub probabilities: Tensor,
    /// Mean of the per-batch accuracies
    pub accuracy: f64,
    /// Fraction of correctly classified examples
    pub weighted_accuracy: f64,
}

impl SentimentAnalysisOutput {
    /// Probability rows as nested vectors
    pub fn rows(&self) -> Result<Vec<Vec<f32>>, KoBertError> {
        let (num_examples, num_classes) = self.probabilities.size2()?;
        let values = Vec::<f32>::try_from(&self.probabilities.flatten(0, -1))?;
        if num_examples == 0 {
            return Ok(vec![]);
        }
        Ok(values
            .chunks(num_classes as usize)
            .map(|row| row.to_vec())
            .collect())
    }
}

/// # Fine-tuned sentiment classifier
pub struct SentimentModel {
    tokenizer: TokenizerOption,
    model: Box<dyn ClassifierHead>,
    options: TrainingConfig,
    var_store: nn::VarStore,
}

impl SentimentModel {
    /// Builds the classifier described by `options` and loads a checkpoint into it.
    ///
    /// # Arguments
    ///
    /// * `encoder_resources` - encoder configuration and vocabulary (weights are not read)
    /// * `checkpoint_path` - checkpoint written by the training loop
    /// * `options` - options the checkpoint was trained with
    /// * `device` - device to run the model on
    pub fn new<P: AsRef<Path>>(
        encoder_resources: &EncoderResources,
        checkpoint_path: P,
        options: TrainingConfig,
        device: Device,
    ) -> Result<SentimentModel, KoBertError> {
        let pretrained = load_pretrained(encoder_resources)?;
        let mut var_store = nn::VarStore::new(device);
        let model = build_classifier(
            var_store.root(),
            options.classifier,
            &pretrained.config,
            &options.classifier_config(),
        )?;
        var_store.load(checkpoint_path.as_ref())?;
        Ok(SentimentModel {
            tokenizer: pretrained.tokenizer,
            model,
            options,
            var_store,
        })
    }

    pub fn tokenizer(&self) -> &TokenizerOption {
        &self.tokenizer
    }

    /// Classifies every example of a dataset, preserving the dataset order.
    pub fn predict_dataset(
        &self,
        dataset: &SentimentDataset,
        show: bool,
    ) -> Result<SentimentAnalysisOutput, KoBertError> {
        let num_examples = dataset.len() as i64;
        let probabilities = Tensor::zeros(
            &[num_examples, self.model.num_classes()],
            (Kind::Float, Device::Cpu),
        );
        let loader = DataLoader::new(
            dataset,
            self.options.batch_size,
            self.var_store.device(),
        )?;

        let mut accuracy = 0.0;
        let mut correct = 0.0;
        let mut num_batches = 0;
        let mut start = 0i64;
        for (batch_id, batch) in loader.iter().enumerate() {
            let output = process_batch(self.model.as_ref(), &batch, Phase::Evaluate, None)?;
            let batch_size = batch.size() as i64;
            accuracy += output.accuracy;
            correct += output.accuracy * batch_size as f64;
            num_batches += 1;

            let mut rows = probabilities.narrow(0, start, batch_size);
            rows.copy_(&output.probabilities.to_device(Device::Cpu));
            start += batch_size;

            let log_interval = self.options.log_interval;
            if show && log_interval > 0 && batch_id % log_interval == 0 {
                tracing::info!("Predict {:.2}%", start as f64 / num_examples as f64 * 100.0);
            }
        }

        let (accuracy, weighted_accuracy) = if num_batches == 0 {
            (0.0, 0.0)
        } else {
            (
                accuracy / num_batches as f64,
                correct / num_examples as f64,
            )
        };
        Ok(SentimentAnalysisOutput {
            probabilities,
            accuracy,
            weighted_accuracy,
        })
    }

    /// Classifies sentences.
    pub fn predict(&self, input: &[&str]) -> Result<Vec<Sentiment>, KoBertError> {
        let records = input
            .iter()
            .map(|text| Record {
                text: text.to_string(),
                label: 0,
            })
            .collect::<Vec<Record>>();
        let transform = SentenceTransform::new(&self.tokenizer, self.options.max_len);
        let dataset = SentimentDataset::new(&records, &transform);
        let output = self.predict_dataset(&dataset, false)?;

        let (scores, labels) = output.probabilities.max_dim(-1, false);
        let scores = Vec::<f64>::try_from(&scores.to_kind(Kind::Double))?;
        let labels = Vec::<i64>::try_from(&labels)?;
        Ok(labels
            .into_iter()
            .zip(scores)
            .map(|(label, score)| Sentiment { label, score })
            .collect())
    }
}

/// Runs a checkpoint over a labelled corpus.
///
/// # Returns
///
/// * `SentimentAnalysisOutput` with the probability matrix (rows in corpus order) and the
///   mean of the per-batch accuracies. The mean is not weighted by batch size, so a
///   smaller last batch weighs as much as a full one; `weighted_accuracy` is exact.
pub fn sentiment_analysis(
    config: SentimentAnalysisConfig,
) -> Result<SentimentAnalysisOutput, KoBertError> {
    let model = SentimentModel::new(
        &config.encoder_resources,
        &config.checkpoint_path,
        config.options.clone(),
        config.device,
    )?;
    let dataset = load_dataset(
        &config.corpus_path,
        config.fields,
        config.options.max_len,
        None,
        Some(model.tokenizer()),
    )?;
    model.predict_dataset(&dataset, config.show)
}
