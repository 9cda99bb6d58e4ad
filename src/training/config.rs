use crate::common::error::KoBertError;
use crate::model::{ClassifierConfig, ClassifierVariant};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// # Fine-tuning options
/// Immutable set of hyper-parameters for one training or inference run. Every field has a
/// default, so a JSON file only needs the values that differ.
///
/// # Example
///
/// ```no_run
/// use kobert_sentiment::training::TrainingConfig;
///
/// let from_file = TrainingConfig::from_file("path/to/options.json")?;
/// let quick_run = TrainingConfig {
///     num_epochs: 1,
///     batch_size: 32,
///     ..Default::default()
/// };
/// # Ok::<(), kobert_sentiment::KoBertError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub batch_size: usize,
    pub num_epochs: usize,
    /// Number of token positions of every encoded sentence
    pub max_len: usize,
    pub learning_rate: f64,
    /// Dropout on the pooled output, `None` or zero disables it
    pub drop_out_rate: Option<f64>,
    /// Fraction of the total number of steps spent in linear warmup
    pub warmup_ratio: f64,
    /// Maximum global norm of the gradients
    pub max_grad_norm: f64,
    /// Number of batches between two progress lines
    pub log_interval: usize,
    /// Decoupled weight decay applied to every parameter but biases and layer norms
    pub weight_decay: f64,
    pub num_classes: i64,
    pub classifier: ClassifierVariant,
    /// Freeze the encoder, defaults to `true` for the aspect classifier only
    pub freeze_encoder: Option<bool>,
    /// Visit training batches in a new random order at every epoch
    pub shuffle: bool,
    /// Seed of the torch generator (dropout, shuffling)
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            batch_size: 64,
            num_epochs: 5,
            max_len: 64,
            learning_rate: 5e-5,
            drop_out_rate: Some(0.5),
            warmup_ratio: 0.2,
            max_grad_norm: 1.0,
            log_interval: 100,
            weight_decay: 0.01,
            num_classes: 2,
            classifier: ClassifierVariant::Sentiment,
            freeze_encoder: None,
            shuffle: false,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Reads options from a JSON file. Missing fields take their default value.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<TrainingConfig, KoBertError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|error| KoBertError::IOError(format!("{}: {}", path.display(), error)))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Classification head settings derived from these options
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            num_classes: self.num_classes,
            drop_out_rate: self.drop_out_rate,
            freeze_encoder: self
                .freeze_encoder
                .unwrap_or(self.classifier == ClassifierVariant::Aspect),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_options_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"num_epochs": 2, "classifier": "Aspect"}}"#).unwrap();
        let config = TrainingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.num_epochs, 2);
        assert_eq!(config.classifier, ClassifierVariant::Aspect);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn malformed_or_missing_options_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"num_epochs\": ").unwrap();
        assert!(matches!(
            TrainingConfig::from_file(file.path()),
            Err(KoBertError::InvalidConfigurationError(_))
        ));

        let missing = file.path().with_extension("absent");
        assert!(matches!(
            TrainingConfig::from_file(missing),
            Err(KoBertError::IOError(_))
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"batch_size": 8, "drop_out_rate": null}"#).unwrap();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.drop_out_rate, None);
        assert_eq!(config.num_epochs, 5);
        assert_eq!(config.max_len, 64);
        assert_eq!(config.learning_rate, 5e-5);
        assert_eq!(config.log_interval, 100);
    }

    #[test]
    fn aspect_classifier_freezes_encoder_by_default() {
        let sentiment = TrainingConfig::default();
        assert!(!sentiment.classifier_config().freeze_encoder);

        let aspect = TrainingConfig {
            classifier: ClassifierVariant::Aspect,
            ..Default::default()
        };
        assert!(aspect.classifier_config().freeze_encoder);

        let trained_aspect = TrainingConfig {
            classifier: ClassifierVariant::Aspect,
            freeze_encoder: Some(false),
            ..Default::default()
        };
        assert!(!trained_aspect.classifier_config().freeze_encoder);
    }
}
