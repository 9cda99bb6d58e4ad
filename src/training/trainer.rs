use crate::common::error::KoBertError;
use crate::data::{Batch, DataLoader, SentimentDataset};
use crate::model::{gen_attention_mask, ClassifierHead};
use crate::training::config::TrainingConfig;
use crate::training::optimization::{LinearWarmupSchedule, ParameterGroups};
use std::path::{Path, PathBuf};
use tch::nn::OptimizerConfig;
use tch::{nn, Device, Kind, Tensor};

/// Fraction of rows whose arg-max class equals the label.
///
/// # Arguments
///
/// * `probabilities` - class scores of shape (*batch size*, *num_classes*)
/// * `labels` - Int64 labels of shape (*batch size*)
pub fn calculate_accuracy(probabilities: &Tensor, labels: &Tensor) -> f64 {
    let predictions = probabilities.argmax(-1, false);
    let rows = predictions.size()[0];
    if rows == 0 {
        return 0.0;
    }
    let correct = predictions
        .eq_tensor(labels)
        .to_kind(Kind::Int64)
        .sum(Kind::Int64)
        .int64_value(&[]);
    correct as f64 / rows as f64
}

/// # Step of a batch computation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Gradients tracked, dropout active
    Train,
    /// No gradient tracking, dropout disabled
    Evaluate,
}

impl Phase {
    pub fn grad_enabled(self) -> bool {
        self == Phase::Train
    }
}

/// Result of a single batch
pub struct BatchOutput {
    /// Cross-entropy of the batch
    pub loss: f64,
    pub accuracy: f64,
    /// Detached class probabilities of shape (*batch size*, *num_classes*)
    pub probabilities: Tensor,
}

/// # Parameter update applied after a training forward pass
/// Zeroes the gradients, back-propagates, clips the global gradient norm, applies the
/// decoupled weight decay, steps the optimizer, then the learning rate schedule.
pub struct UpdateStep<'a> {
    pub optimizer: &'a mut nn::Optimizer,
    pub schedule: &'a mut LinearWarmupSchedule,
    pub groups: &'a ParameterGroups,
    pub max_grad_norm: f64,
    pub weight_decay: f64,
}

impl<'a> UpdateStep<'a> {
    fn apply(&mut self, loss: &Tensor) -> Result<(), KoBertError> {
        self.optimizer.zero_grad();
        loss.backward();
        self.groups.clip_grad_norm(self.max_grad_norm)?;
        self.groups
            .apply_weight_decay(self.schedule.current_lr(), self.weight_decay)?;
        self.optimizer.step();
        self.schedule.step(&mut *self.optimizer);
        Ok(())
    }
}

/// Runs one batch through the model.
///
/// Training and evaluation share this routine: `phase` selects gradient tracking and
/// dropout, `update` (only meaningful with `Phase::Train`) modifies the parameters.
pub fn process_batch<M: ClassifierHead + ?Sized>(
    model: &M,
    batch: &Batch,
    phase: Phase,
    update: Option<&mut UpdateStep>,
) -> Result<BatchOutput, KoBertError> {
    let _no_grad = if phase.grad_enabled() {
        None
    } else {
        Some(tch::no_grad_guard())
    };

    let mask = gen_attention_mask(&batch.token_ids, &batch.valid_length)?;
    let input_embeds = model.input_embeddings(&batch.token_ids);
    let output = model.forward_t(
        &input_embeds,
        &batch.segment_ids,
        &mask,
        phase.grad_enabled(),
    )?;
    let loss = output.logits.cross_entropy_for_logits(&batch.labels);

    if let Some(update) = update {
        update.apply(&loss)?;
    }

    Ok(BatchOutput {
        loss: loss.double_value(&[]),
        accuracy: calculate_accuracy(&output.probabilities, &batch.labels),
        probabilities: output.probabilities.detach(),
    })
}

/// Accuracy and loss of one epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochSummary {
    pub epoch: usize,
    /// Mean of the per-batch training accuracies
    pub train_accuracy: f64,
    /// Mean of the per-batch evaluation accuracies
    pub test_accuracy: f64,
    /// Mean of the per-batch training losses
    pub mean_loss: f64,
}

/// Per-epoch results of a training run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub epochs: Vec<EpochSummary>,
}

/// # Fine-tuning loop
/// Alternates a training pass and an evaluation pass per epoch, then saves every
/// variable of the var store to the checkpoint path.
pub struct Trainer<'a, M: ClassifierHead + ?Sized> {
    model: &'a M,
    var_store: &'a nn::VarStore,
    config: &'a TrainingConfig,
    checkpoint_path: PathBuf,
}

impl<'a, M: ClassifierHead + ?Sized> Trainer<'a, M> {
    pub fn new<P: AsRef<Path>>(
        model: &'a M,
        var_store: &'a nn::VarStore,
        config: &'a TrainingConfig,
        checkpoint_path: P,
    ) -> Trainer<'a, M> {
        Trainer {
            model,
            var_store,
            config,
            checkpoint_path: checkpoint_path.as_ref().to_path_buf(),
        }
    }

    fn loader<'d>(
        &self,
        dataset: &'d SentimentDataset,
        shuffle: bool,
    ) -> Result<DataLoader<'d>, KoBertError> {
        let device: Device = self.var_store.device();
        if shuffle {
            DataLoader::shuffled(dataset, self.config.batch_size, device)
        } else {
            DataLoader::new(dataset, self.config.batch_size, device)
        }
    }

    pub fn train(
        &self,
        train_dataset: &SentimentDataset,
        test_dataset: &SentimentDataset,
    ) -> Result<TrainingReport, KoBertError> {
        let config = self.config;
        if let Some(seed) = config.seed {
            tch::manual_seed(seed as i64);
        }

        let batches_per_epoch = self.loader(train_dataset, false)?.num_batches();
        let mut schedule = LinearWarmupSchedule::new(
            config.learning_rate,
            batches_per_epoch * config.num_epochs,
            config.warmup_ratio,
        );
        let groups = ParameterGroups::from_var_store(self.var_store);
        let mut optimizer = nn::AdamW {
            wd: 0.0,
            ..Default::default()
        }
        .build(self.var_store, schedule.current_lr())?;
        tracing::debug!(
            "{} parameters with weight decay, {} without, {} warmup steps out of {}",
            groups.decay_names().len(),
            groups.no_decay_names().len(),
            schedule.warmup_steps(),
            schedule.total_steps()
        );

        let mut update = UpdateStep {
            optimizer: &mut optimizer,
            schedule: &mut schedule,
            groups: &groups,
            max_grad_norm: config.max_grad_norm,
            weight_decay: config.weight_decay,
        };

        let mut report = TrainingReport::default();
        for epoch in 1..=config.num_epochs {
            let mut train_accuracy = 0.0;
            let mut train_loss = 0.0;
            let mut train_batches = 0;
            let train_loader = self.loader(train_dataset, config.shuffle)?;
            for (batch_id, batch) in train_loader.iter().enumerate() {
                let output =
                    process_batch(self.model, &batch, Phase::Train, Some(&mut update))?;
                train_accuracy += output.accuracy;
                train_loss += output.loss;
                train_batches += 1;
                if config.log_interval > 0 && batch_id % config.log_interval == 0 {
                    tracing::info!(
                        "epoch {} batch id {} loss {:.6} train acc {:.6}",
                        epoch,
                        batch_id + 1,
                        output.loss,
                        train_accuracy / train_batches as f64
                    );
                }
            }
            let train_accuracy = mean(train_accuracy, train_batches);
            tracing::info!("epoch {} train acc {:.6}", epoch, train_accuracy);

            let mut test_accuracy = 0.0;
            let mut test_batches = 0;
            for batch in self.loader(test_dataset, false)?.iter() {
                let output = process_batch(self.model, &batch, Phase::Evaluate, None)?;
                test_accuracy += output.accuracy;
                test_batches += 1;
            }
            let test_accuracy = mean(test_accuracy, test_batches);
            tracing::info!("epoch {} test acc {:.6}", epoch, test_accuracy);

            report.epochs.push(EpochSummary {
                epoch,
                train_accuracy,
                test_accuracy,
                mean_loss: mean(train_loss, train_batches),
            });
        }

        self.var_store.save(&self.checkpoint_path)?;
        tracing::info!("Saved checkpoint to {}", self.checkpoint_path.display());
        Ok(report)
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accuracy_counts_argmax_matches() {
        let probabilities = Tensor::from_slice(&[0.9f32, 0.1, 0.2, 0.8]).view([2, 2]);
        let labels = Tensor::from_slice(&[0i64, 0]);
        assert_eq!(calculate_accuracy(&probabilities, &labels), 0.5);
    }

    #[test]
    fn accuracy_of_empty_batch_is_zero() {
        let probabilities = Tensor::zeros(&[0, 2], (Kind::Float, Device::Cpu));
        let labels = Tensor::zeros(&[0], (Kind::Int64, Device::Cpu));
        assert_eq!(calculate_accuracy(&probabilities, &labels), 0.0);
    }
}
