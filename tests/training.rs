extern crate anyhow;

mod common;

use common::{bert_config, Fixture};
use kobert_sentiment::data::{load_dataset, FieldIndices, SentimentDataset, TokenizerOption};
use kobert_sentiment::model::{ClassifierConfig, SentimentClassifier};
use kobert_sentiment::training::{Trainer, TrainingConfig};
use std::collections::HashMap;
use tch::{nn, Device, Tensor};

fn options() -> TrainingConfig {
    TrainingConfig {
        batch_size: 2,
        num_epochs: 2,
        max_len: 8,
        learning_rate: 1e-3,
        warmup_ratio: 0.0,
        drop_out_rate: None,
        log_interval: 0,
        ..Default::default()
    }
}

fn datasets(fixture: &Fixture) -> anyhow::Result<(SentimentDataset, SentimentDataset)> {
    let tokenizer = TokenizerOption::from_vocab_file(fixture.vocab_path())?;
    let train = load_dataset(
        fixture.path("train.tsv"),
        FieldIndices::default(),
        8,
        None,
        Some(&tokenizer),
    )?;
    let test = load_dataset(
        fixture.path("test.tsv"),
        FieldIndices::default(),
        8,
        None,
        Some(&tokenizer),
    )?;
    Ok((train, test))
}

fn snapshot(vs: &nn::VarStore) -> HashMap<String, Tensor> {
    vs.variables()
        .into_iter()
        .map(|(name, variable)| (name, variable.detach().copy()))
        .collect()
}

fn max_abs_diff(left: &Tensor, right: &Tensor) -> f64 {
    (left - right).abs().max().double_value(&[])
}

fn classifier(vs: &nn::VarStore, freeze_encoder: bool) -> anyhow::Result<SentimentClassifier> {
    let config = ClassifierConfig {
        drop_out_rate: None,
        freeze_encoder,
        ..Default::default()
    };
    Ok(SentimentClassifier::new(vs.root(), &bert_config(), &config)?)
}

#[test]
fn training_updates_the_classifier() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let (train, test) = datasets(&fixture)?;
    let vs = nn::VarStore::new(Device::Cpu);
    let model = classifier(&vs, false)?;
    let before = snapshot(&vs);

    let options = options();
    let report =
        Trainer::new(&model, &vs, &options, fixture.path("model.pt")).train(&train, &test)?;
    assert_eq!(report.epochs.len(), 2);

    let after = snapshot(&vs);
    assert!(max_abs_diff(&before["classifier.weight"], &after["classifier.weight"]) > 0.0);
    assert!(
        max_abs_diff(
            &before["embeddings.word_embeddings.weight"],
            &after["embeddings.word_embeddings.weight"]
        ) > 0.0
    );
    Ok(())
}

#[test]
fn frozen_encoder_is_left_untouched() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let (train, test) = datasets(&fixture)?;
    let vs = nn::VarStore::new(Device::Cpu);
    let model = classifier(&vs, true)?;
    let before = snapshot(&vs);

    let options = TrainingConfig {
        freeze_encoder: Some(true),
        ..options()
    };
    Trainer::new(&model, &vs, &options, fixture.path("model.pt")).train(&train, &test)?;

    let after = snapshot(&vs);
    for (name, value) in before.iter() {
        let diff = max_abs_diff(value, &after[name]);
        if name.starts_with("classifier") {
            assert!(diff > 0.0, "{name} should have been trained");
        } else {
            assert_eq!(diff, 0.0, "{name} should be unchanged");
        }
    }
    Ok(())
}

#[test]
fn each_run_overwrites_the_checkpoint() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let (train, test) = datasets(&fixture)?;
    let checkpoint = fixture.path("model.pt");
    let options = options();

    tch::manual_seed(1);
    let first_vs = nn::VarStore::new(Device::Cpu);
    let first = classifier(&first_vs, false)?;
    Trainer::new(&first, &first_vs, &options, &checkpoint).train(&train, &test)?;

    tch::manual_seed(2);
    let second_vs = nn::VarStore::new(Device::Cpu);
    let second = classifier(&second_vs, false)?;
    Trainer::new(&second, &second_vs, &options, &checkpoint).train(&train, &test)?;

    let mut restored_vs = nn::VarStore::new(Device::Cpu);
    let _restored = classifier(&restored_vs, false)?;
    restored_vs.load(&checkpoint)?;

    let first = snapshot(&first_vs);
    let second = snapshot(&second_vs);
    let restored = snapshot(&restored_vs);
    for name in ["classifier.weight", "embeddings.word_embeddings.weight"] {
        assert_eq!(max_abs_diff(&restored[name], &second[name]), 0.0);
        assert!(max_abs_diff(&restored[name], &first[name]) > 0.0);
    }
    Ok(())
}
