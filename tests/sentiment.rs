extern crate anyhow;

mod common;

use common::{bert_config, local, Fixture, TEST_ROWS};
use kobert_sentiment::data::{load_dataset, DataLoader, FieldIndices};
use kobert_sentiment::kobert::EncoderResources;
use kobert_sentiment::model::{ClassifierConfig, SentimentClassifier};
use kobert_sentiment::pipelines::fine_tuning::{fine_tune, FineTuningConfig};
use kobert_sentiment::pipelines::sentiment::{
    sentiment_analysis, SentimentAnalysisConfig, SentimentModel, SentimentPolarity,
};
use kobert_sentiment::training::TrainingConfig;
use kobert_sentiment::KoBertError;
use tch::{nn, Device, Tensor};

fn options() -> TrainingConfig {
    TrainingConfig {
        batch_size: 2,
        num_epochs: 1,
        max_len: 8,
        log_interval: 1,
        seed: Some(0),
        ..Default::default()
    }
}

#[test]
fn fine_tune_then_predict_corpus() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let checkpoint = fixture.path("model.pt");

    //    Fine-tune on the 3-row corpus, one epoch of two batches
    let config = FineTuningConfig {
        options: options(),
        encoder_resources: fixture.encoder_resources(),
        train_corpus: local(fixture.path("train.tsv")),
        test_corpus: local(fixture.path("test.tsv")),
        fields: FieldIndices::default(),
        checkpoint_path: checkpoint.clone(),
        device: Device::Cpu,
        random_init: true,
    };
    let report = fine_tune(config)?;
    assert_eq!(report.epochs.len(), 1);
    let epoch = &report.epochs[0];
    assert_eq!(epoch.epoch, 1);
    assert!((0.0..=1.0).contains(&epoch.train_accuracy));
    assert!((0.0..=1.0).contains(&epoch.test_accuracy));
    assert!(epoch.mean_loss.is_finite());
    assert!(checkpoint.exists());

    //    Run the checkpoint over the evaluation corpus
    let output = sentiment_analysis(SentimentAnalysisConfig {
        checkpoint_path: checkpoint.clone(),
        corpus_path: fixture.path("test.tsv"),
        fields: FieldIndices::default(),
        options: options(),
        encoder_resources: fixture.encoder_resources(),
        device: Device::Cpu,
        show: true,
    })?;
    assert_eq!(output.probabilities.size(), vec![TEST_ROWS.len() as i64, 2]);
    assert!((0.0..=1.0).contains(&output.accuracy));
    assert!((0.0..=1.0).contains(&output.weighted_accuracy));

    let rows = output.rows()?;
    assert_eq!(rows.len(), TEST_ROWS.len());
    for row in &rows {
        assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    //    Row i of the corpus output is the prediction for sentence i
    let model = SentimentModel::new(
        &fixture.encoder_resources(),
        &checkpoint,
        options(),
        Device::Cpu,
    )?;
    for (row, (text, _)) in rows.iter().zip(TEST_ROWS.iter()) {
        let sentiment = model.predict(&[*text])?.remove(0);
        let expected = if row[1] > row[0] { 1 } else { 0 };
        assert_eq!(sentiment.label, expected);
        assert!((sentiment.score - row[expected as usize] as f64).abs() < 1e-5);
    }
    Ok(())
}

#[test]
fn two_row_corpus_trains_in_one_batch() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let corpus = fixture.write_corpus("two_rows.tsv", &[("정말 좋은 영화", 1), ("최악", 0)])?;
    let vocab_path = fixture.vocab_path();
    let dataset = load_dataset(
        &corpus,
        FieldIndices::default(),
        8,
        Some(vocab_path.as_path()),
        None,
    )?;
    assert_eq!(dataset.len(), 2);
    assert_eq!(DataLoader::new(&dataset, 2, Device::Cpu)?.num_batches(), 1);

    let report = fine_tune(FineTuningConfig {
        options: options(),
        encoder_resources: fixture.encoder_resources(),
        train_corpus: local(&corpus),
        test_corpus: local(&corpus),
        fields: FieldIndices::default(),
        checkpoint_path: fixture.path("model.pt"),
        device: Device::Cpu,
        random_init: true,
    })?;
    assert_eq!(report.epochs.len(), 1);
    // a single batch of two rows: accuracy is 0, 0.5 or 1
    for accuracy in [report.epochs[0].train_accuracy, report.epochs[0].test_accuracy] {
        assert!([0.0, 0.5, 1.0].contains(&accuracy));
    }
    Ok(())
}

#[test]
fn batched_predictions_match_single_predictions() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let checkpoint = fixture.path("model.pt");
    fine_tune(FineTuningConfig {
        options: options(),
        encoder_resources: fixture.encoder_resources(),
        train_corpus: local(fixture.path("train.tsv")),
        test_corpus: local(fixture.path("test.tsv")),
        fields: FieldIndices::default(),
        checkpoint_path: checkpoint.clone(),
        device: Device::Cpu,
        random_init: true,
    })?;

    let model = SentimentModel::new(
        &fixture.encoder_resources(),
        &checkpoint,
        options(),
        Device::Cpu,
    )?;
    let input = TEST_ROWS.iter().map(|(text, _)| *text).collect::<Vec<&str>>();
    let batched = model.predict(&input)?;
    assert_eq!(batched.len(), input.len());
    for (text, sentiment) in input.iter().zip(batched.iter()) {
        let single = model.predict(&[*text])?.remove(0);
        assert_eq!(single.label, sentiment.label);
        assert!((single.score - sentiment.score).abs() < 1e-5);
        assert!(sentiment.polarity().is_some());
    }
    Ok(())
}

#[test]
fn fine_tuning_requires_weights_or_random_init() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let result = fine_tune(FineTuningConfig {
        options: options(),
        encoder_resources: fixture.encoder_resources(),
        train_corpus: local(fixture.path("train.tsv")),
        test_corpus: local(fixture.path("test.tsv")),
        fields: FieldIndices::default(),
        checkpoint_path: fixture.path("model.pt"),
        device: Device::Cpu,
        random_init: false,
    });
    assert!(matches!(
        result,
        Err(KoBertError::InvalidConfigurationError(_))
    ));
    assert!(!fixture.path("model.pt").exists());
    Ok(())
}

#[test]
fn fine_tuning_starts_from_pretrained_weights() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let weights = fixture.path("encoder.ot");
    let checkpoint = fixture.path("model.pt");
    let pretrained_vs = nn::VarStore::new(Device::Cpu);
    let _pretrained = SentimentClassifier::new(
        pretrained_vs.root(),
        &bert_config(),
        &ClassifierConfig::default(),
    )?;
    pretrained_vs.save(&weights)?;

    //    A frozen encoder keeps the pretrained values through training
    fine_tune(FineTuningConfig {
        options: TrainingConfig {
            freeze_encoder: Some(true),
            ..options()
        },
        encoder_resources: EncoderResources {
            model_resource: Some(local(&weights)),
            ..fixture.encoder_resources()
        },
        train_corpus: local(fixture.path("train.tsv")),
        test_corpus: local(fixture.path("test.tsv")),
        fields: FieldIndices::default(),
        checkpoint_path: checkpoint.clone(),
        device: Device::Cpu,
        random_init: false,
    })?;

    let trained = Tensor::load_multi(&checkpoint)?
        .into_iter()
        .collect::<std::collections::HashMap<String, Tensor>>();
    let mut compared = 0;
    for (name, value) in Tensor::load_multi(&weights)? {
        if name.starts_with("classifier") {
            continue;
        }
        let diff = (&value - &trained[&name]).abs().max().double_value(&[]);
        assert_eq!(diff, 0.0, "{name} differs from the pretrained weights");
        compared += 1;
    }
    assert!(compared > 0);
    Ok(())
}

#[test]
fn polarity_follows_nsmc_labels() {
    assert_eq!(
        SentimentPolarity::from_label(0),
        Some(SentimentPolarity::Negative)
    );
    assert_eq!(
        SentimentPolarity::from_label(1),
        Some(SentimentPolarity::Positive)
    );
    assert_eq!(SentimentPolarity::from_label(2), None);
}

#[test]
fn missing_checkpoint_is_an_error() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let result = sentiment_analysis(SentimentAnalysisConfig {
        checkpoint_path: fixture.path("absent.pt"),
        corpus_path: fixture.path("test.tsv"),
        fields: FieldIndices::default(),
        options: options(),
        encoder_resources: fixture.encoder_resources(),
        device: Device::Cpu,
        show: false,
    });
    assert!(result.is_err());
    Ok(())
}
