use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use kobert_sentiment::data::FieldIndices;
use kobert_sentiment::kobert::EncoderResources;
use kobert_sentiment::pipelines::fine_tuning::{fine_tune, FineTuningConfig, DEFAULT_CHECKPOINT};
use kobert_sentiment::pipelines::sentiment::{sentiment_analysis, SentimentAnalysisConfig};
use kobert_sentiment::training::TrainingConfig;
use rust_bert::resources::{LocalResource, ResourceProvider};
use std::path::{Path, PathBuf};
use tch::Device;

#[derive(Parser, Debug)]
#[command(
    name = "kobert-sentiment",
    version,
    about = "Fine-tune and run KoBERT sentiment classifiers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fine-tune a classifier and write the checkpoint
    Train(TrainArgs),
    /// Run a checkpoint over a labelled corpus
    Predict(PredictArgs),
    /// Convert a .npz weights archive to a tch weights file
    Convert {
        source: PathBuf,
        destination: PathBuf,
    },
}

#[derive(Args, Debug)]
struct EncoderArgs {
    /// Encoder config.json, KoBERT when absent
    #[arg(long)]
    encoder_config: Option<PathBuf>,
    /// Token to id table (vocab.txt), KoBERT when absent
    #[arg(long)]
    vocab: Option<PathBuf>,
    /// SentencePiece model splitting text into vocabulary pieces, KoBERT when absent
    #[arg(long, conflicts_with = "word_piece")]
    spiece: Option<PathBuf>,
    /// Tokenize with WordPiece on the vocabulary instead of SentencePiece
    #[arg(long)]
    word_piece: bool,
    /// Run on CPU even when CUDA is available
    #[arg(long)]
    cpu: bool,
}

impl EncoderArgs {
    fn resources(&self, weights: Option<&Path>) -> EncoderResources {
        let mut resources = EncoderResources::default();
        if let Some(path) = &self.encoder_config {
            resources.config_resource = local(path);
        }
        if let Some(path) = &self.vocab {
            resources.vocab_resource = local(path);
        }
        if self.word_piece {
            resources.sentencepiece_resource = None;
        } else if let Some(path) = &self.spiece {
            resources.sentencepiece_resource = Some(local(path));
        }
        resources.model_resource = weights.map(local);
        resources
    }

    fn device(&self) -> Device {
        if self.cpu {
            Device::Cpu
        } else {
            Device::cuda_if_available()
        }
    }
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// JSON file with training options
    #[arg(long)]
    options: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_CHECKPOINT)]
    checkpoint: PathBuf,
    /// Training corpus, NSMC train split when absent
    #[arg(long)]
    train: Option<PathBuf>,
    /// Evaluation corpus, NSMC test split when absent
    #[arg(long)]
    test: Option<PathBuf>,
    /// Pretrained encoder weights
    #[arg(long, required_unless_present = "random_init")]
    weights: Option<PathBuf>,
    /// Train from a randomly initialized encoder
    #[arg(long)]
    random_init: bool,
    #[arg(long, default_value_t = 1)]
    sentence_idx: usize,
    #[arg(long, default_value_t = 2)]
    label_idx: usize,
    #[command(flatten)]
    encoder: EncoderArgs,
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// JSON file with the options the checkpoint was trained with
    #[arg(long)]
    options: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_CHECKPOINT)]
    checkpoint: PathBuf,
    #[arg(long)]
    corpus: PathBuf,
    #[arg(long, default_value_t = 1)]
    sentence_idx: usize,
    #[arg(long, default_value_t = 2)]
    label_idx: usize,
    /// Log progress while predicting
    #[arg(long)]
    show: bool,
    #[command(flatten)]
    encoder: EncoderArgs,
}

fn local(path: &Path) -> Box<dyn ResourceProvider + Send> {
    Box::new(LocalResource {
        local_path: path.to_path_buf(),
    })
}

fn training_options(path: Option<&Path>) -> anyhow::Result<TrainingConfig> {
    Ok(match path {
        Some(path) => TrainingConfig::from_file(path)?,
        None => TrainingConfig::default(),
    })
}

fn train(args: TrainArgs) -> anyhow::Result<()> {
    let mut config = FineTuningConfig {
        options: training_options(args.options.as_deref())?,
        encoder_resources: args.encoder.resources(args.weights.as_deref()),
        fields: FieldIndices::new(args.sentence_idx, args.label_idx),
        checkpoint_path: args.checkpoint,
        device: args.encoder.device(),
        random_init: args.random_init,
        ..Default::default()
    };
    if let Some(path) = &args.train {
        config.train_corpus = local(path);
    }
    if let Some(path) = &args.test {
        config.test_corpus = local(path);
    }

    let report = fine_tune(config)?;
    for epoch in report.epochs {
        println!(
            "epoch {}: train acc {:.4}, test acc {:.4}, loss {:.4}",
            epoch.epoch, epoch.train_accuracy, epoch.test_accuracy, epoch.mean_loss
        );
    }
    Ok(())
}

fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let config = SentimentAnalysisConfig {
        checkpoint_path: args.checkpoint,
        corpus_path: args.corpus,
        fields: FieldIndices::new(args.sentence_idx, args.label_idx),
        options: training_options(args.options.as_deref())?,
        encoder_resources: args.encoder.resources(None),
        device: args.encoder.device(),
        show: args.show,
    };
    let output = sentiment_analysis(config)?;
    println!(
        "{} examples, accuracy {:.4} (per example {:.4})",
        output.probabilities.size()[0],
        output.accuracy,
        output.weighted_accuracy
    );
    Ok(())
}

fn convert(source: PathBuf, destination: PathBuf) -> anyhow::Result<()> {
    let tensors = tch::Tensor::read_npz(&source)
        .with_context(|| format!("reading {}", source.display()))?;
    tch::Tensor::save_multi(&tensors, &destination)?;
    println!("{} tensors written to {}", tensors.len(), destination.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kobert_sentiment=info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Train(args) => train(args),
        Commands::Predict(args) => predict(args),
        Commands::Convert {
            source,
            destination,
        } => convert(source, destination),
    }
}
