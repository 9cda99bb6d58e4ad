use crate::common::error::KoBertError;
use crate::data::TokenizerOption;
use rust_bert::bert::BertConfig;
use rust_bert::resources::{RemoteResource, ResourceProvider};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tch::nn;

/// # KoBERT pretrained model config files
pub struct KoBertConfigResources;

/// # KoBERT pretrained model vocab files
pub struct KoBertVocabResources;

impl KoBertConfigResources {
    /// Shared under Apache 2.0 license by SK Telecom at <https://github.com/SKTBrain/KoBERT>.
    pub const KOBERT: (&'static str, &'static str) = (
        "kobert/config",
        "https://huggingface.co/skt/kobert-base-v1/resolve/main/config.json",
    );
}

impl KoBertVocabResources {
    /// Token to id table of the embedding matrix (`[UNK]`=0, `[PAD]`=1, `[CLS]`=2, `[SEP]`=3, `[MASK]`=4).
    /// Shared under Apache 2.0 license by SK Telecom at <https://github.com/SKTBrain/KoBERT>.
    pub const KOBERT: (&'static str, &'static str) = (
        "kobert/vocab",
        "https://huggingface.co/skt/kobert-base-v1/resolve/main/vocab.txt",
    );
    /// SentencePiece segmentation model.
    /// Shared under Apache 2.0 license by SK Telecom at <https://github.com/SKTBrain/KoBERT>.
    pub const KOBERT_SPIECE: (&'static str, &'static str) = (
        "kobert/spiece",
        "https://huggingface.co/skt/kobert-base-v1/resolve/main/spiece.model",
    );
}

/// # Resources of the pretrained encoder
pub struct EncoderResources {
    /// Encoder configuration (`config.json`)
    pub config_resource: Box<dyn ResourceProvider + Send>,
    /// Vocabulary (`vocab.txt`) indexing the word embedding table
    pub vocab_resource: Box<dyn ResourceProvider + Send>,
    /// SentencePiece model splitting text into vocabulary pieces. WordPiece is used on
    /// `vocab_resource` when `None`.
    pub sentencepiece_resource: Option<Box<dyn ResourceProvider + Send>>,
    /// Pretrained weights in a `tch` readable format
    pub model_resource: Option<Box<dyn ResourceProvider + Send>>,
}

impl Default for EncoderResources {
    fn default() -> Self {
        EncoderResources {
            config_resource: Box::new(RemoteResource::from_pretrained(
                KoBertConfigResources::KOBERT,
            )),
            vocab_resource: Box::new(RemoteResource::from_pretrained(
                KoBertVocabResources::KOBERT,
            )),
            sentencepiece_resource: Some(Box::new(RemoteResource::from_pretrained(
                KoBertVocabResources::KOBERT_SPIECE,
            ))),
            model_resource: None,
        }
    }
}

/// Encoder configuration, tokenizer and weights location
pub struct PretrainedEncoder {
    pub config: BertConfig,
    pub tokenizer: TokenizerOption,
    pub weights_path: Option<PathBuf>,
}

/// Resolves the encoder resources, reads the configuration and builds the tokenizer.
pub fn load_pretrained(resources: &EncoderResources) -> Result<PretrainedEncoder, KoBertError> {
    let config_path = resources.config_resource.get_local_path()?;
    let vocab_path = resources.vocab_resource.get_local_path()?;
    let sentencepiece_path = resources
        .sentencepiece_resource
        .as_ref()
        .map(|resource| resource.get_local_path())
        .transpose()?;
    let weights_path = resources
        .model_resource
        .as_ref()
        .map(|resource| resource.get_local_path())
        .transpose()?;

    let config = read_bert_config(&config_path)?;
    let tokenizer = TokenizerOption::from_files(&vocab_path, sentencepiece_path.as_ref())?;
    Ok(PretrainedEncoder {
        config,
        tokenizer,
        weights_path,
    })
}

fn read_bert_config(path: &Path) -> Result<BertConfig, KoBertError> {
    let file = File::open(path)
        .map_err(|error| KoBertError::IOError(format!("{}: {}", path.display(), error)))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Loads pretrained encoder weights into a var store holding a classifier.
///
/// Head variables are expected to be absent from the file. Missing encoder variables
/// are reported; a file that provides none of them is rejected.
pub fn load_pretrained_weights(vs: &mut nn::VarStore, path: &Path) -> Result<(), KoBertError> {
    let encoder_variables = vs
        .variables()
        .keys()
        .filter(|name| !is_head_variable(name))
        .count();
    let missing = vs.load_partial(path)?;
    let missing_encoder = missing
        .iter()
        .filter(|name| !is_head_variable(name))
        .collect::<Vec<_>>();

    if encoder_variables > 0 && missing_encoder.len() == encoder_variables {
        return Err(KoBertError::InvalidConfigurationError(format!(
            "no encoder variable found in {}",
            path.display()
        )));
    }
    if !missing_encoder.is_empty() {
        tracing::warn!(
            "{} encoder variables missing from {}, first: {}",
            missing_encoder.len(),
            path.display(),
            missing_encoder[0]
        );
    }
    tracing::info!("Loaded pretrained encoder weights from {}", path.display());
    Ok(())
}

fn is_head_variable(name: &str) -> bool {
    name.starts_with("classifier")
}
