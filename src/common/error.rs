use rust_bert::RustBertError;
use rust_tokenizers::error::TokenizerError;
use tch::TchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KoBertError {
    #[error("Missing tokenizer source: either a vocabulary or a tokenizer must be provided")]
    MissingTokenizerSource,

    #[error("Corpus error: {0}")]
    CorpusError(String),

    #[error("Resource error: {0}")]
    ResourceError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Tch tensor error: {0}")]
    TchError(String),

    #[error("Tokenizer error: {0}")]
    TokenizerError(String),

    #[error("Invalid configuration error: {0}")]
    InvalidConfigurationError(String),

    #[error("Value error: {0}")]
    ValueError(String),
}

impl From<RustBertError> for KoBertError {
    fn from(error: RustBertError) -> Self {
        match error {
            RustBertError::TchError(message) => KoBertError::TchError(message),
            RustBertError::TokenizerError(message) => KoBertError::TokenizerError(message),
            RustBertError::IOError(message) => KoBertError::IOError(message),
            RustBertError::InvalidConfigurationError(message) => {
                KoBertError::InvalidConfigurationError(message)
            }
            RustBertError::ValueError(message) => KoBertError::ValueError(message),
            other => KoBertError::ResourceError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for KoBertError {
    fn from(error: std::io::Error) -> Self {
        KoBertError::IOError(error.to_string())
    }
}

impl From<TokenizerError> for KoBertError {
    fn from(error: TokenizerError) -> Self {
        KoBertError::TokenizerError(error.to_string())
    }
}

impl From<TchError> for KoBertError {
    fn from(error: TchError) -> Self {
        KoBertError::TchError(error.to_string())
    }
}

impl From<csv::Error> for KoBertError {
    fn from(error: csv::Error) -> Self {
        KoBertError::CorpusError(error.to_string())
    }
}

impl From<serde_json::Error> for KoBertError {
    fn from(error: serde_json::Error) -> Self {
        KoBertError::InvalidConfigurationError(error.to_string())
    }
}
