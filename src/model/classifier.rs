// Copyright 2019-present, the HuggingFace Inc. team, The Google AI Language Team and Facebook, Inc.
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

use crate::common::dropout::OptionalDropout;
use crate::common::error::KoBertError;
use rust_bert::bert::{BertConfig, BertEmbeddings, BertModel};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use tch::{nn, Kind, Tensor};

/// # Classification head settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Number of target classes
    pub num_classes: i64,
    /// Dropout applied to the pooled output, disabled when `None` or zero
    pub drop_out_rate: Option<f64>,
    /// Run the encoder without gradient tracking so that only the head is trained
    pub freeze_encoder: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            num_classes: 2,
            drop_out_rate: None,
            freeze_encoder: false,
        }
    }
}

/// # Identifies the classifier architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifierVariant {
    /// Single head sentiment classifier
    Sentiment,
    /// Aspect-based classifier with two parallel heads
    Aspect,
}

/// Container for the classifier output
pub struct ClassifierOutput {
    /// Pre-softmax scores of shape (*batch size*, *num_classes*)
    pub logits: Tensor,
    /// Softmax over the class dimension, shape (*batch size*, *num_classes*)
    pub probabilities: Tensor,
}

impl ClassifierOutput {
    fn from_logits(logits: Tensor) -> ClassifierOutput {
        let probabilities = logits.softmax(-1, Kind::Float);
        ClassifierOutput {
            logits,
            probabilities,
        }
    }
}

/// # Sentence classifier on top of a BERT encoder
pub trait ClassifierHead {
    /// Looks up the encoder word embeddings of a batch of token ids.
    ///
    /// # Arguments
    ///
    /// * `token_ids` - Int64 tensor of shape (*batch size*, *sequence_length*)
    ///
    /// # Returns
    ///
    /// * `Tensor` of shape (*batch size*, *sequence_length*, *hidden_size*)
    fn input_embeddings(&self, token_ids: &Tensor) -> Tensor;

    /// Forward pass through the encoder and the classification head
    ///
    /// # Arguments
    ///
    /// * `input_embeds` - word embeddings of shape (*batch size*, *sequence_length*, *hidden_size*)
    /// * `segment_ids` - segment ids of shape (*batch size*, *sequence_length*)
    /// * `mask` - attention mask of shape (*batch size*, *sequence_length*), 1.0 for real tokens
    /// * `train` - enables dropout layers
    fn forward_t(
        &self,
        input_embeds: &Tensor,
        segment_ids: &Tensor,
        mask: &Tensor,
        train: bool,
    ) -> Result<ClassifierOutput, KoBertError>;

    fn num_classes(&self) -> i64;
}

/// # BERT encoder producing pooled sentence representations
/// The encoder variables are created directly under the given path so that pretrained
/// `BertModel` weights load without renaming.
pub struct KoBertEncoder {
    bert: BertModel<BertEmbeddings>,
    word_embeddings: Tensor,
    freeze: bool,
}

impl KoBertEncoder {
    pub fn new<'p, P>(p: P, config: &BertConfig, freeze: bool) -> Result<KoBertEncoder, KoBertError>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let p = p.borrow();
        let bert = BertModel::<BertEmbeddings>::new(p, config);
        let word_embeddings = (p / "embeddings" / "word_embeddings")
            .get("weight")
            .ok_or_else(|| {
                KoBertError::InvalidConfigurationError(
                    "encoder has no word embedding table".to_string(),
                )
            })?;
        Ok(KoBertEncoder {
            bert,
            word_embeddings,
            freeze,
        })
    }

    pub fn embed(&self, token_ids: &Tensor) -> Tensor {
        Tensor::embedding(&self.word_embeddings, token_ids, -1, false, false)
    }

    pub fn pooled_output(
        &self,
        input_embeds: &Tensor,
        segment_ids: &Tensor,
        mask: &Tensor,
        train: bool,
    ) -> Result<Tensor, KoBertError> {
        let run = || {
            self.bert.forward_t(
                None,
                Some(mask),
                Some(segment_ids),
                None,
                Some(input_embeds),
                None,
                None,
                train,
            )
        };
        let output = if self.freeze {
            tch::no_grad(run)
        } else {
            run()
        }?;
        output.pooled_output.ok_or_else(|| {
            KoBertError::ValueError("encoder did not produce a pooled output".to_string())
        })
    }
}

/// # Sentiment classifier
/// It is made of the following blocks:
/// - `encoder`: BERT encoder (pretrained)
/// - `dropout`: optional dropout on the pooled output
/// - `classifier`: linear projection to the class logits
pub struct SentimentClassifier {
    encoder: KoBertEncoder,
    dropout: OptionalDropout,
    classifier: nn::Linear,
    num_classes: i64,
}

impl SentimentClassifier {
    /// Build a new `SentimentClassifier`
    ///
    /// # Arguments
    ///
    /// * `p` - Variable store path for the root of the model
    /// * `bert_config` - `BertConfig` object defining the encoder architecture
    /// * `config` - classification head settings
    ///
    /// # Example
    ///
    /// ```no_run
    /// use kobert_sentiment::model::{ClassifierConfig, SentimentClassifier};
    /// use rust_bert::bert::BertConfig;
    /// use rust_bert::Config;
    /// use tch::{nn, Device};
    ///
    /// let vs = nn::VarStore::new(Device::Cpu);
    /// let bert_config = BertConfig::from_file("path/to/config.json");
    /// let model = SentimentClassifier::new(vs.root(), &bert_config, &ClassifierConfig::default())?;
    /// # Ok::<(), kobert_sentiment::KoBertError>(())
    /// ```
    pub fn new<'p, P>(
        p: P,
        bert_config: &BertConfig,
        config: &ClassifierConfig,
    ) -> Result<SentimentClassifier, KoBertError>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let p = p.borrow();
        let encoder = KoBertEncoder::new(p, bert_config, config.freeze_encoder)?;
        let dropout = OptionalDropout::new(config.drop_out_rate);
        let classifier = nn::linear(
            p / "classifier",
            bert_config.hidden_size,
            config.num_classes,
            Default::default(),
        );
        Ok(SentimentClassifier {
            encoder,
            dropout,
            classifier,
            num_classes: config.num_classes,
        })
    }
}

impl ClassifierHead for SentimentClassifier {
    fn input_embeddings(&self, token_ids: &Tensor) -> Tensor {
        self.encoder.embed(token_ids)
    }

    fn forward_t(
        &self,
        input_embeds: &Tensor,
        segment_ids: &Tensor,
        mask: &Tensor,
        train: bool,
    ) -> Result<ClassifierOutput, KoBertError> {
        let pooled = self
            .encoder
            .pooled_output(input_embeds, segment_ids, mask, train)?;
        let logits = pooled
            .apply_t(&self.dropout, train)
            .apply(&self.classifier);
        Ok(ClassifierOutput::from_logits(logits))
    }

    fn num_classes(&self) -> i64 {
        self.num_classes
    }
}

/// # Aspect-based sentiment classifier
/// Two parallel heads share the encoder. `forward_t` reports the first head; both are
/// available through `forward_all_t`.
pub struct AspectSentimentClassifier {
    encoder: KoBertEncoder,
    dropout_1: OptionalDropout,
    dropout_2: OptionalDropout,
    classifier_1: nn::Linear,
    classifier_2: nn::Linear,
    num_classes: i64,
}

impl AspectSentimentClassifier {
    pub fn new<'p, P>(
        p: P,
        bert_config: &BertConfig,
        config: &ClassifierConfig,
    ) -> Result<AspectSentimentClassifier, KoBertError>
    where
        P: Borrow<nn::Path<'p>>,
    {
        let p = p.borrow();
        let encoder = KoBertEncoder::new(p, bert_config, config.freeze_encoder)?;
        let classifier_1 = nn::linear(
            p / "classifier_1",
            bert_config.hidden_size,
            config.num_classes,
            Default::default(),
        );
        let classifier_2 = nn::linear(
            p / "classifier_2",
            bert_config.hidden_size,
            config.num_classes,
            Default::default(),
        );
        Ok(AspectSentimentClassifier {
            encoder,
            dropout_1: OptionalDropout::new(config.drop_out_rate),
            dropout_2: OptionalDropout::new(config.drop_out_rate),
            classifier_1,
            classifier_2,
            num_classes: config.num_classes,
        })
    }

    /// Forward pass returning the outputs of both heads
    pub fn forward_all_t(
        &self,
        input_embeds: &Tensor,
        segment_ids: &Tensor,
        mask: &Tensor,
        train: bool,
    ) -> Result<(ClassifierOutput, ClassifierOutput), KoBertError> {
        let pooled = self
            .encoder
            .pooled_output(input_embeds, segment_ids, mask, train)?;
        let first = pooled
            .apply_t(&self.dropout_1, train)
            .apply(&self.classifier_1);
        let second = pooled
            .apply_t(&self.dropout_2, train)
            .apply(&self.classifier_2);
        Ok((
            ClassifierOutput::from_logits(first),
            ClassifierOutput::from_logits(second),
        ))
    }
}

impl ClassifierHead for AspectSentimentClassifier {
    fn input_embeddings(&self, token_ids: &Tensor) -> Tensor {
        self.encoder.embed(token_ids)
    }

    fn forward_t(
        &self,
        input_embeds: &Tensor,
        segment_ids: &Tensor,
        mask: &Tensor,
        train: bool,
    ) -> Result<ClassifierOutput, KoBertError> {
        let pooled = self
            .encoder
            .pooled_output(input_embeds, segment_ids, mask, train)?;
        let logits = pooled
            .apply_t(&self.dropout_1, train)
            .apply(&self.classifier_1);
        Ok(ClassifierOutput::from_logits(logits))
    }

    fn num_classes(&self) -> i64 {
        self.num_classes
    }
}

/// Builds the classifier of the requested variant.
pub fn build_classifier<'p, P>(
    p: P,
    variant: ClassifierVariant,
    bert_config: &BertConfig,
    config: &ClassifierConfig,
) -> Result<Box<dyn ClassifierHead>, KoBertError>
where
    P: Borrow<nn::Path<'p>>,
{
    Ok(match variant {
        ClassifierVariant::Sentiment => {
            Box::new(SentimentClassifier::new(p, bert_config, config)?)
        }
        ClassifierVariant::Aspect => {
            Box::new(AspectSentimentClassifier::new(p, bert_config, config)?)
        }
    })
}
