use std::sync::Arc;

use candle::{DType, Device, Result, Tensor};
use candle_core as candle;
use candle_core::IndexOp;
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use candle_transformers::models::xlm_roberta::{self, XLMRobertaForSequenceClassification};
use serde::de::DeserializeOwned;

use super::utils::ModelFiles;

fn parse_config<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_json::from_str(content)
        .map_err(|e| candle::Error::Msg(format!("Failed to parse config: {}", e)))
}

fn read_config(files: &ModelFiles) -> Result<Config> {
    let content = std::fs::read_to_string(&files.config)?;
    parse_config(&content)
}

fn var_builder<'a>(files: &ModelFiles, dtype: DType, device: &Device) -> Result<VarBuilder<'a>> {
    // SAFETY: the weights file is not modified while mapped.
    unsafe { VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], dtype, device) }
}

/// Loads the BERT trunk under whichever prefix the checkpoint uses.
fn load_trunk(vb: &VarBuilder, config: &Config) -> Result<BertModel> {
    if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
        BertModel::load(vb.pp("bert"), config)
    } else if vb.contains_tensor("roberta.embeddings.word_embeddings.weight") {
        BertModel::load(vb.pp("roberta"), config)
    } else {
        BertModel::load(vb.clone(), config)
    }
}

/// Bi-encoder: CLS pooling followed by L2 normalisation.
#[derive(Clone)]
pub struct BertEncoder {
    bert: Arc<BertModel>,
    hidden_size: usize,
}

impl BertEncoder {
    pub fn load(files: &ModelFiles, dtype: DType, device: &Device) -> Result<Self> {
        let config = read_config(files)?;
        let vb = var_builder(files, dtype, device)?;
        let bert = load_trunk(&vb, &config)?;
        Ok(Self {
            bert: Arc::new(bert),
            hidden_size: config.hidden_size,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Returns the normalised `[1, hidden]` sentence embedding as `f32`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let output = self
            .bert
            .forward(input_ids, token_type_ids, attention_mask)?;
        let cls = output.i((.., 0, ..))?.to_dtype(DType::F32)?;
        let norm = cls.sqr()?.sum_keepdim(1)?.sqrt()?;
        cls.broadcast_div(&norm)
    }
}

/// Transformer family of a checkpoint, taken from `model_type` in `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    Bert,
    XlmRoberta,
}

impl Architecture {
    /// Anything other than `xlm-roberta` is loaded as BERT.
    pub fn from_config(content: &str) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct ModelType {
            model_type: Option<String>,
        }

        let declared: ModelType = parse_config(content)?;
        Ok(match declared.model_type.as_deref() {
            Some("xlm-roberta") => Architecture::XlmRoberta,
            _ => Architecture::Bert,
        })
    }
}

struct BertHead {
    bert: BertModel,
    classifier: Linear,
}

impl BertHead {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let bert = load_trunk(&vb, config)?;
        let classifier = candle_nn::linear(config.hidden_size, 1, vb.pp("classifier"))?;
        Ok(Self { bert, classifier })
    }

    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let output = self
            .bert
            .forward(input_ids, token_type_ids, attention_mask)?;
        let cls_token = output.i((.., 0, ..))?;
        self.classifier.forward(&cls_token)
    }
}

enum Classifier {
    Bert(BertHead),
    /// bge-reranker style checkpoints: `roberta` trunk with a
    /// `classifier.dense` / `classifier.out_proj` head.
    XlmRoberta(XLMRobertaForSequenceClassification),
}

/// Cross-encoder emitting one raw relevance logit per (query, document) pair.
#[derive(Clone)]
pub struct CrossEncoder {
    classifier: Arc<Classifier>,
    architecture: Architecture,
}

impl CrossEncoder {
    pub fn load(files: &ModelFiles, dtype: DType, device: &Device) -> Result<Self> {
        let content = std::fs::read_to_string(&files.config)?;
        let architecture = Architecture::from_config(&content)?;
        let vb = var_builder(files, dtype, device)?;

        let classifier = match architecture {
            Architecture::Bert => {
                let config: Config = parse_config(&content)?;
                Classifier::Bert(BertHead::load(vb, &config)?)
            }
            Architecture::XlmRoberta => {
                let config: xlm_roberta::Config = parse_config(&content)?;
                Classifier::XlmRoberta(XLMRobertaForSequenceClassification::new(1, &config, vb)?)
            }
        };

        Ok(Self {
            classifier: Arc::new(classifier),
            architecture,
        })
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Returns the `[1, 1]` logit as `f32`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let logits = match self.classifier.as_ref() {
            Classifier::Bert(head) => head.forward(input_ids, token_type_ids, Some(attention_mask))?,
            Classifier::XlmRoberta(model) => {
                model.forward(input_ids, attention_mask, token_type_ids)?
            }
        };
        logits.to_dtype(DType::F32)
    }
}
