use crate::common::error::KoBertError;
use crate::data::dataset::{EncodedExample, SentimentDataset};
use tch::{Device, Kind, Tensor};

/// # Batch of encoded examples stacked into tensors
pub struct Batch {
    /// Token ids of shape (*batch size*, *max_len*)
    pub token_ids: Tensor,
    /// Number of non-padding positions of each row
    pub valid_length: Vec<i64>,
    /// Segment ids of shape (*batch size*, *max_len*)
    pub segment_ids: Tensor,
    /// Class labels of shape (*batch size*)
    pub labels: Tensor,
}

impl Batch {
    /// Stacks examples sharing the same `max_len` and moves them to `device`.
    pub fn from_examples(examples: &[&EncodedExample], max_len: usize, device: Device) -> Batch {
        let rows = examples.len() as i64;
        let mut token_ids = Vec::with_capacity(examples.len() * max_len);
        let mut segment_ids = Vec::with_capacity(examples.len() * max_len);
        let mut valid_length = Vec::with_capacity(examples.len());
        let mut labels = Vec::with_capacity(examples.len());
        for example in examples {
            token_ids.extend_from_slice(&example.token_ids);
            segment_ids.extend_from_slice(&example.segment_ids);
            valid_length.push(example.valid_length);
            labels.push(example.label);
        }
        let max_len = max_len as i64;
        Batch {
            token_ids: Tensor::from_slice(&token_ids)
                .view([rows, max_len])
                .to(device),
            valid_length,
            segment_ids: Tensor::from_slice(&segment_ids)
                .view([rows, max_len])
                .to(device),
            labels: Tensor::from_slice(&labels).to(device),
        }
    }

    pub fn size(&self) -> usize {
        self.valid_length.len()
    }
}

/// # Synchronous batch iterator over a dataset
/// Batches are produced on the calling thread, in corpus order unless shuffled.
/// The last batch may be smaller than `batch_size`.
pub struct DataLoader<'a> {
    dataset: &'a SentimentDataset,
    batch_size: usize,
    order: Vec<usize>,
    device: Device,
}

impl<'a> DataLoader<'a> {
    /// Creates a loader visiting the dataset in corpus order.
    pub fn new(
        dataset: &'a SentimentDataset,
        batch_size: usize,
        device: Device,
    ) -> Result<DataLoader<'a>, KoBertError> {
        if batch_size == 0 {
            return Err(KoBertError::InvalidConfigurationError(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(DataLoader {
            dataset,
            batch_size,
            order: (0..dataset.len()).collect(),
            device,
        })
    }

    /// Creates a loader visiting the dataset in a random order drawn from the torch
    /// generator (reproducible after `tch::manual_seed`).
    pub fn shuffled(
        dataset: &'a SentimentDataset,
        batch_size: usize,
        device: Device,
    ) -> Result<DataLoader<'a>, KoBertError> {
        let mut loader = DataLoader::new(dataset, batch_size, device)?;
        let permutation = Tensor::randperm(dataset.len() as i64, (Kind::Int64, Device::Cpu));
        loader.order = Vec::<i64>::try_from(&permutation)?
            .into_iter()
            .map(|index| index as usize)
            .collect();
        Ok(loader)
    }

    pub fn num_batches(&self) -> usize {
        (self.dataset.len() + self.batch_size - 1) / self.batch_size
    }

    pub fn iter(&self) -> impl Iterator<Item = Batch> + '_ {
        self.order.chunks(self.batch_size).map(move |indices| {
            let examples = indices
                .iter()
                .filter_map(|index| self.dataset.get(*index))
                .collect::<Vec<&EncodedExample>>();
            Batch::from_examples(&examples, self.dataset.max_len(), self.device)
        })
    }
}
