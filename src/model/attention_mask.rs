use crate::common::error::KoBertError;
use tch::{Kind, Tensor};

/// Builds the attention mask of a batch from the valid length of each row.
///
/// # Arguments
///
/// * `token_ids` - token ids of shape (*batch size*, *sequence_length*)
/// * `valid_length` - number of non-padding tokens of each row
///
/// # Returns
///
/// * `Tensor` of shape (*batch size*, *sequence_length*) holding 1.0 for positions below the
///   row valid length and 0.0 elsewhere, on the device of `token_ids`
pub fn gen_attention_mask(token_ids: &Tensor, valid_length: &[i64]) -> Result<Tensor, KoBertError> {
    let (rows, sequence_length) = match token_ids.size().as_slice() {
        &[rows, sequence_length] => (rows, sequence_length),
        _ => {
            return Err(KoBertError::ValueError(
                "Invalid token ids dimension, must be 2".into(),
            ));
        }
    };
    if rows != valid_length.len() as i64 {
        return Err(KoBertError::ValueError(format!(
            "Got {} valid lengths for a batch of {} rows",
            valid_length.len(),
            rows
        )));
    }

    let device = token_ids.device();
    let lengths = Tensor::from_slice(valid_length).to(device).unsqueeze(1);
    let positions = Tensor::arange(sequence_length, (Kind::Int64, device)).unsqueeze(0);
    Ok(positions.lt_tensor(&lengths).to_kind(Kind::Float))
}
