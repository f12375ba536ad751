use anyhow::{Result, anyhow};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Encode one text padded/truncated to exactly `max_len` tokens.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, pad_id: u32, device: &Device) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    if ids.len() > max_len { ids.truncate(max_len); mask.truncate(max_len); }
    if ids.len() < max_len { let pad = max_len - ids.len(); ids.extend(std::iter::repeat(pad_id).take(pad)); mask.extend(std::iter::repeat(0).take(pad)); }
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, max_len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, max_len))?;
    Ok((input_ids, attention_mask))
}

/// Encode a (query, passage) pair for a cross-encoder.
///
/// Truncation is whatever the tokenizer was configured with. Returns
/// `(input_ids, token_type_ids, attention_mask)`, each shaped `[1, T]`.
pub fn tokenize_pair_on_device(tokenizer: &Tokenizer, query: &str, passage: &str, device: &Device) -> Result<(Tensor, Tensor, Tensor)> {
    let enc = tokenizer.encode((query, passage), true).map_err(|e| anyhow!("Pair tokenization failed: {}", e))?;
    let input_ids = Tensor::new(enc.get_ids(), device)?.unsqueeze(0)?;
    let token_type_ids = Tensor::new(enc.get_type_ids(), device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(enc.get_attention_mask(), device)?.unsqueeze(0)?;
    Ok((input_ids, token_type_ids, attention_mask))
}
