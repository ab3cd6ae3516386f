//! The quantized network's weight layout and binary (de)serialization.

use crate::consts::N_FEATURES;
use crate::error::CorvidError;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Dynamic hidden-layer width: the embedded default network and any
/// `EvalFile`-loaded network share this layout, but a custom net can use a
/// different width, so it is carried at runtime rather than fixed to the
/// embedded default's `consts::N_HIDDEN`.
#[derive(Clone)]
pub struct Network {
    pub n_hidden: usize,
    pub input_weights: Arc<[i16]>,
    pub input_biases: Arc<[i16]>,
    pub output_weights: Arc<[i16]>,
    pub output_bias: i32,
}

static DEFAULT_NET_BYTES: &[u8] = include_bytes!("../../../net/default.nnue");

impl Network {
    pub fn default_embedded() -> Network {
        Network::from_bytes(DEFAULT_NET_BYTES, crate::consts::N_HIDDEN)
            .expect("embedded default network must parse")
    }

    pub fn load_file(path: &Path) -> Result<Network, CorvidError> {
        let bytes = fs::read(path).map_err(|e| CorvidError::NetworkLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let n_hidden = infer_hidden_width(bytes.len()).ok_or_else(|| CorvidError::NetworkLoad {
            path: path.display().to_string(),
            reason: format!("file size {} does not match any valid network layout", bytes.len()),
        })?;
        Network::from_bytes(&bytes, n_hidden).map_err(|e| CorvidError::NetworkLoad {
            path: path.display().to_string(),
            reason: e,
        })
    }

    fn from_bytes(bytes: &[u8], n_hidden: usize) -> Result<Network, String> {
        let expected = layout_size(n_hidden);
        if bytes.len() != expected {
            return Err(format!(
                "expected {expected} bytes for N_HIDDEN={n_hidden}, got {}",
                bytes.len()
            ));
        }
        let mut cursor = 0usize;
        let input_weights = read_i16_slice(bytes, &mut cursor, N_FEATURES * n_hidden);
        let input_biases = read_i16_slice(bytes, &mut cursor, n_hidden);
        let output_weights = read_i16_slice(bytes, &mut cursor, 2 * n_hidden);
        let output_bias = i32::from_le_bytes(bytes[cursor..cursor + 4].try_into().unwrap());
        Ok(Network {
            n_hidden,
            input_weights: input_weights.into(),
            input_biases: input_biases.into(),
            output_weights: output_weights.into(),
            output_bias,
        })
    }
}

fn layout_size(n_hidden: usize) -> usize {
    2 * (N_FEATURES * n_hidden) + 2 * n_hidden + 2 * (2 * n_hidden) + 4
}

/// Finds an `n_hidden` in a plausible range whose layout size matches the
/// file on disk; `EvalFile` nets are not required to match the embedded
/// default's width.
fn infer_hidden_width(byte_len: usize) -> Option<usize> {
    (1..=2048).find(|&h| layout_size(h) == byte_len)
}

fn read_i16_slice(bytes: &[u8], cursor: &mut usize, count: usize) -> Vec<i16> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let v = i16::from_le_bytes(bytes[*cursor..*cursor + 2].try_into().unwrap());
        out.push(v);
        *cursor += 2;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_loads() {
        let net = Network::default_embedded();
        assert_eq!(net.n_hidden, crate::consts::N_HIDDEN);
        assert_eq!(net.input_weights.len(), N_FEATURES * net.n_hidden);
        assert_eq!(net.output_weights.len(), 2 * net.n_hidden);
    }
}
