// src/collab/image.rs

use anyhow::{Result, bail};

use crate::collab::{ImageTransformer, TransformParams};

/// Byte-level stand-in for an image pipeline: the payload is treated as a
/// single row of 8-bit samples.
///
/// - `Blur` replaces each sample with the mean of its `radius` neighbourhood.
/// - `ColorFilter` multiplies every sample by `scale`, saturating at 0..=255.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawImageTransformer;

impl ImageTransformer for RawImageTransformer {
    fn transform(&self, bytes: &[u8], params: TransformParams) -> Result<Vec<u8>> {
        if bytes.is_empty() {
            bail!("cannot transform an empty image");
        }
        match params {
            TransformParams::Blur { radius } => Ok(box_blur(bytes, radius)),
            TransformParams::ColorFilter { scale } => {
                if !scale.is_finite() || scale < 0.0 {
                    bail!("invalid colour filter scale: {scale}");
                }
                Ok(bytes
                    .iter()
                    .map(|&b| (f64::from(b) * scale).round().clamp(0.0, 255.0) as u8)
                    .collect())
            }
        }
    }
}

fn box_blur(bytes: &[u8], radius: usize) -> Vec<u8> {
    if radius == 0 {
        return bytes.to_vec();
    }

    // Prefix sums keep this linear in the input length.
    let mut prefix = Vec::with_capacity(bytes.len() + 1);
    prefix.push(0u64);
    for &b in bytes {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + u64::from(b));
    }

    (0..bytes.len())
        .map(|i| {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(bytes.len());
            let sum = prefix[hi] - prefix[lo];
            (sum / (hi - lo) as u64) as u8
        })
        .collect()
}
