use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use thiserror::Error;

pub const DESCRIPTOR_LEN: usize = 128;
pub const DESCRIPTOR_BYTES: usize = DESCRIPTOR_LEN * 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Face descriptor is missing")]
    Missing,
    #[error("Face descriptor is not valid base64")]
    Encoding,
    #[error("Face descriptor must be {DESCRIPTOR_BYTES} bytes, got {0}")]
    Length(usize),
}

/// 128 little-endian `f32` values as produced by the browser face model.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDescriptor([f32; DESCRIPTOR_LEN]);

impl FaceDescriptor {
    pub fn from_base64(raw: &str) -> Result<Self, DescriptorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DescriptorError::Missing);
        }
        let bytes = BASE64_STANDARD
            .decode(raw)
            .map_err(|_| DescriptorError::Encoding)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if bytes.len() != DESCRIPTOR_BYTES {
            return Err(DescriptorError::Length(bytes.len()));
        }
        let mut values = [0f32; DESCRIPTOR_LEN];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Self(values))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    pub fn distance(&self, other: &FaceDescriptor) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| {
                let diff = f64::from(*a) - f64::from(*b);
                diff * diff
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// Closest candidate strictly under `threshold`, with its distance.
pub fn best_match<K>(
    probe: &FaceDescriptor,
    candidates: impl IntoIterator<Item = (K, FaceDescriptor)>,
    threshold: f64,
) -> Option<(K, f64)> {
    candidates
        .into_iter()
        .map(|(key, stored)| {
            let distance = probe.distance(&stored);
            (key, distance)
        })
        .filter(|(_, distance)| *distance < threshold)
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(fill: f32) -> FaceDescriptor {
        FaceDescriptor([fill; DESCRIPTOR_LEN])
    }

    #[test]
    fn decodes_little_endian_floats() {
        let mut bytes = vec![0u8; DESCRIPTOR_BYTES];
        bytes[..4].copy_from_slice(&1.5f32.to_le_bytes());
        let decoded = FaceDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.0[0], 1.5);
        assert_eq!(decoded.0[1], 0.0);
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(FaceDescriptor::from_base64("   "), Err(DescriptorError::Missing));
        assert_eq!(FaceDescriptor::from_base64("@@not base64@@"), Err(DescriptorError::Encoding));

        let short = BASE64_STANDARD.encode([0u8; 16]);
        assert_eq!(FaceDescriptor::from_base64(&short), Err(DescriptorError::Length(16)));
    }

    #[test]
    fn base64_input_accepted() {
        let encoded = BASE64_STANDARD.encode(descriptor(0.25).to_bytes());
        assert_eq!(FaceDescriptor::from_base64(&encoded).unwrap(), descriptor(0.25));
    }

    #[test]
    fn euclidean_distance() {
        let a = descriptor(0.0);
        let mut values = [0f32; DESCRIPTOR_LEN];
        values[0] = 3.0;
        values[1] = 4.0;
        assert!((a.distance(&FaceDescriptor(values)) - 5.0).abs() < 1e-9);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn closest_match_under_threshold_wins() {
        let probe = descriptor(0.0);
        let candidates = vec![
            ("far", descriptor(1.0)),
            ("near", descriptor(0.01)),
            ("nearer", descriptor(0.005)),
        ];
        let (who, distance) = best_match(&probe, candidates, 0.5).unwrap();
        assert_eq!(who, "nearer");
        assert!(distance < 0.5);
    }

    #[test]
    fn no_match_over_threshold() {
        let probe = descriptor(0.0);
        // sqrt(128 * 0.25) is well above 0.5
        assert!(best_match(&probe, vec![(1u64, descriptor(0.5))], 0.5).is_none());
    }
}
