//! Nearest-centroid classifier over labelled reference spectra.
//!
//! Stands in for the trained model: each reference row is a centroid, the
//! color label narrows the candidates, and the closest spectrum wins.

use pfvs_traits::{ColorLabel, MaterialClassifier, MaterialLabel, SPECTRAL_CHANNELS};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("no reference spectra loaded")]
    NoReferences,
    #[error("expected {SPECTRAL_CHANNELS} channels, got {0}")]
    Shape(usize),
    #[error("non-finite feature at channel {0}")]
    NonFinite(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSpectrum {
    pub material: String,
    pub color: ColorLabel,
    pub channels: [f32; SPECTRAL_CHANNELS],
}

#[derive(Debug, Clone, Default)]
pub struct NearestCentroid {
    references: Vec<ReferenceSpectrum>,
}

impl NearestCentroid {
    pub fn new(references: Vec<ReferenceSpectrum>) -> Self {
        Self { references }
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    fn nearest(
        &self,
        channels: &[f32],
        color: ColorLabel,
    ) -> Result<&ReferenceSpectrum, ClassifierError> {
        if channels.len() != SPECTRAL_CHANNELS {
            return Err(ClassifierError::Shape(channels.len()));
        }
        if let Some(i) = channels.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFinite(i));
        }
        // Prefer references of the observed color; fall back to all of them.
        closest(channels, self.references.iter().filter(|r| r.color == color))
            .or_else(|| closest(channels, self.references.iter()))
            .ok_or(ClassifierError::NoReferences)
    }
}

fn distance_sq(a: &[f32], b: &[f32; SPECTRAL_CHANNELS]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn closest<'a>(
    channels: &[f32],
    candidates: impl Iterator<Item = &'a ReferenceSpectrum>,
) -> Option<&'a ReferenceSpectrum> {
    candidates.min_by(|a, b| {
        distance_sq(channels, &a.channels).total_cmp(&distance_sq(channels, &b.channels))
    })
}

impl MaterialClassifier for NearestCentroid {
    fn predict(
        &self,
        channels: &[f32],
        color: ColorLabel,
    ) -> Result<MaterialLabel, Box<dyn std::error::Error + Send + Sync>> {
        let best = self.nearest(channels, color)?;
        tracing::trace!(material = %best.material, color = %color, "nearest reference");
        Ok(MaterialLabel::new(best.material.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(material: &str, color: ColorLabel, level: f32) -> ReferenceSpectrum {
        ReferenceSpectrum {
            material: material.into(),
            color,
            channels: [level; SPECTRAL_CHANNELS],
        }
    }

    #[test]
    fn prefers_matching_color() {
        let c = NearestCentroid::new(vec![
            reference("PLA", ColorLabel::R, 100.0),
            reference("PETG", ColorLabel::B, 100.0),
        ]);
        let label = c.predict(&[100.0; SPECTRAL_CHANNELS], ColorLabel::B).unwrap();
        assert_eq!(label.as_str(), "PETG");
    }

    #[test]
    fn falls_back_to_all_references() {
        let c = NearestCentroid::new(vec![
            reference("PLA", ColorLabel::R, 100.0),
            reference("ASA", ColorLabel::K, 10.0),
        ]);
        let label = c.predict(&[12.0; SPECTRAL_CHANNELS], ColorLabel::Unknown).unwrap();
        assert_eq!(label.as_str(), "ASA");
    }

    #[test]
    fn empty_model_is_an_error() {
        let c = NearestCentroid::default();
        let err = c.predict(&[0.0; SPECTRAL_CHANNELS], ColorLabel::R).unwrap_err();
        assert!(err.to_string().contains("no reference spectra"));
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let c = NearestCentroid::new(vec![reference("PLA", ColorLabel::R, 1.0)]);
        assert!(c.predict(&[0.0; 4], ColorLabel::R).is_err());
    }
}
