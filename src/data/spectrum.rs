use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One measured point of a QENS spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Energy transfer (meV)
    pub energy: f64,
    /// Scattered intensity
    pub intensity: f64,
    /// Measured error on the intensity
    pub error: f64,
}

impl Sample {
    pub fn new(energy: f64, intensity: f64, error: f64) -> Self {
        Self {
            energy,
            intensity,
            error,
        }
    }
}

/// Momentum-transfer key of a spectrum.
///
/// The text is kept verbatim (it is what the user sees in the selector and
/// what ends up in the export), while ordering and equality go through the
/// parsed numeric value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QValue {
    text: String,
    value: f64,
}

impl QValue {
    /// Parse a Q label. Returns `None` if the text is not a finite number.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let value: f64 = trimmed.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(Self {
            text: trimmed.to_string(),
            value,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for QValue {
    fn eq(&self, other: &Self) -> bool {
        self.value.total_cmp(&other.value) == Ordering::Equal
    }
}

impl Eq for QValue {}

impl PartialOrd for QValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.total_cmp(&other.value)
    }
}

impl std::fmt::Display for QValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// All samples measured at one Q
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spectrum {
    pub q: QValue,
    /// Column label of the intensity column, used as the plot legend
    pub label: String,
    /// Samples in file order (energy ascending is assumed, never enforced)
    pub samples: Vec<Sample>,
}

impl Spectrum {
    /// (first energy, last energy), the default bounds of a fresh region
    pub fn energy_span(&self) -> Option<(f64, f64)> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        Some((first.energy, last.energy))
    }

    /// Largest intensity + error, for plot auto-scaling
    pub fn max_intensity(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.intensity + s.error.abs())
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// The validated dataset: one spectrum per Q, in the order they were loaded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpectrumTable {
    /// Where the data came from (file path or free text)
    pub source: String,
    spectra: Vec<Spectrum>,
}

impl SpectrumTable {
    /// Build a table. Q keys are expected to be unique; the loader checks it.
    pub fn new(source: &str, spectra: Vec<Spectrum>) -> Self {
        Self {
            source: source.to_string(),
            spectra,
        }
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    pub fn spectra(&self) -> &[Spectrum] {
        &self.spectra
    }

    /// Spectrum at a position in load order
    pub fn get(&self, index: usize) -> Option<&Spectrum> {
        self.spectra.get(index)
    }

    /// Look a spectrum up by the verbatim Q text
    pub fn find(&self, q: &str) -> Option<&Spectrum> {
        self.spectra.iter().find(|s| s.q.as_str() == q)
    }

    pub fn index_of(&self, q: &str) -> Option<usize> {
        self.spectra.iter().position(|s| s.q.as_str() == q)
    }

    /// Q texts in load order (what the selector lists)
    pub fn q_labels(&self) -> Vec<String> {
        self.spectra.iter().map(|s| s.q.as_str().to_string()).collect()
    }

    /// Load-order indices sorted by ascending numeric Q
    pub fn ascending_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.spectra.len()).collect();
        order.sort_by(|&a, &b| self.spectra[a].q.cmp(&self.spectra[b].q));
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum(q: &str, energies: &[f64]) -> Spectrum {
        Spectrum {
            q: QValue::parse(q).unwrap(),
            label: format!("S_{}", q),
            samples: energies.iter().map(|&e| Sample::new(e, 1.0, 0.1)).collect(),
        }
    }

    #[test]
    fn test_q_value_orders_numerically() {
        let a = QValue::parse("0.5").unwrap();
        let b = QValue::parse("0.50").unwrap();
        let c = QValue::parse("10.2").unwrap();
        let d = QValue::parse("9.8").unwrap();
        assert_eq!(a, b);
        assert_eq!(b.as_str(), "0.50");
        // "10.2" < "9.8" as text, but not as numbers
        assert!(d < c);
    }

    #[test]
    fn test_q_value_rejects_garbage() {
        assert!(QValue::parse("abc").is_none());
        assert!(QValue::parse("").is_none());
        assert!(QValue::parse("inf").is_none());
    }

    #[test]
    fn test_ascending_order_follows_numeric_q() {
        let table = SpectrumTable::new(
            "mem",
            vec![
                spectrum("1.2", &[0.0]),
                spectrum("0.5", &[0.0]),
                spectrum("10.0", &[0.0]),
                spectrum("0.8", &[0.0]),
            ],
        );
        assert_eq!(table.ascending_order(), vec![1, 3, 0, 2]);
        assert_eq!(table.q_labels(), vec!["1.2", "0.5", "10.0", "0.8"]);
        assert_eq!(table.index_of("0.8"), Some(3));
        assert!(table.find("0.80").is_none());
    }

    #[test]
    fn test_energy_span() {
        let s = spectrum("0.5", &[-2.0, -1.0, 0.0, 1.5]);
        assert_eq!(s.energy_span(), Some((-2.0, 1.5)));
        let empty = spectrum("0.5", &[]);
        assert_eq!(empty.energy_span(), None);
    }
}
