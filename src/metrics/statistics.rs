use ndarray::ArrayView1;

/// Summary of a collection of values
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl Statistics {
    /// Compute statistics from a slice of values; NaN entries are skipped
    pub fn from_slice(values: &[f64]) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if finite.is_empty() {
            return Statistics {
                mean: 0.0,
                std: 0.0,
                min: 0.0,
                max: 0.0,
                count: 0,
            };
        }

        let count = finite.len();
        let mean = finite.iter().sum::<f64>() / count as f64;
        let variance = finite.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / count as f64;

        Statistics {
            mean,
            std: variance.sqrt(),
            min: finite.iter().copied().fold(f64::INFINITY, f64::min),
            max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            count,
        }
    }

    pub fn from_array(array: ArrayView1<f64>) -> Self {
        let values: Vec<f64> = array.iter().copied().collect();
        Self::from_slice(&values)
    }
}

/// Largest absolute element-wise difference of two equally long vectors
pub fn max_abs_difference(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
