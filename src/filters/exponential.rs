use super::RollFilter;
use crate::{
    constants::{EXPONENTIAL_ALPHA_MAX, EXPONENTIAL_ALPHA_MIN},
    Error, Result,
};

/// Exponential smoothing filter
pub struct ExponentialFilter {
    alpha: f64,
    last: Option<f64>,
}

impl ExponentialFilter {
    /// Create a filter with smoothing factor `alpha` in (0, 1]
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > EXPONENTIAL_ALPHA_MIN && alpha <= EXPONENTIAL_ALPHA_MAX) {
            return Err(Error::FilterError(format!("Alpha must be in (0, 1], got {alpha}")));
        }
        Ok(Self { alpha, last: None })
    }
}

impl RollFilter for ExponentialFilter {
    fn apply(&mut self, value: f64) -> f64 {
        let filtered = match self.last {
            Some(last) => self.alpha * value + (1.0 - self.alpha) * last,
            None => value,
        };
        self.last = Some(filtered);
        filtered
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_filter() {
        let mut filter = ExponentialFilter::new(0.5).unwrap();

        // First value passes through
        assert_eq!(filter.apply(10.0), 10.0);

        // Second value is smoothed
        assert_eq!(filter.apply(20.0), 15.0); // 0.5 * 20 + 0.5 * 10
    }

    #[test]
    fn test_alpha_bounds() {
        let mut fast = ExponentialFilter::new(0.9).unwrap();
        fast.apply(10.0);
        assert!((fast.apply(20.0) - 19.0).abs() < 0.001);

        assert!(ExponentialFilter::new(0.0).is_err());
        assert!(ExponentialFilter::new(1.01).is_err());
    }
}
