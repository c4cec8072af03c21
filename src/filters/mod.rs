//! Roll smoothing filters.
//!
//! Landmark-derived roll angles jitter by a few degrees from frame to frame.
//! These filters optionally smooth the angle before it is classified.

/// Moving average filter for simple smoothing
pub mod moving_average;

/// Median filter for outlier rejection
pub mod median;

/// Exponential filter for responsive smoothing
pub mod exponential;

use crate::{
    constants::{DEFAULT_EXPONENTIAL_ALPHA, DEFAULT_MEDIAN_WINDOW, DEFAULT_MOVING_AVERAGE_WINDOW},
    Error, Result,
};

/// Trait for scalar angle filters
pub trait RollFilter: Send {
    /// Feed one sample, returning the filtered value
    fn apply(&mut self, value: f64) -> f64;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes values through unchanged
pub struct NoFilter;

impl RollFilter for NoFilter {
    fn apply(&mut self, value: f64) -> f64 {
        value
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create a roll filter from a spec such as `median`, `median:3` or `exponential:0.3`
pub fn create_filter(spec: &str) -> Result<Box<dyn RollFilter>> {
    let spec = spec.trim().to_lowercase();
    let (name, param) = match spec.split_once(':') {
        Some((name, param)) => (name, Some(param)),
        None => (spec.as_str(), None),
    };

    match name {
        "none" | "nofilter" => Ok(Box::new(NoFilter)),
        "moving_average" | "movingaverage" => {
            let window = parse_window(param, DEFAULT_MOVING_AVERAGE_WINDOW)?;
            Ok(Box::new(moving_average::MovingAverageFilter::new(window)))
        }
        "median" => {
            let window = parse_window(param, DEFAULT_MEDIAN_WINDOW)?;
            Ok(Box::new(median::MedianFilter::new(window)))
        }
        "exponential" => {
            let alpha = match param {
                Some(raw) => raw
                    .parse::<f64>()
                    .map_err(|_| Error::FilterError(format!("Alpha is not a number: {raw}")))?,
                None => DEFAULT_EXPONENTIAL_ALPHA,
            };
            Ok(Box::new(exponential::ExponentialFilter::new(alpha)?))
        }
        _ => Err(Error::FilterError(format!("Unknown filter type: {spec}"))),
    }
}

fn parse_window(param: Option<&str>, default: usize) -> Result<usize> {
    let window = match param {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| Error::FilterError(format!("Window size is not an integer: {raw}")))?,
        None => default,
    };

    if window == 0 {
        return Err(Error::FilterError("Window size must be greater than 0".to_string()));
    }
    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter() {
        let mut filter = NoFilter;
        assert_eq!(filter.apply(17.5), 17.5);
    }

    #[test]
    fn test_create_filter() {
        assert_eq!(create_filter("none").unwrap().name(), "NoFilter");
        assert_eq!(create_filter("median:3").unwrap().name(), "MedianFilter");
        assert_eq!(create_filter("Moving_Average").unwrap().name(), "MovingAverageFilter");
        assert_eq!(create_filter("exponential:0.3").unwrap().name(), "ExponentialFilter");
        assert!(create_filter("kalman").is_err());
    }

    #[test]
    fn test_create_filter_rejects_bad_parameters() {
        match create_filter("median:0") {
            Err(Error::FilterError(msg)) => assert!(msg.contains("Window size")),
            _ => panic!("Expected FilterError"),
        }
        match create_filter("exponential:1.5") {
            Err(Error::FilterError(msg)) => assert!(msg.contains("Alpha")),
            _ => panic!("Expected FilterError"),
        }
        assert!(create_filter("moving_average:abc").is_err());
    }
}
