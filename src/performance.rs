//! Detection accuracy and latency instrumentation.
//!
//! The recorder keeps two append-only logs: detections (with the dispatch
//! latency they incurred) and operator ground truth. Nothing is scored at
//! record time; [`PerformanceRecorder::summarize`] matches the two logs per
//! condition, so an annotation typed shortly after the gesture still counts.
//!
//! Matching rules:
//! - a detection and a ground-truth entry match only when they share the
//!   condition label and lie within the tolerance of each other;
//! - each ground-truth entry validates at most one detection;
//! - same-kind entries are matched first, nearest in time wins;
//! - a detection left over is `Misclassified` if an unused entry of another
//!   kind is within tolerance, otherwise a `FalsePositive`;
//! - a condition without any ground truth leaves its detections `Unscored`.

use crate::{gesture::GestureKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Environmental condition label attached to samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Optimal,
    LowLight,
    Backlit,
    Artificial,
    Natural,
}

impl Condition {
    /// The closed set of labels, in report order
    pub const ALL: [Self; 5] = [
        Self::Optimal,
        Self::LowLight,
        Self::Backlit,
        Self::Artificial,
        Self::Natural,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::LowLight => "low_light",
            Self::Backlit => "backlit",
            Self::Artificial => "artificial",
            Self::Natural => "natural",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|condition| condition.as_str() == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown condition: {s}")))
    }
}

/// One detected gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSample {
    pub gesture: GestureKind,
    /// Dispatch latency
    pub latency: Duration,
    pub condition: Condition,
    /// Session time of the detection
    pub timestamp: Duration,
}

/// One operator assertion of the intended gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundTruthEntry {
    pub gesture: GestureKind,
    pub timestamp: Duration,
    pub condition: Condition,
}

/// Verdict for one detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Matched a ground-truth entry of the same kind
    Correct,
    /// Matched a ground-truth entry of another kind
    Misclassified,
    /// No ground-truth entry nearby
    FalsePositive,
    /// No ground truth recorded for the condition
    Unscored,
}

/// Counters and latency range for a set of detections
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SummaryStats {
    pub detections: usize,
    pub correct: usize,
    pub misclassified: usize,
    pub false_positives: usize,
    pub unscored: usize,
    /// Ground-truth entries no detection claimed
    pub missed: usize,
    pub min_latency: Duration,
    pub max_latency: Duration,
    total_latency: Duration,
}

impl SummaryStats {
    fn add(&mut self, outcome: Outcome, latency: Duration) {
        if self.detections == 0 {
            self.min_latency = latency;
            self.max_latency = latency;
        } else {
            self.min_latency = self.min_latency.min(latency);
            self.max_latency = self.max_latency.max(latency);
        }
        self.detections += 1;
        self.total_latency += latency;

        match outcome {
            Outcome::Correct => self.correct += 1,
            Outcome::Misclassified => self.misclassified += 1,
            Outcome::FalsePositive => self.false_positives += 1,
            Outcome::Unscored => self.unscored += 1,
        }
    }

    /// Detections that received a verdict
    #[must_use]
    pub const fn scored(&self) -> usize {
        self.correct + self.misclassified + self.false_positives
    }

    /// Correct share of scored detections, in percent
    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        percent(self.correct, self.scored())
    }

    /// False-positive share of scored detections, in percent
    #[must_use]
    pub fn false_positive_rate_percent(&self) -> f64 {
        percent(self.false_positives, self.scored())
    }

    #[must_use]
    pub fn mean_latency(&self) -> Duration {
        match u32::try_from(self.detections) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total_latency / n,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Statistics for one gesture kind under one condition
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSummary {
    pub gesture: GestureKind,
    pub stats: SummaryStats,
}

/// Statistics for one condition
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionSummary {
    pub condition: Condition,
    /// Ground-truth entries recorded under this condition
    pub ground_truth: usize,
    pub stats: SummaryStats,
    /// One entry per gesture kind, in [`GestureKind::ALL`] order
    pub gestures: Vec<GestureSummary>,
}

impl ConditionSummary {
    /// Statistics of one gesture kind
    #[must_use]
    pub fn gesture(&self, gesture: GestureKind) -> Option<&GestureSummary> {
        self.gestures.iter().find(|summary| summary.gesture == gesture)
    }
}

/// Human-readable accuracy report over every condition
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub tolerance: Duration,
    /// One entry per condition, in [`Condition::ALL`] order
    pub conditions: Vec<ConditionSummary>,
}

impl PerformanceReport {
    /// Summary of one condition
    #[must_use]
    pub fn condition(&self, condition: Condition) -> Option<&ConditionSummary> {
        self.conditions.iter().find(|summary| summary.condition == condition)
    }

    /// Detections across all conditions
    #[must_use]
    pub fn total_detections(&self) -> usize {
        self.conditions.iter().map(|summary| summary.stats.detections).sum()
    }
}

fn time_between(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}

fn millis(latency: Duration) -> f64 {
    latency.as_secs_f64() * 1000.0
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} detections, accuracy {:.1}%, false positives {:.1}%, latency {:.3}-{:.3} ms (mean {:.3} ms)",
            self.detections,
            self.accuracy_percent(),
            self.false_positive_rate_percent(),
            millis(self.min_latency),
            millis(self.max_latency),
            millis(self.mean_latency()),
        )?;
        if self.unscored > 0 {
            write!(f, ", {} unscored", self.unscored)?;
        }
        if self.missed > 0 {
            write!(f, ", {} missed", self.missed)?;
        }
        Ok(())
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Performance report (ground truth tolerance {:.2} s)",
            self.tolerance.as_secs_f64()
        )?;
        for summary in &self.conditions {
            writeln!(
                f,
                "  {:<11} {} [{} ground truth]",
                summary.condition.as_str(),
                summary.stats,
                summary.ground_truth
            )?;
            for gesture in &summary.gestures {
                if gesture.stats.detections > 0 || gesture.stats.missed > 0 {
                    writeln!(f, "    {:<12} {}", gesture.gesture.as_str(), gesture.stats)?;
                }
            }
        }
        Ok(())
    }
}

/// Append-only log of detections and ground truth
#[derive(Debug, Clone)]
pub struct PerformanceRecorder {
    tolerance: Duration,
    samples: Vec<PerformanceSample>,
    ground_truth: Vec<GroundTruthEntry>,
}

impl PerformanceRecorder {
    /// Create a recorder matching within `tolerance`
    #[must_use]
    pub const fn new(tolerance: Duration) -> Self {
        Self {
            tolerance,
            samples: Vec::new(),
            ground_truth: Vec::new(),
        }
    }

    /// Log a detection
    pub fn record(&mut self, gesture: GestureKind, latency: Duration, condition: Condition, timestamp: Duration) {
        self.samples.push(PerformanceSample {
            gesture,
            latency,
            condition,
            timestamp,
        });
    }

    /// Log the gesture the operator actually performed
    pub fn annotate_ground_truth(&mut self, gesture: GestureKind, condition: Condition, timestamp: Duration) {
        log::info!("Ground truth {} at {:.2}s ({})", gesture, timestamp.as_secs_f64(), condition);
        self.ground_truth.push(GroundTruthEntry {
            gesture,
            timestamp,
            condition,
        });
    }

    #[must_use]
    pub fn samples(&self) -> &[PerformanceSample] {
        &self.samples
    }

    #[must_use]
    pub fn ground_truth(&self) -> &[GroundTruthEntry] {
        &self.ground_truth
    }

    /// Verdict for every sample, in recording order
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        let mut outcomes = vec![Outcome::Unscored; self.samples.len()];
        for condition in Condition::ALL {
            for (index, outcome, _) in self.score_condition(condition).0 {
                outcomes[index] = outcome;
            }
        }
        outcomes
    }

    /// Report over every condition
    #[must_use]
    pub fn summarize(&self) -> PerformanceReport {
        PerformanceReport {
            tolerance: self.tolerance,
            conditions: Condition::ALL
                .into_iter()
                .map(|condition| self.summarize_condition(condition))
                .collect(),
        }
    }

    /// Report for one condition; all zeros when nothing was recorded
    #[must_use]
    pub fn summarize_condition(&self, condition: Condition) -> ConditionSummary {
        let (verdicts, unmatched) = self.score_condition(condition);

        let mut stats = SummaryStats::default();
        let mut gestures: Vec<GestureSummary> = GestureKind::ALL
            .into_iter()
            .map(|gesture| GestureSummary {
                gesture,
                stats: SummaryStats::default(),
            })
            .collect();

        for (index, outcome, latency) in verdicts {
            stats.add(outcome, latency);
            let gesture = self.samples[index].gesture;
            if let Some(summary) = gestures.iter_mut().find(|summary| summary.gesture == gesture) {
                summary.stats.add(outcome, latency);
            }
        }

        for entry in unmatched {
            stats.missed += 1;
            if let Some(summary) = gestures.iter_mut().find(|summary| summary.gesture == entry.gesture) {
                summary.stats.missed += 1;
            }
        }

        ConditionSummary {
            condition,
            ground_truth: self.ground_truth.iter().filter(|entry| entry.condition == condition).count(),
            stats,
            gestures,
        }
    }

    /// Match the samples of one condition; returns (sample index, outcome, latency)
    /// per sample plus the ground-truth entries nothing claimed
    fn score_condition(&self, condition: Condition) -> (Vec<(usize, Outcome, Duration)>, Vec<GroundTruthEntry>) {
        let mut samples: Vec<(usize, &PerformanceSample)> = self
            .samples
            .iter()
            .enumerate()
            .filter(|(_, sample)| sample.condition == condition)
            .collect();
        samples.sort_by_key(|(index, sample)| (sample.timestamp, *index));

        let truth: Vec<&GroundTruthEntry> =
            self.ground_truth.iter().filter(|entry| entry.condition == condition).collect();

        if truth.is_empty() {
            let verdicts = samples
                .into_iter()
                .map(|(index, sample)| (index, Outcome::Unscored, sample.latency))
                .collect();
            return (verdicts, Vec::new());
        }

        let mut claimed = vec![false; truth.len()];
        let mut verdicts: Vec<Option<Outcome>> = vec![None; samples.len()];

        // Same-kind pass first so a stray detection cannot take an entry a correct one needs
        for (slot, (_, sample)) in samples.iter().enumerate() {
            if let Some(found) = self.nearest_unclaimed(sample, &truth, &claimed, true) {
                claimed[found] = true;
                verdicts[slot] = Some(Outcome::Correct);
            }
        }

        for (slot, (_, sample)) in samples.iter().enumerate() {
            if verdicts[slot].is_some() {
                continue;
            }
            verdicts[slot] = Some(match self.nearest_unclaimed(sample, &truth, &claimed, false) {
                Some(found) => {
                    claimed[found] = true;
                    Outcome::Misclassified
                }
                None => Outcome::FalsePositive,
            });
        }

        let scored = samples
            .iter()
            .zip(verdicts)
            .map(|((index, sample), verdict)| (*index, verdict.unwrap_or(Outcome::FalsePositive), sample.latency))
            .collect();

        let unmatched = truth
            .iter()
            .zip(&claimed)
            .filter(|(_, used)| !**used)
            .map(|(entry, _)| **entry)
            .collect();

        (scored, unmatched)
    }

    fn nearest_unclaimed(
        &self,
        sample: &PerformanceSample,
        truth: &[&GroundTruthEntry],
        claimed: &[bool],
        same_kind: bool,
    ) -> Option<usize> {
        truth
            .iter()
            .enumerate()
            .filter(|(i, entry)| !claimed[*i] && (!same_kind || entry.gesture == sample.gesture))
            .map(|(i, entry)| (i, time_between(entry.timestamp, sample.timestamp)))
            .filter(|(_, distance)| *distance <= self.tolerance)
            .min_by_key(|(_, distance)| *distance)
            .map(|(i, _)| i)
    }
}

impl Default for PerformanceRecorder {
    fn default() -> Self {
        Self::new(Duration::from_secs_f64(crate::constants::DEFAULT_GROUND_TRUTH_TOLERANCE_SECS))
    }
}
