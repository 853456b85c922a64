use std::fmt;

/// Confusion counts for binary predictions with the derived scores.
///
/// Undefined ratios (no predicted or no actual positives) are reported as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryReport {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl BinaryReport {
    pub fn from_predictions(predictions: &[bool], labels: &[bool]) -> Self {
        let mut report = Self::default();
        report.extend(predictions, labels);
        report
    }

    pub fn extend(&mut self, predictions: &[bool], labels: &[bool]) {
        debug_assert_eq!(predictions.len(), labels.len());
        for (&predicted, &actual) in predictions.iter().zip(labels) {
            match (predicted, actual) {
                (true, true) => self.true_positives += 1,
                (true, false) => self.false_positives += 1,
                (false, true) => self.false_negatives += 1,
                (false, false) => self.true_negatives += 1,
            }
        }
    }

    pub fn support(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    pub fn is_empty(&self) -> bool {
        self.support() == 0
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.support())
    }
}

impl fmt::Display for BinaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "precision {:.4} recall {:.4} f1 {:.4} accuracy {:.4} support {}",
            self.precision(),
            self.recall(),
            self.f1(),
            self.accuracy(),
            self.support()
        )
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
