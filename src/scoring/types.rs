use super::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq)]
/// Homogeneity, completeness and V-measure of one clustering against a reference.
pub struct VScores {
    /// Each predicted cluster holds lines of a single reference cluster.
    pub homogeneity: f64,
    /// Each reference cluster lies within a single predicted cluster.
    pub completeness: f64,
    /// Harmonic mean of the two.
    pub v_measure: f64,
}

impl VScores {
    pub const PERFECT: VScores = VScores {
        homogeneity: 1.0,
        completeness: 1.0,
        v_measure: 1.0,
    };

    /// Combines homogeneity and completeness into a full score tuple.
    pub fn from_parts(homogeneity: f64, completeness: f64) -> Self {
        let v_measure = if homogeneity + completeness <= 0.0 {
            0.0
        } else {
            2.0 * homogeneity * completeness / (homogeneity + completeness)
        };

        Self {
            homogeneity,
            completeness,
            v_measure,
        }
    }
}

/// Formats scores as percentages: `[H/C/V 100.00 50.00 66.67]`.
pub fn format_v_scores(scores: &VScores) -> String {
    format!(
        "[H/C/V {:.2} {:.2} {:.2}]",
        100.0 * scores.homogeneity,
        100.0 * scores.completeness,
        100.0 * scores.v_measure
    )
}

impl std::fmt::Display for VScores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_v_scores(self))
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Scores of one ground-truth page that had a matching hypothesis.
pub struct PageScore {
    /// File name shared by the hypothesis and ground-truth files.
    pub name: String,
    pub scores: VScores,
}

/// Running per-score sums over matched pages plus a count of unmatched ones.
///
/// Unmatched pages are counted but never enter the sums.
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    sums: [f64; 3],
    nb_found: usize,
    nb_not_found: usize,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, scores: &VScores) {
        self.sums[0] += scores.homogeneity;
        self.sums[1] += scores.completeness;
        self.sums[2] += scores.v_measure;
        self.nb_found += 1;
    }

    pub fn add_not_found(&mut self) {
        self.nb_not_found += 1;
    }

    pub fn nb_found(&self) -> usize {
        self.nb_found
    }

    pub fn nb_not_found(&self) -> usize {
        self.nb_not_found
    }

    /// Fraction of reference pages that had no hypothesis, in `[0, 1]`.
    pub fn not_found_fraction(&self) -> f64 {
        let total = self.nb_found + self.nb_not_found;
        if total == 0 {
            0.0
        } else {
            self.nb_not_found as f64 / total as f64
        }
    }

    /// Averages each score independently over the matched pages.
    ///
    /// Fails with [`ScoringError::EmptyCorpus`] when no page was matched.
    pub fn average(&self) -> Result<VScores, ScoringError> {
        if self.nb_found == 0 {
            return Err(ScoringError::EmptyCorpus {
                not_found: self.nb_not_found,
            });
        }

        let n = self.nb_found as f64;
        Ok(VScores {
            homogeneity: self.sums[0] / n,
            completeness: self.sums[1] / n,
            v_measure: self.sums[2] / n,
        })
    }
}

#[derive(Debug, Clone)]
/// Outcome of scoring a directory of pages.
pub struct CorpusReport {
    /// Per-page scores, in visiting order.
    pub pages: Vec<PageScore>,
    /// Ground-truth file names without a hypothesis counterpart.
    pub not_found: Vec<String>,
    /// Scores averaged over `pages`.
    pub average: VScores,
}

impl CorpusReport {
    pub fn nb_found(&self) -> usize {
        self.pages.len()
    }

    pub fn nb_not_found(&self) -> usize {
        self.not_found.len()
    }

    /// Returns `true` if some reference pages were not matched.
    pub fn is_partial(&self) -> bool {
        !self.not_found.is_empty()
    }

    pub fn not_found_fraction(&self) -> f64 {
        let total = self.nb_found() + self.nb_not_found();
        if total == 0 {
            0.0
        } else {
            self.nb_not_found() as f64 / total as f64
        }
    }
}
