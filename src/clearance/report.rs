//! Verification report aggregation
//!
//! Pure aggregation over ClearancePair results: counts, tightest margins,
//! inconclusive pairs with reasons and an optional failing-only view.

use super::types::{ClearancePair, Verdict};
use serde::{Deserialize, Serialize};

/// Verdict counts over every analyzed pair
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub inconclusive: usize,
}

/// A concluded pair ranked by margin
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarginEntry {
    /// Position of the pair in the report's `pairs`
    pub index: usize,
    pub terminal_a: String,
    pub terminal_b: String,
    pub margin_mm: f64,
    pub verdict: Verdict,
}

/// A pair whose distance could not be determined
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InconclusivePair {
    /// Position in the report's `pairs`; `None` when filtered out
    pub index: Option<usize>,
    pub terminal_a: String,
    pub terminal_b: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub summary: ReportSummary,
    /// Analyzer output, or only the failing pairs when filtered
    pub pairs: Vec<ClearancePair>,
    /// Concluded pairs by ascending margin; ties keep analyzer order
    pub tightest: Vec<MarginEntry>,
    pub inconclusive: Vec<InconclusivePair>,
    pub failing_only: bool,
}

impl VerificationReport {
    /// True only when every pair passed; any Fail or Inconclusive blocks it
    pub fn all_passed(&self) -> bool {
        self.summary.total == self.summary.passed
    }

    pub fn failing(&self) -> impl Iterator<Item = &ClearancePair> {
        self.pairs.iter().filter(|p| p.verdict == Verdict::Fail)
    }

    pub fn inconclusive_pairs(&self) -> &[InconclusivePair] {
        &self.inconclusive
    }

    pub fn tightest_pairs(&self) -> &[MarginEntry] {
        &self.tightest
    }
}

/// Builds a VerificationReport without touching its input
pub struct VerificationReportBuilder<'a> {
    pairs: &'a [ClearancePair],
    tightest_limit: Option<usize>,
    failing_only: bool,
}

impl<'a> VerificationReportBuilder<'a> {
    pub fn new(pairs: &'a [ClearancePair]) -> Self {
        Self {
            pairs,
            tightest_limit: None,
            failing_only: false,
        }
    }

    /// Keep only the `n` tightest margins
    pub fn tightest_limit(mut self, n: usize) -> Self {
        self.tightest_limit = Some(n);
        self
    }

    /// List only failing pairs (counts still cover every pair)
    pub fn failing_only(mut self, failing_only: bool) -> Self {
        self.failing_only = failing_only;
        self
    }

    pub fn build(self) -> VerificationReport {
        let summary = summarize(self.pairs);

        // Input position -> position in the listed pairs
        let mut listed = 0;
        let positions: Vec<Option<usize>> = self
            .pairs
            .iter()
            .map(|p| {
                (!self.failing_only || p.verdict == Verdict::Fail).then(|| {
                    listed += 1;
                    listed - 1
                })
            })
            .collect();

        let mut tightest: Vec<MarginEntry> = self
            .pairs
            .iter()
            .zip(&positions)
            .filter_map(|(p, position)| {
                let index = (*position)?;
                p.margin_mm.map(|margin_mm| MarginEntry {
                    index,
                    terminal_a: p.terminal_a.clone(),
                    terminal_b: p.terminal_b.clone(),
                    margin_mm,
                    verdict: p.verdict,
                })
            })
            .collect();
        // Stable sort keeps input order among equal margins
        tightest.sort_by(|x, y| x.margin_mm.total_cmp(&y.margin_mm));
        if let Some(limit) = self.tightest_limit {
            tightest.truncate(limit);
        }

        let inconclusive: Vec<InconclusivePair> = self
            .pairs
            .iter()
            .zip(&positions)
            .filter(|(p, _)| p.verdict == Verdict::Inconclusive)
            .map(|(p, position)| InconclusivePair {
                index: *position,
                terminal_a: p.terminal_a.clone(),
                terminal_b: p.terminal_b.clone(),
                reason: p
                    .reason
                    .clone()
                    .unwrap_or_else(|| "distance could not be determined".to_string()),
            })
            .collect();

        let pairs: Vec<ClearancePair> = self
            .pairs
            .iter()
            .zip(&positions)
            .filter(|(_, position)| position.is_some())
            .map(|(p, _)| p.clone())
            .collect();

        VerificationReport {
            summary,
            pairs,
            tightest,
            inconclusive,
            failing_only: self.failing_only,
        }
    }
}

fn summarize(pairs: &[ClearancePair]) -> ReportSummary {
    pairs.iter().fold(
        ReportSummary {
            total: pairs.len(),
            ..ReportSummary::default()
        },
        |mut summary, p| {
            match p.verdict {
                Verdict::Pass => summary.passed += 1,
                Verdict::Fail => summary.failed += 1,
                Verdict::Inconclusive => summary.inconclusive += 1,
            }
            summary
        },
    )
}
