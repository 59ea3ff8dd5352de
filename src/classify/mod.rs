//! Privacy-purpose classification.
//!
//! A three-stage pipeline with stop-on-first-high-confidence semantics:
//! reference rules, then contextual signals, then bare statistical
//! heuristics, combined under fixed stage weights when no single stage is
//! confident enough on its own. `classify` is a pure function of the
//! record, the session context, and the directory; identical inputs give
//! identical outputs.

pub mod context;
pub mod heuristics;
pub mod rules;

use crate::merge::CookieRecord;
use crate::session::context::ScanContext;
use crate::vendor::VendorDirectory;
use serde::{Deserialize, Serialize};

/// Privacy purpose of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Necessary,
    Analytics,
    Marketing,
    Functional,
    Social,
    Unknown,
}

impl Category {
    /// Fixed iteration order; earlier categories win score ties.
    pub const ALL: [Category; 6] = [
        Category::Necessary,
        Category::Analytics,
        Category::Marketing,
        Category::Functional,
        Category::Social,
        Category::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Necessary => "necessary",
            Category::Analytics => "analytics",
            Category::Marketing => "marketing",
            Category::Functional => "functional",
            Category::Social => "social",
            Category::Unknown => "unknown",
        }
    }

    /// Categories that require consent under GDPR/PECR.
    pub fn requires_consent(self) -> bool {
        !matches!(self, Category::Necessary)
    }

    /// Categories that drive the privacy risk score hardest.
    pub fn is_high_risk(self) -> bool {
        matches!(self, Category::Marketing | Category::Social)
    }
}

/// Stage combination weights. Empirically chosen in the source system;
/// overridable, not re-derived.
pub const RULE_WEIGHT: f64 = 0.5;
pub const CONTEXT_WEIGHT: f64 = 0.3;
pub const HEURISTIC_WEIGHT: f64 = 0.2;

/// Early-return thresholds and stage caps.
pub const RULE_EARLY_RETURN: f64 = 0.8;
pub const CONTEXT_EARLY_RETURN: f64 = 0.7;
pub const CONTEXT_CAP: f64 = 0.9;
pub const HEURISTIC_CAP: f64 = 0.8;
/// A single stage above this wins outright, bypassing combination.
pub const OUTRIGHT_WIN: f64 = 0.9;

/// Per-category scores produced by one stage.
#[derive(Debug, Clone, Default)]
pub struct StageScores {
    scores: [f64; 6],
}

impl StageScores {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(category: Category) -> usize {
        // Discriminants follow declaration order, which is ALL's order.
        category as usize
    }

    pub fn add(&mut self, category: Category, score: f64) {
        self.scores[Self::index(category)] += score;
    }

    pub fn get(&self, category: Category) -> f64 {
        self.scores[Self::index(category)]
    }

    pub fn cap(&mut self, max: f64) {
        for s in &mut self.scores {
            *s = s.min(max);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.scores.iter().all(|s| *s == 0.0)
    }

    /// Highest-scoring category, ties resolved by [`Category::ALL`]
    /// order. None when nothing scored.
    pub fn best(&self) -> Option<(Category, f64)> {
        let mut best: Option<(Category, f64)> = None;
        for category in Category::ALL {
            let score = self.get(category);
            if score > 0.0 && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((category, score));
            }
        }
        best
    }
}

/// Outcome of classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            category: Category::Unknown,
            confidence: 0.0,
            evidence: Vec::new(),
        }
    }
}

/// Three-stage classifier. Rule tables compile once at construction.
pub struct Classifier {
    rules: rules::RuleSet,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            rules: rules::RuleSet::new(),
        }
    }

    /// Classify one record. Pure and deterministic.
    pub fn classify(
        &self,
        record: &CookieRecord,
        ctx: &ScanContext,
        directory: &VendorDirectory,
    ) -> Classification {
        let (rule_scores, mut evidence) = self.rules.score(record, directory);
        if let Some((category, confidence)) = rule_scores.best() {
            if confidence > RULE_EARLY_RETURN {
                return Classification {
                    category,
                    confidence,
                    evidence,
                };
            }
        }

        let (context_scores, context_evidence) = context::score(record, ctx);
        evidence.extend(context_evidence);
        if let Some((category, confidence)) = context_scores.best() {
            if confidence > CONTEXT_EARLY_RETURN {
                return Classification {
                    category,
                    confidence,
                    evidence,
                };
            }
        }

        let (heuristic_scores, heuristic_evidence) = heuristics::score(record);
        evidence.extend(heuristic_evidence);

        if rule_scores.is_empty() && context_scores.is_empty() && heuristic_scores.is_empty() {
            return Classification::unknown();
        }

        // A stage this confident wins outright, without dilution by the
        // weaker stages.
        let stage_winner = [&rule_scores, &context_scores, &heuristic_scores]
            .iter()
            .filter_map(|s| s.best())
            .filter(|(_, confidence)| *confidence > OUTRIGHT_WIN)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((category, confidence)) = stage_winner {
            return Classification {
                category,
                confidence: confidence.min(1.0),
                evidence,
            };
        }

        let mut combined = StageScores::new();
        for category in Category::ALL {
            let weighted = RULE_WEIGHT * rule_scores.get(category)
                + CONTEXT_WEIGHT * context_scores.get(category)
                + HEURISTIC_WEIGHT * heuristic_scores.get(category);
            if weighted > 0.0 {
                combined.add(category, weighted);
            }
        }

        match combined.best() {
            Some((category, confidence)) => Classification {
                category,
                confidence: confidence.min(1.0),
                evidence,
            },
            None => Classification::unknown(),
        }
    }
}
