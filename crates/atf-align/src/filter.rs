use std::collections::BTreeMap;

use atf_codec::{MalformedWordError, Transliterator, WordCodec};
use atf_types::{Label, ThresholdError, Thresholds, WordPair};
use bitvec::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classify::{Classification, SimilarityClassifier};

/// Substrings that mark a form as export debris (unclosed `$` rulings).
pub const DEFAULT_GARBAGE_TOKENS: [&str; 4] = ["$", "($", "$)", "($)"];

pub type KeepMask = BitVec<usize, Lsb0>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub garbage_tokens: Vec<String>,
    pub thresholds: Thresholds,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            garbage_tokens: DEFAULT_GARBAGE_TOKENS.iter().map(|t| t.to_string()).collect(),
            thresholds: Thresholds::default(),
        }
    }
}

impl FilterConfig {
    pub fn with_thresholds(thresholds: Thresholds) -> Result<Self, ThresholdError> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            ..Self::default()
        })
    }

    /// Either form equals or contains a garbage token. Empty tokens never match.
    pub fn is_garbage(&self, pair: &WordPair) -> bool {
        self.garbage_tokens
            .iter()
            .filter(|token| !token.is_empty())
            .any(|token| pair.cdli.contains(token.as_str()) || pair.oracc.contains(token.as_str()))
    }
}

/// What the filter decided for one pair.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    Garbage,
    Malformed(MalformedWordError),
    Classified(Classification),
}

impl Verdict {
    pub fn is_kept(&self) -> bool {
        matches!(self, Verdict::Classified(c) if c.label.is_kept())
    }

    pub fn classification(&self) -> Option<&Classification> {
        match self {
            Verdict::Classified(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCounts {
    pub total: usize,
    pub kept: usize,
    pub garbage: usize,
    pub malformed: usize,
    pub by_label: BTreeMap<Label, usize>,
}

impl Default for FilterCounts {
    fn default() -> Self {
        Self {
            total: 0,
            kept: 0,
            garbage: 0,
            malformed: 0,
            by_label: Label::ALL.iter().map(|label| (*label, 0)).collect(),
        }
    }
}

impl FilterCounts {
    pub fn record(&mut self, verdict: &Verdict) {
        self.total += 1;
        match verdict {
            Verdict::Garbage => self.garbage += 1,
            Verdict::Malformed(_) => self.malformed += 1,
            Verdict::Classified(c) => *self.by_label.entry(c.label).or_default() += 1,
        }
        if verdict.is_kept() {
            self.kept += 1;
        }
    }

    pub fn merge(&mut self, other: &FilterCounts) {
        self.total += other.total;
        self.kept += other.kept;
        self.garbage += other.garbage;
        self.malformed += other.malformed;
        for (label, n) in &other.by_label {
            *self.by_label.entry(*label).or_default() += n;
        }
    }

    pub fn label(&self, label: Label) -> usize {
        self.by_label.get(&label).copied().unwrap_or(0)
    }

    pub fn dropped(&self) -> usize {
        self.total - self.kept
    }
}

/// A pair that survived the filter, tagged with its input position.
#[derive(Clone, Debug, PartialEq)]
pub struct KeptPair {
    pub index: usize,
    pub pair: WordPair,
    pub classification: Classification,
}

#[derive(Clone, Debug, Default)]
pub struct FilterOutcome {
    /// In input order.
    pub kept: Vec<KeptPair>,
    pub counts: FilterCounts,
    /// One bit per input pair, set when the pair was kept.
    pub keep_mask: KeepMask,
}

/// Garbage pre-check followed by similarity classification.
#[derive(Clone, Debug)]
pub struct CleaningFilter<T = WordCodec> {
    classifier: SimilarityClassifier<T>,
    config: FilterConfig,
}

impl<T: Transliterator> CleaningFilter<T> {
    pub fn new(codec: T, config: FilterConfig) -> Self {
        Self {
            classifier: SimilarityClassifier::new(codec),
            config,
        }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn classifier(&self) -> &SimilarityClassifier<T> {
        &self.classifier
    }

    pub fn verdict(&self, pair: &WordPair) -> Verdict {
        if self.config.is_garbage(pair) {
            return Verdict::Garbage;
        }
        match self.classifier.classify(pair, &self.config.thresholds) {
            Ok(c) => Verdict::Classified(c),
            Err(err) => Verdict::Malformed(err),
        }
    }

    /// Filter a stream sequentially.
    pub fn filter<I>(&self, pairs: I) -> FilterOutcome
    where
        I: IntoIterator<Item = WordPair>,
    {
        let mut outcome = FilterOutcome::default();
        for (index, pair) in pairs.into_iter().enumerate() {
            let verdict = self.verdict(&pair);
            outcome.push(index, pair, verdict);
        }
        outcome
    }
}

impl<T: Transliterator + Sync> CleaningFilter<T> {
    /// Verdicts for a slice, computed in parallel, returned in slice order.
    pub fn verdicts_par(&self, pairs: &[WordPair]) -> Vec<Verdict> {
        pairs.par_iter().map(|pair| self.verdict(pair)).collect()
    }

    /// Same result as [`Self::filter`], classified on the rayon pool.
    pub fn filter_par(&self, pairs: Vec<WordPair>) -> FilterOutcome {
        let verdicts = self.verdicts_par(&pairs);
        let mut outcome = FilterOutcome::default();
        for (index, (pair, verdict)) in pairs.into_iter().zip(verdicts).enumerate() {
            outcome.push(index, pair, verdict);
        }
        outcome
    }
}

impl FilterOutcome {
    fn push(&mut self, index: usize, pair: WordPair, verdict: Verdict) {
        self.counts.record(&verdict);
        let kept = verdict.is_kept();
        self.keep_mask.push(kept);
        if kept && let Verdict::Classified(classification) = verdict {
            self.kept.push(KeptPair {
                index,
                pair,
                classification,
            });
        }
    }
}
