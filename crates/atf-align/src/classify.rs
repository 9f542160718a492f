use atf_codec::{MalformedWordError, Transliterator, WordCodec};
use atf_types::{Direction, Label, Thresholds, WordPair};
use serde::Serialize;

use crate::similarity::similarity;

/// Label plus the similarities that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Classification {
    pub label: Label,
    /// CDLI form converted to ORACC, compared with the ORACC form.
    #[serde(rename = "sim_cdli_to_oracc")]
    pub sim_ab: f64,
    /// ORACC form converted to CDLI, compared with the CDLI form. `None` when
    /// the first direction already fell below `likely_misaligned`.
    #[serde(rename = "sim_oracc_to_cdli")]
    pub sim_ba: Option<f64>,
}

/// Map a pair of similarities to a label.
pub fn label_for(sim_ab: f64, sim_ba: f64, thresholds: &Thresholds) -> Label {
    let sim_min = sim_ab.min(sim_ba);
    if sim_ab >= thresholds.exact && sim_ba >= thresholds.exact {
        Label::Exact
    } else if sim_min >= thresholds.high {
        Label::High
    } else if sim_min < thresholds.likely_misaligned {
        Label::LikelyMisaligned
    } else {
        Label::ConversionIssue
    }
}

/// Judges whether a word pair is one word written two ways, using the codec
/// as an oracle in both directions.
#[derive(Clone, Debug)]
pub struct SimilarityClassifier<T = WordCodec> {
    codec: T,
}

impl<T: Transliterator> SimilarityClassifier<T> {
    pub fn new(codec: T) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &T {
        &self.codec
    }

    /// Classify one pair. The reverse direction is only converted when the
    /// forward similarity reaches `likely_misaligned`.
    pub fn classify(
        &self,
        pair: &WordPair,
        thresholds: &Thresholds,
    ) -> Result<Classification, MalformedWordError> {
        let converted_a = self.codec.transliterate(&pair.cdli, Direction::CdliToOracc)?;
        let sim_ab = similarity(&converted_a, pair.oracc.trim());
        if sim_ab < thresholds.likely_misaligned {
            return Ok(Classification {
                label: Label::LikelyMisaligned,
                sim_ab,
                sim_ba: None,
            });
        }

        let converted_b = self.codec.transliterate(&pair.oracc, Direction::OraccToCdli)?;
        let sim_ba = similarity(&converted_b, pair.cdli.trim());
        Ok(Classification {
            label: label_for(sim_ab, sim_ba, thresholds),
            sim_ab,
            sim_ba: Some(sim_ba),
        })
    }
}
