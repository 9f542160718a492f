use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::line::clean_line;

/// A gold line the prediction failed to reproduce.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Mismatch {
    Different {
        label: String,
        predicted: String,
        gold: String,
    },
    Missing {
        label: String,
        gold: String,
    },
}

impl Mismatch {
    pub fn label(&self) -> &str {
        match self {
            Mismatch::Different { label, .. } | Mismatch::Missing { label, .. } => label,
        }
    }
}

/// A predicted line whose label never appears in the gold file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExtraLine {
    pub label: String,
    pub predicted: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ValidationReport {
    pub mismatches: Vec<Mismatch>,
    pub extras: Vec<ExtraLine>,
    pub matched: usize,
    pub total: usize,
}

impl ValidationReport {
    /// Share of gold lines reproduced exactly; `None` without gold lines.
    pub fn match_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.matched as f64 / self.total as f64)
    }
}

fn split_label(line: &str) -> Option<(&str, &str)> {
    let (label, text) = line.trim().split_once(char::is_whitespace)?;
    Some((label, text.trim_start()))
}

/// Compare predicted `<label> <text>` lines against gold lines by label.
///
/// Gold text goes through [`clean_line`] first; predicted text is compared
/// as written. Lines without a text part are ignored on both sides, and a
/// repeated predicted label keeps its last text.
pub fn validate<P, G>(predicted: P, gold: G) -> ValidationReport
where
    P: IntoIterator,
    P::Item: AsRef<str>,
    G: IntoIterator,
    G::Item: AsRef<str>,
{
    let mut order: Vec<String> = Vec::new();
    let mut by_label: HashMap<String, String> = HashMap::new();
    for line in predicted {
        let Some((label, text)) = split_label(line.as_ref()) else {
            continue;
        };
        if by_label.insert(label.to_string(), text.to_string()).is_none() {
            order.push(label.to_string());
        }
    }

    let mut report = ValidationReport::default();
    let mut seen: HashSet<String> = HashSet::new();
    for line in gold {
        let cleaned = clean_line(line.as_ref(), true);
        let Some((label, text)) = split_label(&cleaned) else {
            continue;
        };
        seen.insert(label.to_string());
        report.total += 1;
        match by_label.get(label) {
            Some(predicted) if predicted == text => report.matched += 1,
            Some(predicted) => report.mismatches.push(Mismatch::Different {
                label: label.to_string(),
                predicted: predicted.clone(),
                gold: text.to_string(),
            }),
            None => report.mismatches.push(Mismatch::Missing {
                label: label.to_string(),
                gold: text.to_string(),
            }),
        }
    }

    for label in order {
        if seen.contains(&label) {
            continue;
        }
        if let Some(predicted) = by_label.remove(&label) {
            report.extras.push(ExtraLine { label, predicted });
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_matches_mismatches_and_extras() {
        let predicted = [
            "o.1 d⁼en-lil2 lugal",
            "o.2 szu-ni",
            "o.9 stray line",
            "",
            "o.2 szu-ni-ta",
        ];
        let gold = [
            "o.1 {d}en-lil2 [lugal]#",
            "o.2 szu-ni",
            "o.3 gu4",
            "lonely-label",
        ];
        let report = validate(predicted, gold);
        assert_eq!(report.total, 3);
        assert_eq!(report.matched, 1);
        assert_eq!(
            report.mismatches,
            vec![
                Mismatch::Different {
                    label: "o.2".into(),
                    predicted: "szu-ni-ta".into(),
                    gold: "szu-ni".into(),
                },
                Mismatch::Missing {
                    label: "o.3".into(),
                    gold: "gu4".into(),
                },
            ]
        );
        assert_eq!(
            report.extras,
            vec![ExtraLine {
                label: "o.9".into(),
                predicted: "stray line".into(),
            }]
        );
        let rate = report.match_rate().unwrap();
        assert!((rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_gold_has_no_rate() {
        let report = validate(["o.1 x"], Vec::<String>::new());
        assert_eq!(report.match_rate(), None);
        assert_eq!(report.extras.len(), 1);
    }

    #[test]
    fn report_serializes_with_status_tags() {
        let report = validate(Vec::<&str>::new(), ["o.1 a"]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mismatches"][0]["status"], "missing");
        assert_eq!(json["mismatches"][0]["label"], "o.1");
        assert_eq!(json["total"], 1);
    }
}
