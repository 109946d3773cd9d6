//! Topic momentum: recent submission rate against a trailing baseline
//!
//! ```text
//!   ref-A-B          ref-A              ref
//!      |---- window B ---|---- window A ---|---->
//! ```
//! Window A is open-ended towards the future; B is half-open `[ref-A-B, ref-A)`.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use papertrend_store::Paper;
use papertrend_store::dates::{format_date, parse_date};

use crate::topic::Topic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumWindows {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
}

/// Serialized as `metrics/topic_momentum.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMomentum {
    pub generated_at: String,
    pub window: MomentumWindows,
    pub topics: BTreeMap<String, f64>,
}

fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Momentum per topic from tagged papers' submission dates.
///
/// `(count_a - baseline) / max(1, baseline)` where `baseline = count_b * A / B`
/// (0 when `B == 0`), rounded to 3 decimals.
pub fn compute_topic_momentum(
    papers: &[Paper],
    topics: &[Topic],
    reference: NaiveDate,
    window_a: u32,
    window_b: u32,
) -> TopicMomentum {
    let start_a = days_before(reference, window_a);
    let start_b = days_before(start_a, window_b);

    let mut counts: HashMap<&str, (u32, u32)> = HashMap::new();
    for paper in papers {
        let Some(submitted) = parse_date(&paper.submitted_at) else {
            continue;
        };
        let in_a = submitted >= start_a;
        let in_b = !in_a && submitted >= start_b;
        if !in_a && !in_b {
            continue;
        }
        for tag in &paper.topic_tags {
            let entry = counts.entry(tag.topic_id.as_str()).or_default();
            if in_a {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }
    }

    let topics = topics
        .iter()
        .map(|topic| {
            let (count_a, count_b) = counts.get(topic.id.as_str()).copied().unwrap_or_default();
            let baseline = if window_b > 0 {
                f64::from(count_b) * f64::from(window_a) / f64::from(window_b)
            } else {
                0.0
            };
            let value = (f64::from(count_a) - baseline) / baseline.max(1.0);
            (topic.id.clone(), round3(value))
        })
        .collect();

    TopicMomentum {
        generated_at: format_date(reference),
        window: MomentumWindows {
            a: format!("{}_to_{}", format_date(start_a), format_date(reference)),
            b: format!("{}_to_{}", format_date(start_b), format_date(start_a)),
        },
        topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrend_store::TopicTag;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 22).unwrap()
    }

    fn tagged(submitted: &str, topic: &str) -> Paper {
        Paper {
            id: format!("{topic}-{submitted}"),
            submitted_at: submitted.into(),
            topic_tags: vec![TopicTag {
                topic_id: topic.into(),
                confidence: 0.58,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn topic(id: &str) -> Topic {
        Topic {
            id: id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn windows_are_labelled() {
        let m = compute_topic_momentum(&[], &[topic("a")], reference(), 7, 14);
        assert_eq!(m.generated_at, "2026-01-22");
        assert_eq!(m.window.a, "2026-01-15_to_2026-01-22");
        assert_eq!(m.window.b, "2026-01-01_to_2026-01-15");
        assert_eq!(m.topics["a"], 0.0);
    }

    #[test]
    fn growth_against_baseline() {
        // A = 7, B = 14: four in A, two in B → baseline 1.0 → (4 - 1) / 1 = 3
        let papers = vec![
            tagged("2026-01-15", "a"),
            tagged("2026-01-18", "a"),
            tagged("2026-01-21", "a"),
            tagged("2026-01-25", "a"),
            tagged("2026-01-01", "a"),
            tagged("2026-01-14", "a"),
            tagged("2025-12-31", "a"),
        ];
        let m = compute_topic_momentum(&papers, &[topic("a")], reference(), 7, 14);
        assert_eq!(m.topics["a"], 3.0);
    }

    #[test]
    fn decline_is_negative() {
        // baseline = 8 * 7/14 = 4; (1 - 4) / 4 = -0.75
        let mut papers: Vec<Paper> = (1..=8).map(|d| tagged(&format!("2026-01-{d:02}"), "a")).collect();
        papers.push(tagged("2026-01-20", "a"));
        let m = compute_topic_momentum(&papers, &[topic("a")], reference(), 7, 14);
        assert_eq!(m.topics["a"], -0.75);
    }

    #[test]
    fn rounds_to_three_decimals() {
        // baseline = 2 * 7/3 = 4.667; (1 - 4.667) / 4.667 = -0.7857..
        let papers = vec![
            tagged("2026-01-13", "a"),
            tagged("2026-01-14", "a"),
            tagged("2026-01-20", "a"),
        ];
        let m = compute_topic_momentum(&papers, &[topic("a")], reference(), 7, 3);
        assert_eq!(m.topics["a"], -0.786);
    }

    #[test]
    fn zero_baseline_window() {
        let papers = vec![tagged("2026-01-20", "a"), tagged("2026-01-21", "a")];
        let m = compute_topic_momentum(&papers, &[topic("a")], reference(), 7, 0);
        assert_eq!(m.topics["a"], 2.0);
    }

    #[test]
    fn untagged_and_undated_papers_ignored() {
        let mut undated = tagged("", "a");
        undated.submitted_at.clear();
        let papers = vec![undated, tagged("2026-01-20", "b")];
        let m = compute_topic_momentum(&papers, &[topic("a"), topic("b")], reference(), 7, 14);
        assert_eq!(m.topics["a"], 0.0);
        assert_eq!(m.topics["b"], 1.0);
        assert!(!m.topics.contains_key("unknown"));
    }

    #[test]
    fn serializes_window_keys_uppercase() {
        let m = compute_topic_momentum(&[], &[topic("a")], reference(), 7, 14);
        let value = serde_json::to_value(&m).unwrap();
        assert!(value["window"]["A"].is_string());
        assert!(value["window"]["B"].is_string());
    }
}
