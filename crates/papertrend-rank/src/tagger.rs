//! Keyword and category rules → topic tags
//!
//! Plain case-insensitive substring matching over `title + " " + abstract`.

use rayon::prelude::*;

use papertrend_store::{Paper, Rationale, TopicTag};

use crate::topic::Topic;

/// Rule-set identifier recorded in every tag rationale.
pub const RULES_VERSION: &str = "v1";

/// Keywords from `keywords` that occur in `text` (already lowercased).
fn matches<'a>(text: &str, keywords: &'a [String]) -> Vec<&'a String> {
    keywords
        .iter()
        .filter(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Tags for one paper, sorted by confidence descending (stable).
pub fn tag_paper(paper: &Paper, topics: &[Topic], rules_version: &str) -> Vec<TopicTag> {
    let text = format!("{} {}", paper.title, paper.abstract_text).to_lowercase();
    let mut tags = Vec::new();

    for topic in topics {
        if !matches(&text, &topic.exclude_keywords).is_empty() {
            continue;
        }
        let matched_any = matches(&text, &topic.keywords_any);
        let matched_all = matches(&text, &topic.keywords_all);
        let has_all = matched_all.len() == topic.keywords_all.iter().filter(|k| !k.is_empty()).count();
        let has_any = topic.keywords_any.is_empty() || !matched_any.is_empty();
        if !has_all || !has_any {
            continue;
        }
        let whitelisted = topic
            .category_whitelist
            .iter()
            .any(|c| *c == paper.primary_category);
        if matched_any.is_empty() && matched_all.is_empty() && !whitelisted {
            continue;
        }

        let matched_keywords =
            papertrend_store::paper::unique_non_empty(matched_any.into_iter().chain(matched_all));
        let boost = if whitelisted { 0.15 } else { 0.0 };
        let confidence = round2(0.5 + 0.08 * matched_keywords.len() as f64 + boost).min(1.0);

        tags.push(TopicTag {
            topic_id: topic.id.clone(),
            confidence,
            rationale: Rationale {
                matched_keywords,
                rules_version: rules_version.to_string(),
            },
        });
    }

    tags.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    tags
}

/// Recompute tags for every paper; output order matches input order.
pub fn tag_papers(papers: Vec<Paper>, topics: &[Topic], rules_version: &str) -> Vec<Paper> {
    papers
        .into_par_iter()
        .map(|mut paper| {
            paper.topic_tags = tag_paper(&paper, topics, rules_version);
            paper
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str, abstract_text: &str, primary: &str) -> Paper {
        Paper {
            id: "2601.00001".into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            primary_category: primary.into(),
            categories: vec![primary.into()],
            ..Default::default()
        }
    }

    fn robustness() -> Topic {
        Topic {
            id: "robustness".into(),
            keywords_any: vec!["invariant".into(), "distribution shift".into()],
            category_whitelist: vec!["cs.LG".into()],
            ..Default::default()
        }
    }

    #[test]
    fn keywords_and_whitelist() {
        let p = paper("Invariant Risk Minimization for Distribution Shift", "", "cs.LG");
        let tags = tag_paper(&p, &[robustness()], RULES_VERSION);
        assert_eq!(tags.len(), 1);
        let tag = &tags[0];
        assert_eq!(tag.topic_id, "robustness");
        assert!(tag.confidence > 0.5 && tag.confidence <= 1.0);
        assert_eq!(tag.confidence, 0.81);
        assert_eq!(tag.rationale.matched_keywords, vec!["invariant", "distribution shift"]);
        assert_eq!(tag.rationale.rules_version, "v1");
    }

    #[test]
    fn exclude_vetoes() {
        let mut topic = robustness();
        topic.exclude_keywords = vec!["survey".into()];
        let p = paper("A Survey of Invariant Learning", "", "cs.LG");
        assert!(tag_paper(&p, &[topic], RULES_VERSION).is_empty());
    }

    #[test]
    fn all_gate_requires_every_keyword() {
        let topic = Topic {
            id: "rlhf".into(),
            keywords_all: vec!["reward model".into(), "human feedback".into()],
            ..Default::default()
        };
        let partial = paper("Reward model overoptimization", "", "cs.LG");
        assert!(tag_paper(&partial, &[topic.clone()], RULES_VERSION).is_empty());

        let full = paper("Reward model learning", "from human feedback", "cs.CL");
        let tags = tag_paper(&full, &[topic], RULES_VERSION);
        assert_eq!(tags[0].confidence, 0.66);
    }

    #[test]
    fn whitelist_alone_is_a_pathway() {
        let topic = Topic {
            id: "nlp".into(),
            category_whitelist: vec!["cs.CL".into()],
            ..Default::default()
        };
        let tags = tag_paper(&paper("Parsing", "", "cs.CL"), &[topic.clone()], RULES_VERSION);
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].confidence, 0.65);
        assert!(tags[0].rationale.matched_keywords.is_empty());

        assert!(tag_paper(&paper("Parsing", "", "cs.LG"), &[topic], RULES_VERSION).is_empty());
    }

    #[test]
    fn whitelist_does_not_bypass_any_gate() {
        let p = paper("Graph neural networks", "", "cs.LG");
        assert!(tag_paper(&p, &[robustness()], RULES_VERSION).is_empty());
    }

    #[test]
    fn confidence_capped_at_one() {
        let topic = Topic {
            id: "many".into(),
            keywords_any: (0..10).map(|i| format!("k{i}")).collect(),
            category_whitelist: vec!["cs.LG".into()],
            ..Default::default()
        };
        let text: Vec<String> = (0..10).map(|i| format!("k{i}")).collect();
        let p = paper(&text.join(" "), "", "cs.LG");
        assert_eq!(tag_paper(&p, &[topic], RULES_VERSION)[0].confidence, 1.0);
    }

    #[test]
    fn sorted_by_confidence_desc() {
        let weak = Topic {
            id: "weak".into(),
            keywords_any: vec!["shift".into()],
            ..Default::default()
        };
        let p = paper("Invariant features under distribution shift", "", "cs.LG");
        let tags = tag_paper(&p, &[weak, robustness()], RULES_VERSION);
        let ids: Vec<&str> = tags.iter().map(|t| t.topic_id.as_str()).collect();
        assert_eq!(ids, vec!["robustness", "weak"]);
    }

    #[test]
    fn tag_papers_replaces_tags_in_order() {
        let mut stale = paper("Nothing relevant", "", "math.CO");
        stale.topic_tags.push(TopicTag {
            topic_id: "robustness".into(),
            confidence: 0.9,
            ..Default::default()
        });
        let fresh = paper("Invariant predictors", "", "stat.ML");
        let tagged = tag_papers(vec![stale, fresh], &[robustness()], RULES_VERSION);
        assert!(tagged[0].topic_tags.is_empty());
        assert_eq!(tagged[1].topic_tags.len(), 1);
        assert_eq!(tagged[1].title, "Invariant predictors");
    }
}
