//! Heuristic similarity between a record's text and a candidate entity.
//!
//! Three independent heuristics, each on a 0–1 scale:
//! 1. Exact substring: the candidate's full name (or company) appears in the
//!    haystack. Shorter haystacks make the hit more specific.
//! 2. Word-boundary partial: share of the candidate name's words (> 2 chars)
//!    found as whole words, weighted 0.7.
//! 3. Common meaningful words: at least two shared non-stopword tokens
//!    (>= 3 chars), 0.3 per shared word.
//!
//! A candidate's score is the best single heuristic, never a sum.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::normalize::normalize_str;
use crate::entity::{EntityType, Record};

pub const STOPWORDS: [&str; 12] = [
    "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

const PARTIAL_WORD_WEIGHT: f64 = 0.7;
const COMMON_WORD_WEIGHT: f64 = 0.3;
const MIN_COMMON_WORDS: usize = 2;

fn re_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("word regex"))
}

/// Confidence band derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Confidence::High
        } else if score >= 0.6 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// A scored candidate for one record. Built fresh on every pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub name: String,
    pub score: f64,
    pub confidence: Confidence,
}

/// A candidate entity tokenized once so a batch pass can score many records
/// against it without re-lowercasing or recompiling word patterns.
#[derive(Debug, Clone)]
pub struct PreparedCandidate {
    pub id: String,
    pub entity_type: EntityType,
    pub display_name: String,
    names: Vec<String>,
    name_patterns: Vec<Vec<Regex>>,
    words: HashSet<String>,
}

impl PreparedCandidate {
    pub fn from_record(record: &Record) -> Self {
        let primary = [&record.name, &record.title, &record.label]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.trim().is_empty());

        let names: Vec<String> = [primary, record.company.as_deref()]
            .into_iter()
            .flatten()
            .map(normalize_str)
            .filter(|n| !n.is_empty())
            .fold(Vec::new(), |mut acc, n| {
                if !acc.contains(&n) {
                    acc.push(n);
                }
                acc
            });

        let name_patterns = names.iter().map(|n| word_patterns(n)).collect();

        let descriptive = [
            primary,
            record.company.as_deref(),
            record.notes.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

        Self {
            id: record.id.clone(),
            entity_type: record.entity_type,
            display_name: record.display_name().to_string(),
            names,
            name_patterns,
            words: meaningful_words(&normalize_str(&descriptive)),
        }
    }

    /// Best single-heuristic score against a normalized haystack.
    pub fn score(&self, haystack: &str) -> f64 {
        self.score_with(haystack, &meaningful_words(haystack))
    }

    fn score_with(&self, haystack: &str, haystack_words: &HashSet<String>) -> f64 {
        if haystack.is_empty() {
            return 0.0;
        }
        let exact = self
            .names
            .iter()
            .map(|name| exact_substring_score(haystack, name))
            .fold(0.0, f64::max);
        let partial = self
            .name_patterns
            .iter()
            .map(|patterns| partial_pattern_score(haystack, patterns))
            .fold(0.0, f64::max);
        let common = common_words_between(haystack_words, &self.words);
        exact.max(partial).max(common)
    }

    fn to_match(&self, score: f64) -> MatchCandidate {
        MatchCandidate {
            entity_id: self.id.clone(),
            entity_type: self.entity_type,
            name: self.display_name.clone(),
            score,
            confidence: Confidence::from_score(score),
        }
    }
}

pub fn prepare_candidates(records: &[Record]) -> Vec<PreparedCandidate> {
    records.iter().map(PreparedCandidate::from_record).collect()
}

/// Every candidate with a positive score, best first. Equal scores keep
/// candidate order.
pub fn rank_candidates(haystack: &str, candidates: &[PreparedCandidate]) -> Vec<MatchCandidate> {
    if haystack.is_empty() {
        return Vec::new();
    }
    let haystack_words = meaningful_words(haystack);
    let mut ranked: Vec<MatchCandidate> = candidates
        .iter()
        .filter_map(|c| {
            let score = c.score_with(haystack, &haystack_words);
            (score > 0.0).then(|| c.to_match(score))
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

/// Highest-scoring candidate regardless of threshold. The first candidate
/// wins a tie.
pub fn best_candidate(haystack: &str, candidates: &[PreparedCandidate]) -> Option<MatchCandidate> {
    rank_candidates(haystack, candidates).into_iter().next()
}

/// Best candidate, returned only when its score reaches `threshold`.
pub fn find_best_match(
    haystack: &str,
    candidates: &[PreparedCandidate],
    threshold: f64,
) -> Option<MatchCandidate> {
    best_candidate(haystack, candidates).filter(|m| m.score >= threshold)
}

/// `min(1, len(needle) / len(haystack) * 2)` when the needle is contained.
pub fn exact_substring_score(haystack: &str, needle: &str) -> f64 {
    if needle.is_empty() || haystack.is_empty() || !haystack.contains(needle) {
        return 0.0;
    }
    let ratio = needle.chars().count() as f64 / haystack.chars().count() as f64;
    (ratio * 2.0).min(1.0)
}

/// Share of the name's words (> 2 chars) present as whole words, times 0.7.
pub fn partial_word_score(haystack: &str, name: &str) -> f64 {
    partial_pattern_score(haystack, &word_patterns(name))
}

/// Shared meaningful words between two texts: 0 below two, else 0.3 each,
/// capped at 1.
pub fn common_words_score(a: &str, b: &str) -> f64 {
    common_words_between(&meaningful_words(a), &meaningful_words(b))
}

/// Word tokens of at least three characters, stopwords removed.
pub fn meaningful_words(text: &str) -> HashSet<String> {
    re_word()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() >= 3 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn word_patterns(name: &str) -> Vec<Regex> {
    name.split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .filter_map(|w| Regex::new(&format!(r"\b{}\b", regex::escape(w))).ok())
        .collect()
}

fn partial_pattern_score(haystack: &str, patterns: &[Regex]) -> f64 {
    if patterns.is_empty() {
        return 0.0;
    }
    let matched = patterns.iter().filter(|p| p.is_match(haystack)).count();
    matched as f64 / patterns.len() as f64 * PARTIAL_WORD_WEIGHT
}

fn common_words_between(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let shared = a.intersection(b).count();
    if shared < MIN_COMMON_WORDS {
        return 0.0;
    }
    (shared as f64 * COMMON_WORD_WEIGHT).min(1.0)
}
