//! Sentiment scorer: rule-based compound polarity per headline and the mean
//! polarity per calendar day.

pub mod lexicon;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::news::Headline;
pub use lexicon::Lexicon;
use lexicon::CAPS_INCR;

/// Normalization constant of the compound score.
const COMPOUND_ALPHA: f64 = 15.0;
/// Emphasis added per exclamation mark (at most four count).
const EXCLAMATION_INCR: f64 = 0.292;
/// Emphasis added per question mark when two or three appear.
const QUESTION_INCR: f64 = 0.18;
/// Weight of terms before and after a contrastive "but".
const BEFORE_BUT: f64 = 0.5;
const AFTER_BUT: f64 = 1.5;

/// Mean headline polarity of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySentiment {
    pub date: NaiveDate,
    pub score: f64,
    pub headline_count: usize,
}

/// Deterministic lexicon/rule polarity scorer.
#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    lexicon: Lexicon,
    token_re: Regex,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self::with_lexicon(Lexicon::new())
    }

    pub fn with_lexicon(lexicon: Lexicon) -> Self {
        Self {
            lexicon,
            token_re: Regex::new(r"[A-Za-z][A-Za-z']*").expect("token pattern is valid"),
        }
    }

    /// Compound polarity of `text` in [-1, 1]; 0 when no lexicon term occurs.
    pub fn compound(&self, text: &str) -> f64 {
        let tokens: Vec<&str> = self.token_re.find_iter(text).map(|m| m.as_str()).collect();
        if tokens.is_empty() {
            return 0.0;
        }
        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();

        let n_caps = tokens.iter().filter(|t| is_all_caps(t)).count();
        let caps_differ = n_caps > 0 && n_caps < tokens.len();

        let mut valences = vec![0.0; tokens.len()];
        for (i, word) in lowered.iter().enumerate() {
            if self.lexicon.booster(word).is_some() {
                continue;
            }
            let Some(mut valence) = self.lexicon.valence(word) else {
                continue;
            };

            if caps_differ && is_all_caps(tokens[i]) {
                valence += CAPS_INCR * valence.signum();
            }

            // up to three preceding tokens can boost or negate the term
            for distance in 1..=3usize {
                if i < distance {
                    break;
                }
                let prev = &lowered[i - distance];
                if let Some(scalar) = self.lexicon.booster(prev) {
                    let mut s = scalar * valence.signum();
                    if caps_differ && is_all_caps(tokens[i - distance]) {
                        s += CAPS_INCR * valence.signum();
                    }
                    s *= match distance {
                        1 => 1.0,
                        2 => 0.95,
                        _ => 0.9,
                    };
                    valence += s;
                }
                if self.lexicon.is_negation(prev) {
                    valence *= lexicon::NEGATION_SCALAR;
                }
            }

            valences[i] = valence;
        }

        if let Some(but_idx) = lowered.iter().position(|w| w == "but") {
            for (i, v) in valences.iter_mut().enumerate() {
                if i < but_idx {
                    *v *= BEFORE_BUT;
                } else if i > but_idx {
                    *v *= AFTER_BUT;
                }
            }
        }

        let mut sum: f64 = valences.iter().sum();
        if sum != 0.0 {
            let emphasis = punctuation_emphasis(text);
            sum += emphasis * sum.signum();
        }

        normalize(sum)
    }
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_all_caps(token: &str) -> bool {
    token.len() > 1
        && token.chars().any(|c| c.is_ascii_alphabetic())
        && token.chars().all(|c| !c.is_ascii_lowercase())
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4) as f64;
    let questions = text.matches('?').count();
    let question_emphasis = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * QUESTION_INCR,
        _ => 0.96,
    };
    exclamations * EXCLAMATION_INCR + question_emphasis
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + COMPOUND_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

/// Arithmetic mean of scores per date, ascending. Dates without scores are absent.
pub fn aggregate_scores(scores: &[(NaiveDate, f64)]) -> Vec<DailySentiment> {
    let mut by_date: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for &(date, score) in scores {
        let entry = by_date.entry(date).or_insert((0.0, 0));
        entry.0 += score;
        entry.1 += 1;
    }

    by_date
        .into_iter()
        .map(|(date, (sum, count))| DailySentiment {
            date,
            score: sum / count as f64,
            headline_count: count,
        })
        .collect()
}

/// Score every headline and average per calendar day.
pub fn daily_sentiment(headlines: &[Headline], analyzer: &SentimentAnalyzer) -> Vec<DailySentiment> {
    let scores: Vec<(NaiveDate, f64)> = headlines
        .iter()
        .map(|h| (h.date, analyzer.compound(&h.text)))
        .collect();
    let daily = aggregate_scores(&scores);
    info!(
        "Scored {} headlines into {} daily sentiment values",
        headlines.len(),
        daily.len()
    );
    daily
}
