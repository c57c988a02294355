//! Valence lexicon for headline scoring.
//!
//! Valences use the -4..4 scale of rule-based analyzers such as VADER. The
//! word list mixes general-purpose sentiment words with market vocabulary that
//! shows up in commodity headlines.

use std::collections::HashMap;

/// Scalar added for a booster word ("very", "sharply") preceding a term.
pub const BOOST_INCR: f64 = 0.293;
/// Scalar subtracted for a dampener word ("slightly", "somewhat").
pub const BOOST_DECR: f64 = -0.293;
/// Multiplier applied to a term under negation.
pub const NEGATION_SCALAR: f64 = -0.74;
/// Extra magnitude for an ALL-CAPS term inside mixed-case text.
pub const CAPS_INCR: f64 = 0.733;

const VALENCES: &[(&str, f64)] = &[
    // general positive
    ("good", 1.9),
    ("great", 3.1),
    ("best", 3.2),
    ("better", 1.9),
    ("positive", 2.6),
    ("optimistic", 1.3),
    ("optimism", 2.5),
    ("hope", 1.9),
    ("hopes", 1.9),
    ("hopeful", 1.6),
    ("confidence", 2.3),
    ("confident", 2.2),
    ("strong", 2.3),
    ("stronger", 1.6),
    ("strength", 2.2),
    ("win", 2.8),
    ("wins", 2.7),
    ("success", 2.7),
    ("successful", 2.8),
    ("support", 1.7),
    ("supported", 1.3),
    ("safe", 1.9),
    ("stable", 1.2),
    ("stability", 1.2),
    ("benefit", 2.0),
    ("benefits", 1.6),
    ("boost", 1.7),
    ("boosts", 1.3),
    ("boosted", 1.5),
    ("improve", 1.9),
    ("improves", 1.8),
    ("improved", 2.1),
    ("recovery", 1.4),
    ("recover", 1.3),
    ("recovers", 1.4),
    ("rebound", 1.3),
    ("rebounds", 1.3),
    ("record", 0.9),
    ("profit", 1.9),
    ("profits", 1.9),
    ("gain", 2.4),
    ("gains", 1.8),
    ("gained", 1.6),
    ("rally", 1.8),
    ("rallies", 1.8),
    ("rallied", 1.8),
    ("surge", 1.6),
    ("surges", 1.6),
    ("surged", 1.6),
    ("soar", 2.0),
    ("soars", 2.0),
    ("soared", 2.0),
    ("climb", 1.2),
    ("climbs", 1.2),
    ("jump", 1.1),
    ("jumps", 1.1),
    ("rise", 1.0),
    ("rises", 1.0),
    ("rising", 0.9),
    ("up", 0.6),
    ("high", 0.9),
    ("higher", 0.9),
    ("bullish", 2.2),
    ("upbeat", 1.9),
    ("buoyed", 1.5),
    ("shine", 1.8),
    ("shines", 1.8),
    ("glitter", 1.3),
    ("haven", 1.0),
    ("demand", 0.6),
    ("easing", 0.9),
    ("relief", 2.1),
    ("upgrade", 1.7),
    ("outperform", 1.8),
    ("outperforms", 1.8),
    ("opportunity", 1.8),
    ("growth", 1.6),
    ("grow", 1.5),
    ("grows", 1.4),
    ("resilient", 1.6),
    ("robust", 1.5),
    ("attractive", 1.9),
    ("welcome", 2.0),
    ("calm", 1.3),
    // general negative
    ("bad", -2.5),
    ("worse", -2.1),
    ("worst", -3.1),
    ("negative", -2.7),
    ("pessimistic", -1.5),
    ("pessimism", -2.0),
    ("fear", -2.2),
    ("fears", -1.8),
    ("worry", -1.9),
    ("worries", -2.1),
    ("worried", -1.2),
    ("concern", -1.0),
    ("concerns", -1.2),
    ("anxiety", -0.7),
    ("uncertain", -1.2),
    ("uncertainty", -1.4),
    ("risk", -1.1),
    ("risks", -1.1),
    ("risky", -0.8),
    ("weak", -1.9),
    ("weaker", -1.9),
    ("weakness", -1.8),
    ("loss", -1.3),
    ("losses", -1.7),
    ("lose", -1.7),
    ("loses", -1.3),
    ("lost", -1.3),
    ("fall", -1.1),
    ("falls", -1.1),
    ("fell", -1.1),
    ("falling", -1.1),
    ("drop", -1.1),
    ("drops", -1.1),
    ("dropped", -1.1),
    ("decline", -1.3),
    ("declines", -1.3),
    ("declined", -1.3),
    ("slip", -0.8),
    ("slips", -0.8),
    ("slide", -1.0),
    ("slides", -1.0),
    ("slump", -1.6),
    ("slumps", -1.6),
    ("tumble", -1.6),
    ("tumbles", -1.6),
    ("plunge", -2.1),
    ("plunges", -2.1),
    ("plunged", -2.1),
    ("sink", -1.3),
    ("sinks", -1.3),
    ("crash", -1.7),
    ("crashes", -1.7),
    ("collapse", -2.2),
    ("down", -0.6),
    ("low", -1.1),
    ("lower", -1.2),
    ("bearish", -2.0),
    ("selloff", -1.5),
    ("pressure", -1.2),
    ("pressured", -1.2),
    ("crisis", -3.1),
    ("recession", -2.2),
    ("inflation", -0.8),
    ("volatile", -1.1),
    ("volatility", -0.9),
    ("turmoil", -2.3),
    ("panic", -2.3),
    ("threat", -2.4),
    ("threats", -1.8),
    ("war", -2.9),
    ("conflict", -1.3),
    ("tension", -1.3),
    ("tensions", -1.3),
    ("sanctions", -1.0),
    ("warning", -1.4),
    ("warns", -0.4),
    ("problem", -1.7),
    ("problems", -1.7),
    ("trouble", -1.7),
    ("fail", -2.5),
    ("fails", -1.8),
    ("failed", -2.3),
    ("hurt", -2.4),
    ("hurts", -2.1),
    ("hit", -0.4),
    ("hits", -0.4),
    ("cut", -1.1),
    ("cuts", -0.6),
    ("downgrade", -1.5),
    ("default", -1.3),
    ("disappointing", -2.2),
    ("disappoints", -1.6),
    ("mixed", -0.2),
    ("struggle", -1.5),
    ("struggles", -1.5),
    ("stall", -0.8),
    ("stalls", -0.8),
];

const BOOSTERS: &[(&str, f64)] = &[
    ("absolutely", BOOST_INCR),
    ("completely", BOOST_INCR),
    ("considerably", BOOST_INCR),
    ("deeply", BOOST_INCR),
    ("enormously", BOOST_INCR),
    ("extremely", BOOST_INCR),
    ("greatly", BOOST_INCR),
    ("highly", BOOST_INCR),
    ("hugely", BOOST_INCR),
    ("incredibly", BOOST_INCR),
    ("majorly", BOOST_INCR),
    ("more", BOOST_INCR),
    ("most", BOOST_INCR),
    ("particularly", BOOST_INCR),
    ("really", BOOST_INCR),
    ("sharply", BOOST_INCR),
    ("significantly", BOOST_INCR),
    ("so", BOOST_INCR),
    ("strongly", BOOST_INCR),
    ("substantially", BOOST_INCR),
    ("totally", BOOST_INCR),
    ("very", BOOST_INCR),
    ("almost", BOOST_DECR),
    ("barely", BOOST_DECR),
    ("hardly", BOOST_DECR),
    ("less", BOOST_DECR),
    ("little", BOOST_DECR),
    ("marginally", BOOST_DECR),
    ("modestly", BOOST_DECR),
    ("partly", BOOST_DECR),
    ("slightly", BOOST_DECR),
    ("somewhat", BOOST_DECR),
];

const NEGATIONS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "didnt", "doesnt", "dont", "hadnt", "hasnt",
    "havent", "isnt", "neither", "never", "no", "nobody", "none", "nor", "not", "nothing",
    "nowhere", "shouldnt", "wasnt", "werent", "without", "wont", "wouldnt",
];

/// Word valences, boosters and negations used by the analyzer.
#[derive(Debug, Clone)]
pub struct Lexicon {
    valences: HashMap<&'static str, f64>,
    boosters: HashMap<&'static str, f64>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexicon {
    pub fn new() -> Self {
        Self {
            valences: VALENCES.iter().copied().collect(),
            boosters: BOOSTERS.iter().copied().collect(),
        }
    }

    /// Valence of a lower-cased token.
    pub fn valence(&self, word: &str) -> Option<f64> {
        self.valences.get(word).copied()
    }

    /// Booster scalar of a lower-cased token.
    pub fn booster(&self, word: &str) -> Option<f64> {
        self.boosters.get(word).copied()
    }

    /// Whether a lower-cased token negates what follows. Apostrophes are
    /// stripped so "don't" and "dont" both match, as does any "n't" form.
    pub fn is_negation(&self, word: &str) -> bool {
        let bare: String = word.chars().filter(|c| *c != '\'').collect();
        NEGATIONS.contains(&bare.as_str()) || word.ends_with("n't")
    }

    pub fn len(&self) -> usize {
        self.valences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let lexicon = Lexicon::new();
        assert!(lexicon.valence("rallies").unwrap() > 0.0);
        assert!(lexicon.valence("plunges").unwrap() < 0.0);
        assert!(lexicon.valence("gold").is_none());
        assert_eq!(lexicon.booster("very"), Some(BOOST_INCR));
        assert_eq!(lexicon.booster("slightly"), Some(BOOST_DECR));
    }

    #[test]
    fn test_negations() {
        let lexicon = Lexicon::new();
        assert!(lexicon.is_negation("not"));
        assert!(lexicon.is_negation("don't"));
        assert!(lexicon.is_negation("hasn't"));
        assert!(!lexicon.is_negation("gold"));
    }

    #[test]
    fn test_valences_in_range() {
        for (word, v) in VALENCES {
            assert!((-4.0..=4.0).contains(v), "{} out of range", word);
        }
    }
}
