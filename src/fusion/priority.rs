//! Label → priority tier mapping.
//!
//! [`PriorityMapper`] scans a classifier label for tier keywords.  The label
//! is lowercased and split into words on anything non-alphanumeric; a
//! keyword matches only as a whole word or a run of consecutive words, so
//! "hum" never fires on "Human voice" nor "rain" on "Train".  Tiers are
//! checked from most to least severe, so a label matching several tiers gets
//! the most severe one.  Anything unmatched is `normal`.

use serde::{Deserialize, Serialize};

use crate::config::FusionConfig;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Urgency of an alert.  `Ord` follows severity: `Low < Normal < Important <
/// Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    Important,
    Critical,
}

impl Priority {
    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::Important => "important",
            Priority::Critical => "critical",
        }
    }
}

// ---------------------------------------------------------------------------
// Static tier definitions
// ---------------------------------------------------------------------------

struct TierKeywords {
    priority: Priority,
    keywords: &'static [&'static str],
}

/// Most severe first.  Word variants are listed explicitly; there is no
/// stemming.
static TIERS: &[TierKeywords] = &[
    TierKeywords {
        priority: Priority::Critical,
        keywords: &[
            "alarm",
            "alarms",
            "siren",
            "sirens",
            "glass",
            "shatter",
            "gunshot",
            "gunfire",
            "explosion",
            "smoke detector",
            "car horn",
            "vehicle horn",
            "train horn",
            "air horn",
            "truck horn",
            "foghorn",
            "honking",
            "scream",
            "screaming",
            "fire",
        ],
    },
    TierKeywords {
        priority: Priority::Important,
        keywords: &[
            "doorbell",
            "door bell",
            "ding dong",
            "phone",
            "telephone",
            "ringtone",
            "ring",
            "ringing",
            "baby",
            "infant",
            "cry",
            "crying",
            "knock",
            "knocking",
            "name",
        ],
    },
    TierKeywords {
        priority: Priority::Low,
        keywords: &[
            "bird", "birds", "chirp", "chirping", "tweet", "rain", "raindrop", "wind", "ambient",
            "nature", "music", "hum", "fan", "water", "stream",
        ],
    },
];

/// Lowercased words of `label`, split on anything that is not alphanumeric.
fn words(label: &str) -> Vec<String> {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `true` when `phrase` (already lowercase, space separated) appears in
/// `words` as a run of consecutive whole words.
fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words
        .windows(needle.len())
        .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
}

fn tier_for_words(words: &[String]) -> Priority {
    TIERS
        .iter()
        .find(|tier| tier.keywords.iter().any(|kw| contains_phrase(words, kw)))
        .map(|tier| tier.priority)
        .unwrap_or(Priority::Normal)
}

/// Tier from the built-in keyword table alone.
///
/// ```
/// use sound_compass::fusion::{priority_for_label, Priority};
///
/// assert_eq!(priority_for_label("Car horn"), Priority::Critical);
/// assert_eq!(priority_for_label("bird chirping"), Priority::Low);
/// assert_eq!(priority_for_label("Footsteps"), Priority::Normal);
/// assert_eq!(priority_for_label("Human voice"), Priority::Normal);
/// ```
pub fn priority_for_label(label: &str) -> Priority {
    tier_for_words(&words(label))
}

// ---------------------------------------------------------------------------
// PriorityMapper
// ---------------------------------------------------------------------------

/// Keyword table plus the user's `important_sounds` list, which raises a
/// matching label to at least [`Priority::Important`].
#[derive(Debug, Clone, Default)]
pub struct PriorityMapper {
    /// Lowercased words joined by single spaces; `_` counts as a separator.
    important_sounds: Vec<String>,
}

impl PriorityMapper {
    pub fn new(important_sounds: &[String]) -> Self {
        Self {
            important_sounds: important_sounds
                .iter()
                .map(|s| words(s).join(" "))
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(&config.important_sounds)
    }

    pub fn priority(&self, label: &str) -> Priority {
        let words = words(label);
        let base = tier_for_words(&words);
        if self.important_sounds.iter().any(|s| contains_phrase(&words, s)) {
            base.max(Priority::Important)
        } else {
            base
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn car_horn_is_critical() {
        assert_eq!(priority_for_label("car horn"), Priority::Critical);
    }

    #[test]
    fn bird_chirping_is_low() {
        assert_eq!(priority_for_label("bird chirping"), Priority::Low);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(priority_for_label("FIRE ALARM"), Priority::Critical);
        assert_eq!(priority_for_label("Doorbell"), Priority::Important);
        assert_eq!(priority_for_label("Baby crying"), Priority::Important);
    }

    #[test]
    fn highest_tier_wins() {
        // "phone" is important, "alarm" critical.
        assert_eq!(priority_for_label("phone alarm"), Priority::Critical);
        // "rain" is low, "siren" critical.
        assert_eq!(priority_for_label("siren in the rain"), Priority::Critical);
        // "knock" is important, "wind" low.
        assert_eq!(priority_for_label("knock on wind chime"), Priority::Important);
    }

    #[test]
    fn unmatched_is_normal() {
        assert_eq!(priority_for_label("footsteps"), Priority::Normal);
        assert_eq!(priority_for_label("unknown"), Priority::Normal);
        assert_eq!(priority_for_label(""), Priority::Normal);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        assert_eq!(priority_for_label("Human voice"), Priority::Normal);
        assert_eq!(priority_for_label("Humming"), Priority::Normal);
        assert_eq!(priority_for_label("Purring"), Priority::Normal);
        assert_eq!(priority_for_label("Bowed string instrument"), Priority::Normal);
        assert_eq!(priority_for_label("Train"), Priority::Normal);
        assert_eq!(priority_for_label("French horn"), Priority::Normal);
        assert_eq!(priority_for_label("Pouring water"), Priority::Low);
        assert_eq!(priority_for_label("Train horn"), Priority::Critical);
        assert_eq!(priority_for_label("Hum"), Priority::Low);
    }

    #[test]
    fn punctuated_labels_split_into_words() {
        assert_eq!(
            priority_for_label("Vehicle horn, car horn, honking"),
            Priority::Critical
        );
        assert_eq!(priority_for_label("Baby cry, infant cry"), Priority::Important);
        assert_eq!(priority_for_label("Telephone bell ringing"), Priority::Important);
        assert_eq!(priority_for_label("Smoke detector, smoke alarm"), Priority::Critical);
    }

    #[test]
    fn mapping_is_deterministic() {
        for label in ["Car horn", "Dog barking", "Glass breaking", "Music"] {
            assert_eq!(priority_for_label(label), priority_for_label(label));
        }
    }

    #[test]
    fn preference_promotes_but_never_demotes() {
        let mapper = PriorityMapper::new(&["dog".to_string(), "siren".to_string()]);
        assert_eq!(mapper.priority("Dog barking"), Priority::Important);
        assert_eq!(mapper.priority("Police siren"), Priority::Critical);
        assert_eq!(mapper.priority("Footsteps"), Priority::Normal);
    }

    #[test]
    fn preference_underscores_match_spaces() {
        let mapper = PriorityMapper::from_config(&FusionConfig {
            important_sounds: vec!["microwave_beep".into()],
            ..FusionConfig::default()
        });
        assert_eq!(mapper.priority("Microwave beep"), Priority::Important);
        assert_eq!(mapper.priority("Microwave"), Priority::Normal);
    }

    #[test]
    fn preference_matches_whole_words() {
        let mapper = PriorityMapper::new(&["cat".to_string()]);
        assert_eq!(mapper.priority("Cat meowing"), Priority::Important);
        assert_eq!(mapper.priority("Caterpillar tractor"), Priority::Normal);
    }

    #[test]
    fn severity_ordering() {
        assert!(Priority::Critical > Priority::Important);
        assert!(Priority::Important > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(serde_json::to_string(&Priority::Critical).unwrap(), "\"critical\"");
    }
}
