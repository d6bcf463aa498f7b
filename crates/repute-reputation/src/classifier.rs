// crates/repute-reputation/src/classifier.rs
//
// Keyword-lexicon sentiment classification for mention text.

use serde::{Deserialize, Serialize};

use repute_core::score::SentimentDistribution;
use repute_core::signal::SentimentSample;
use repute_core::traits::TextClassifier;

/// Coarse label for a sentiment value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

/// Keyword lists used by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentLexicon {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    /// Reporting words: they count toward confidence but not direction.
    pub neutral: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for SentimentLexicon {
    fn default() -> Self {
        Self {
            positive: words(&[
                "good", "great", "excellent", "amazing", "awesome", "brilliant", "fantastic",
                "love", "like", "admire", "respect", "support", "genius", "leader",
                "innovative", "visionary", "inspiring", "successful", "impressive",
            ]),
            negative: words(&[
                "bad", "terrible", "awful", "horrible", "hate", "dislike", "worst",
                "failure", "disaster", "corrupt", "liar", "fraud", "scam", "dangerous",
                "irresponsible", "incompetent", "disappointing", "wrong", "stupid",
            ]),
            neutral: words(&[
                "said", "mentioned", "announced", "stated", "reported", "according",
                "news", "today", "yesterday", "will", "should", "could", "might",
            ]),
        }
    }
}

/// Classifies text by counting lexicon hits.
///
/// sentiment = (positive - negative) / word_count, clamped to [-1, 1];
/// confidence = min(lexicon_hits / word_count, 1). Text with no words or no
/// lexicon hits classifies as (0.0, 0.0).
#[derive(Debug, Clone, Default)]
pub struct LexiconClassifier {
    lexicon: SentimentLexicon,
}

impl LexiconClassifier {
    /// Create a classifier with the default lexicon.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with a custom lexicon.
    pub fn with_lexicon(lexicon: SentimentLexicon) -> Self {
        Self { lexicon }
    }

    /// Map a sentiment value to a coarse label (±0.1 dead band).
    pub fn label(sentiment: f64) -> SentimentLabel {
        if sentiment > 0.1 {
            SentimentLabel::Positive
        } else if sentiment < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Label every sample and count the split.
    pub fn distribution(samples: &[SentimentSample]) -> SentimentDistribution {
        let mut dist = SentimentDistribution {
            total_mentions: samples.len(),
            ..Default::default()
        };
        for sample in samples {
            match Self::label(sample.sentiment) {
                SentimentLabel::Positive => dist.positive_mentions += 1,
                SentimentLabel::Negative => dist.negative_mentions += 1,
                SentimentLabel::Neutral => dist.neutral_mentions += 1,
            }
        }
        if dist.total_mentions > 0 {
            let pct = |count: usize| {
                (count as f64 / dist.total_mentions as f64 * 1000.0).round() / 10.0
            };
            dist.positive_pct = pct(dist.positive_mentions);
            dist.negative_pct = pct(dist.negative_mentions);
            dist.neutral_pct = pct(dist.neutral_mentions);
        }
        dist
    }
}

impl TextClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> (f64, f64) {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() {
            return (0.0, 0.0);
        }

        let (mut positive, mut negative, mut neutral) = (0usize, 0usize, 0usize);
        for token in &tokens {
            if self.lexicon.positive.iter().any(|w| w == token) {
                positive += 1;
            } else if self.lexicon.negative.iter().any(|w| w == token) {
                negative += 1;
            } else if self.lexicon.neutral.iter().any(|w| w == token) {
                neutral += 1;
            }
        }

        let hits = positive + negative + neutral;
        if hits == 0 {
            return (0.0, 0.0);
        }

        let n = tokens.len() as f64;
        let sentiment = ((positive as f64 - negative as f64) / n).clamp(-1.0, 1.0);
        let confidence = (hits as f64 / n).min(1.0);
        (sentiment, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_text_classified_positive() {
        let classifier = LexiconClassifier::new();
        let (sentiment, confidence) = classifier.classify("Great launch, truly brilliant!");
        // 4 words, 2 positive hits.
        assert!((sentiment - 0.5).abs() < 1e-12);
        assert!((confidence - 0.5).abs() < 1e-12);
        assert_eq!(LexiconClassifier::label(sentiment), SentimentLabel::Positive);
    }

    #[test]
    fn negative_text_classified_negative() {
        let classifier = LexiconClassifier::new();
        let (sentiment, _) = classifier.classify("a terrible, corrupt disaster");
        assert!(sentiment < -0.1);
        assert_eq!(LexiconClassifier::label(sentiment), SentimentLabel::Negative);
    }

    #[test]
    fn neutral_words_raise_confidence_only() {
        let classifier = LexiconClassifier::new();
        let (sentiment, confidence) = classifier.classify("He said it today");
        assert_eq!(sentiment, 0.0);
        assert!((confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_or_unknown_text_is_neutral_with_zero_confidence() {
        let classifier = LexiconClassifier::new();
        assert_eq!(classifier.classify(""), (0.0, 0.0));
        assert_eq!(classifier.classify("   ...  "), (0.0, 0.0));
        assert_eq!(classifier.classify("xyzzy plugh"), (0.0, 0.0));
    }

    #[test]
    fn custom_lexicon_is_used() {
        let classifier = LexiconClassifier::with_lexicon(SentimentLexicon {
            positive: vec!["rocket".to_string()],
            negative: vec![],
            neutral: vec![],
        });
        let (sentiment, confidence) = classifier.classify("rocket");
        assert_eq!((sentiment, confidence), (1.0, 1.0));
    }

    fn sample(sentiment: f64) -> SentimentSample {
        SentimentSample {
            timestamp: chrono::Utc::now(),
            subject: repute_core::subject::Subject::Trump,
            sentiment,
            confidence: 0.5,
            source_text: String::new(),
            source_type: "news".to_string(),
        }
    }

    #[test]
    fn distribution_counts_each_label() {
        let samples: Vec<SentimentSample> =
            [0.8, 0.3, -0.5, 0.05, 0.0, -0.1].into_iter().map(sample).collect();
        let dist = LexiconClassifier::distribution(&samples);
        assert_eq!(dist.total_mentions, 6);
        assert_eq!(dist.positive_mentions, 2);
        assert_eq!(dist.negative_mentions, 1);
        assert_eq!(dist.neutral_mentions, 3);
        assert_eq!(dist.positive_pct, 33.3);
        assert_eq!(dist.negative_pct, 16.7);
        assert_eq!(dist.neutral_pct, 50.0);
    }

    #[test]
    fn empty_distribution_is_all_zero() {
        assert_eq!(LexiconClassifier::distribution(&[]), SentimentDistribution::default());
    }

    #[test]
    fn label_dead_band() {
        assert_eq!(LexiconClassifier::label(0.1), SentimentLabel::Neutral);
        assert_eq!(LexiconClassifier::label(-0.1), SentimentLabel::Neutral);
    }
}
