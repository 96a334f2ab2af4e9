use crate::detection::domain::detection_result::EmotionScore;

/// Fixed order used to break ties between equally scored emotions.
pub const KNOWN_EMOTIONS: [&str; 7] = [
    "happy", "sad", "angry", "surprise", "fear", "disgust", "neutral",
];

/// Position of `label` in [`KNOWN_EMOTIONS`]; unknown labels rank last.
pub fn tie_break_rank(label: &str) -> usize {
    KNOWN_EMOTIONS
        .iter()
        .position(|known| known.eq_ignore_ascii_case(label))
        .unwrap_or(KNOWN_EMOTIONS.len())
}

/// Picks the highest-scoring entry.
///
/// Ties go to the emotion that comes first in [`KNOWN_EMOTIONS`]; ties
/// between unknown labels go to the one listed first.
pub fn dominant_emotion(scores: &[EmotionScore]) -> Option<&EmotionScore> {
    let mut best: Option<&EmotionScore> = None;
    for candidate in scores {
        best = match best {
            None => Some(candidate),
            Some(current) if candidate.score > current.score => Some(candidate),
            Some(current)
                if candidate.score == current.score
                    && tie_break_rank(&candidate.emotion) < tie_break_rank(&current.emotion) =>
            {
                Some(candidate)
            }
            keep => keep,
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scores(pairs: &[(&str, f64)]) -> Vec<EmotionScore> {
        pairs
            .iter()
            .map(|(emotion, score)| EmotionScore {
                emotion: emotion.to_string(),
                score: *score,
            })
            .collect()
    }

    #[test]
    fn test_highest_score_wins() {
        let s = scores(&[("sad", 0.2), ("happy", 0.7), ("neutral", 0.1)]);
        assert_eq!(dominant_emotion(&s).unwrap().emotion, "happy");
    }

    #[rstest]
    #[case(&[("neutral", 0.4), ("sad", 0.4)], "sad")]
    #[case(&[("fear", 0.5), ("angry", 0.5), ("disgust", 0.5)], "angry")]
    #[case(&[("bored", 0.3), ("surprise", 0.3)], "surprise")]
    #[case(&[("bored", 0.3), ("confused", 0.3)], "bored")]
    fn test_ties_follow_fixed_order(#[case] pairs: &[(&str, f64)], #[case] expected: &str) {
        let s = scores(pairs);
        assert_eq!(dominant_emotion(&s).unwrap().emotion, expected);
    }

    #[test]
    fn test_empty_has_no_dominant() {
        assert!(dominant_emotion(&[]).is_none());
    }

    #[test]
    fn test_rank_is_case_insensitive() {
        assert_eq!(tie_break_rank("Happy"), 0);
        assert_eq!(tie_break_rank("contempt"), KNOWN_EMOTIONS.len());
    }
}
