use std::fmt;

use crate::detection::domain::detection_result::FaceResult;

/// Fill colour of one chart slice or bar, as RGBA with alpha in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChartColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl ChartColor {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Colour assigned to an emotion label; unlisted labels get cyan.
    pub fn for_emotion(label: &str) -> Self {
        match label {
            "happy" => Self::new(255, 193, 7, 0.8),
            "sad" => Self::new(13, 110, 253, 0.8),
            "angry" => Self::new(220, 53, 69, 0.8),
            "surprise" => Self::new(111, 66, 193, 0.8),
            "fear" => Self::new(108, 117, 125, 0.8),
            "disgust" => Self::new(25, 135, 84, 0.8),
            "neutral" => Self::new(173, 181, 189, 0.8),
            _ => Self::new(23, 162, 184, 0.8),
        }
    }
}

impl fmt::Display for ChartColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartEntry {
    pub label: String,
    pub score: f64,
    /// `score × 100` with one decimal place, e.g. `"72.5"`.
    pub percent: String,
    pub color: ChartColor,
}

/// Chart data for one face: its emotion scores in server order.
#[derive(Clone, Debug, PartialEq)]
pub struct EmotionChart {
    pub entries: Vec<ChartEntry>,
    pub dominant_emotion: String,
}

impl EmotionChart {
    pub fn from_face(face: &FaceResult) -> Self {
        let entries = face
            .emotions
            .iter()
            .map(|e| ChartEntry {
                label: e.emotion.clone(),
                score: e.score,
                percent: format_percent(e.score),
                color: ChartColor::for_emotion(&e.emotion),
            })
            .collect();
        Self {
            entries,
            dominant_emotion: face.dominant_emotion.clone(),
        }
    }
}

pub fn format_percent(score: f64) -> String {
    format!("{:.1}", score * 100.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Doughnut,
    Bar,
}

impl ChartKind {
    /// Surface identifier for the chart of face `index` (zero-based).
    pub fn surface_id(&self, index: usize) -> String {
        match self {
            Self::Doughnut => format!("emotion-chart-{index}"),
            Self::Bar => format!("emotion-bar-{index}"),
        }
    }
}

/// Draws one chart onto a named surface.
pub trait ChartRenderer: Send {
    fn draw(
        &mut self,
        surface_id: &str,
        chart: &EmotionChart,
        kind: ChartKind,
    ) -> Result<(), Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_result::{EmotionScore, FaceBox};
    use rstest::rstest;

    fn face() -> FaceResult {
        FaceResult {
            face_box: FaceBox::new(0, 0, 10, 10),
            dominant_emotion: "happy".into(),
            emotions: vec![
                EmotionScore {
                    emotion: "happy".into(),
                    score: 0.725,
                },
                EmotionScore {
                    emotion: "contempt".into(),
                    score: 0.2,
                },
                EmotionScore {
                    emotion: "sad".into(),
                    score: 0.075,
                },
            ],
        }
    }

    #[test]
    fn test_entries_keep_server_order() {
        let chart = EmotionChart::from_face(&face());
        let labels: Vec<_> = chart.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["happy", "contempt", "sad"]);
        assert_eq!(chart.dominant_emotion, "happy");
    }

    #[test]
    fn test_unknown_label_falls_back_to_cyan() {
        let chart = EmotionChart::from_face(&face());
        assert_eq!(chart.entries[1].color, ChartColor::new(23, 162, 184, 0.8));
        assert_eq!(chart.entries[0].color, ChartColor::new(255, 193, 7, 0.8));
    }

    #[rstest]
    #[case(0.0, "0.0")]
    #[case(1.0, "100.0")]
    #[case(0.1234, "12.3")]
    #[case(0.5, "50.0")]
    fn test_format_percent(#[case] score: f64, #[case] expected: &str) {
        assert_eq!(format_percent(score), expected);
    }

    #[test]
    fn test_surface_ids() {
        assert_eq!(ChartKind::Doughnut.surface_id(0), "emotion-chart-0");
        assert_eq!(ChartKind::Bar.surface_id(2), "emotion-bar-2");
    }

    #[test]
    fn test_color_display() {
        assert_eq!(
            ChartColor::for_emotion("sad").to_string(),
            "rgba(13, 110, 253, 0.8)"
        );
    }
}
