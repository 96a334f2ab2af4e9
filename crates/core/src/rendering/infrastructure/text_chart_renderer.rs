use std::io::Write;

use crate::rendering::domain::chart::{ChartKind, ChartRenderer, EmotionChart};

const DEFAULT_BAR_WIDTH: usize = 30;

/// Renders charts as plain text.
///
/// The doughnut view becomes a legend (`label: 72.5%`), the bar view a row of
/// block characters per emotion scaled to `bar_width` columns.
pub struct TextChartRenderer<W: Write + Send> {
    out: W,
    bar_width: usize,
}

impl<W: Write + Send> TextChartRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }

    pub fn with_bar_width(mut self, bar_width: usize) -> Self {
        self.bar_width = bar_width.max(1);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn label_width(chart: &EmotionChart) -> usize {
        chart
            .entries
            .iter()
            .map(|e| e.label.chars().count())
            .max()
            .unwrap_or(0)
    }
}

impl<W: Write + Send> ChartRenderer for TextChartRenderer<W> {
    fn draw(
        &mut self,
        surface_id: &str,
        chart: &EmotionChart,
        kind: ChartKind,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let pad = Self::label_width(chart);
        match kind {
            ChartKind::Doughnut => {
                writeln!(self.out, "  [{surface_id}] distribution")?;
                for entry in &chart.entries {
                    writeln!(
                        self.out,
                        "    {:<pad$}: {:>5}%  {}",
                        entry.label, entry.percent, entry.color
                    )?;
                }
            }
            ChartKind::Bar => {
                writeln!(self.out, "  [{surface_id}] confidence (%)")?;
                for entry in &chart.entries {
                    let filled = (entry.score.clamp(0.0, 1.0) * self.bar_width as f64).round()
                        as usize;
                    let bar = format!(
                        "{}{}",
                        "█".repeat(filled),
                        "·".repeat(self.bar_width - filled)
                    );
                    writeln!(
                        self.out,
                        "    {:<pad$} {bar} {:>5}",
                        entry.label, entry.percent
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection_result::{EmotionScore, FaceBox, FaceResult};

    fn chart() -> EmotionChart {
        EmotionChart::from_face(&FaceResult {
            face_box: FaceBox::new(0, 0, 1, 1),
            dominant_emotion: "happy".into(),
            emotions: vec![
                EmotionScore {
                    emotion: "happy".into(),
                    score: 0.75,
                },
                EmotionScore {
                    emotion: "neutral".into(),
                    score: 0.25,
                },
            ],
        })
    }

    fn render(kind: ChartKind) -> String {
        let mut renderer = TextChartRenderer::new(Vec::new()).with_bar_width(4);
        renderer.draw("emotion-chart-0", &chart(), kind).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_doughnut_lists_percentages_in_order() {
        let text = render(ChartKind::Doughnut);
        let happy = text.find("happy  :  75.0%").unwrap();
        let neutral = text.find("neutral:  25.0%").unwrap();
        assert!(happy < neutral);
        assert!(text.starts_with("  [emotion-chart-0]"));
        assert!(text.contains("rgba(255, 193, 7, 0.8)"));
    }

    #[test]
    fn test_bar_scales_to_width() {
        let text = render(ChartKind::Bar);
        assert!(text.contains("happy   ███·  75.0"));
        assert!(text.contains("neutral █···  25.0"));
    }
}
