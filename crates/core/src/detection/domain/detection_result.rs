/// Face bounding box in the pixel space of the submitted image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmotionScore {
    pub emotion: String,
    /// Confidence in `[0, 1]`.
    pub score: f64,
}

/// Detection output for one face. Emotions keep the order the service
/// returned them in.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceResult {
    pub face_box: FaceBox,
    pub dominant_emotion: String,
    pub emotions: Vec<EmotionScore>,
}

impl FaceResult {
    pub fn score_of(&self, emotion: &str) -> Option<f64> {
        self.emotions
            .iter()
            .find(|e| e.emotion == emotion)
            .map(|e| e.score)
    }
}

/// All faces found in one submitted image, possibly none.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    faces: Vec<FaceResult>,
}

impl DetectionResult {
    pub fn new(faces: Vec<FaceResult>) -> Self {
        Self { faces }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn faces(&self) -> &[FaceResult] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

impl IntoIterator for DetectionResult {
    type Item = FaceResult;
    type IntoIter = std::vec::IntoIter<FaceResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.faces.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_edges() {
        let b = FaceBox::new(10, -5, 30, 20);
        assert_eq!(b.right(), 40);
        assert_eq!(b.bottom(), 15);
    }

    #[test]
    fn test_score_lookup() {
        let face = FaceResult {
            face_box: FaceBox::new(0, 0, 1, 1),
            dominant_emotion: "happy".into(),
            emotions: vec![EmotionScore {
                emotion: "happy".into(),
                score: 0.9,
            }],
        };
        assert_eq!(face.score_of("happy"), Some(0.9));
        assert_eq!(face.score_of("sad"), None);
    }

    #[test]
    fn test_empty_result() {
        let result = DetectionResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
        assert_eq!(result.into_iter().count(), 0);
    }
}
