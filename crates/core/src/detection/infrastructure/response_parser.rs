use serde::Deserialize;
use serde_json::Value;

use crate::detection::domain::detection_result::{
    DetectionResult, EmotionScore, FaceBox, FaceResult,
};
use crate::detection::domain::detection_service::DetectionError;
use crate::detection::domain::emotion::dominant_emotion;

const DEFAULT_SERVICE_ERROR: &str = "An error occurred during emotion detection";
const SCORE_EPSILON: f64 = 1e-9;
/// No payload is anywhere near this large, so box values past it are garbage.
const MAX_BOX_COORDINATE: f64 = 100_000.0;

#[derive(Deserialize)]
struct WireFace {
    #[serde(rename = "box")]
    face_box: Vec<f64>,
    dominant_emotion: String,
    emotions: Vec<WireEmotion>,
}

#[derive(Deserialize)]
struct WireEmotion {
    emotion: String,
    score: f64,
}

/// Parses and validates a detection endpoint response.
///
/// `{success: true}` without `results` (or with `null`) is an empty result.
/// A non-2xx status is a service error unless the body carries its own
/// `success: false` message, which then takes precedence.
pub fn parse_response(status: u16, body: &str) -> Result<DetectionResult, DetectionError> {
    let ok_status = (200..300).contains(&status);

    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) if !ok_status => {
            return Err(DetectionError::Service(format!(
                "endpoint returned HTTP {status}"
            )))
        }
        Err(e) => {
            return Err(DetectionError::MalformedResponse(format!(
                "response is not JSON: {e}"
            )))
        }
    };

    let success = json.get("success").and_then(Value::as_bool);
    match success {
        Some(false) => {
            let message = json
                .get("error")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_SERVICE_ERROR);
            return Err(DetectionError::Service(message.to_string()));
        }
        _ if !ok_status => {
            return Err(DetectionError::Service(format!(
                "endpoint returned HTTP {status}"
            )))
        }
        None => {
            return Err(DetectionError::MalformedResponse(
                "missing boolean `success` field".into(),
            ))
        }
        Some(true) => {}
    }

    let faces = match json.get("results") {
        None | Some(Value::Null) => return Ok(DetectionResult::empty()),
        Some(results) => Vec::<WireFace>::deserialize(results)
            .map_err(|e| DetectionError::MalformedResponse(format!("invalid `results`: {e}")))?,
    };

    faces
        .into_iter()
        .enumerate()
        .map(|(i, face)| validate_face(i, face))
        .collect::<Result<Vec<_>, _>>()
        .map(DetectionResult::new)
}

fn validate_face(index: usize, face: WireFace) -> Result<FaceResult, DetectionError> {
    let malformed = |msg: String| DetectionError::MalformedResponse(format!("face {index}: {msg}"));

    let &[x, y, w, h] = face.face_box.as_slice() else {
        return Err(malformed(format!(
            "box must have 4 values, got {}",
            face.face_box.len()
        )));
    };
    if [x, y, w, h].iter().any(|v| !v.is_finite()) {
        return Err(malformed("box values must be finite".into()));
    }
    if w < 0.0 || h < 0.0 {
        return Err(malformed(format!("box size must be non-negative, got {w}x{h}")));
    }
    if [x, y, w, h].iter().any(|v| v.abs() > MAX_BOX_COORDINATE) {
        return Err(malformed(format!(
            "box [{x}, {y}, {w}, {h}] is outside the pixel range"
        )));
    }

    if face.emotions.is_empty() {
        return Err(malformed("no emotion scores".into()));
    }
    let mut emotions = Vec::with_capacity(face.emotions.len());
    for wire in face.emotions {
        if wire.emotion.is_empty() {
            return Err(malformed("empty emotion label".into()));
        }
        if !(0.0..=1.0).contains(&wire.score) {
            return Err(malformed(format!(
                "score for {} out of range: {}",
                wire.emotion, wire.score
            )));
        }
        emotions.push(EmotionScore {
            emotion: wire.emotion,
            score: wire.score,
        });
    }

    if face.dominant_emotion.is_empty() {
        return Err(malformed("empty dominant emotion".into()));
    }
    let max_score = dominant_emotion(&emotions).map(|e| e.score).unwrap_or(0.0);
    let claimed = emotions
        .iter()
        .find(|e| e.emotion == face.dominant_emotion)
        .ok_or_else(|| {
            malformed(format!(
                "dominant emotion {} has no score",
                face.dominant_emotion
            ))
        })?;
    if claimed.score + SCORE_EPSILON < max_score {
        return Err(malformed(format!(
            "dominant emotion {} ({}) is not the highest score ({max_score})",
            face.dominant_emotion, claimed.score
        )));
    }

    Ok(FaceResult {
        face_box: FaceBox::new(
            x.round() as i32,
            y.round() as i32,
            w.round() as u32,
            h.round() as u32,
        ),
        dominant_emotion: face.dominant_emotion,
        emotions,
    })
}
