use serde_json::{json, Value};

use gesture_backend::detector::mesh::{
    FACE_SCALE, LEFT_BROW, LEFT_EYE, MESH_POINT_COUNT, MOUTH_CORNERS, MOUTH_PAIRS, RIGHT_BROW,
    RIGHT_EYE,
};

/// Build a full synthetic mesh frame whose extracted metrics equal the
/// requested EAR / MAR / brow fraction exactly.
pub fn frame(ear: f64, mar: f64, brow: f64) -> Value {
    let mut pts = vec![(0.5_f64, 0.5_f64); MESH_POINT_COUNT];

    // Eyes: corners 0.10 apart, vertical pairs opened to ear * 0.10.
    for (eye, x0) in [(&LEFT_EYE, 0.30), (&RIGHT_EYE, 0.60)] {
        let half = ear * 0.10 / 2.0;
        pts[eye[0]] = (x0, 0.50);
        pts[eye[3]] = (x0 + 0.10, 0.50);
        pts[eye[1]] = (x0 + 0.03, 0.50 - half);
        pts[eye[5]] = (x0 + 0.03, 0.50 + half);
        pts[eye[2]] = (x0 + 0.07, 0.50 - half);
        pts[eye[4]] = (x0 + 0.07, 0.50 + half);
    }

    let scale = pts[FACE_SCALE.1].0 - pts[FACE_SCALE.0].0;

    // Mouth: corners 0.20 apart, three equal lip gaps.
    let gap = mar * 2.0 * 0.20 / 3.0;
    pts[MOUTH_CORNERS.0] = (0.40, 0.70);
    pts[MOUTH_CORNERS.1] = (0.60, 0.70);
    for (i, (upper, lower)) in MOUTH_PAIRS.into_iter().enumerate() {
        let x = 0.45 + 0.05 * i as f64;
        pts[upper] = (x, 0.70 - gap / 2.0);
        pts[lower] = (x, 0.70 + gap / 2.0);
    }

    // Brows: identical lift on both sides.
    let lift = brow * scale;
    for (brow_idx, lid_idx) in [LEFT_BROW, RIGHT_BROW] {
        pts[lid_idx] = (pts[lid_idx].0, 0.46);
        pts[brow_idx] = (pts[lid_idx].0, 0.46 - lift);
    }

    Value::Array(
        pts.into_iter()
            .map(|(x, y)| json!({"x": x, "y": y, "z": 0.0}))
            .collect(),
    )
}

/// Eyes open, mouth shut, brows relaxed under the default thresholds.
pub fn neutral_frame() -> Value {
    frame(0.30, 0.40, 0.02)
}

pub fn closed_eyes_frame() -> Value {
    frame(0.17, 0.40, 0.02)
}

pub fn open_mouth_frame() -> Value {
    frame(0.30, 0.70, 0.02)
}

pub fn raised_brows_frame() -> Value {
    frame(0.30, 0.40, 0.10)
}

/// The request body for one tick.
pub fn frame_body(landmarks: Value) -> Value {
    json!({ "landmarks": landmarks })
}

/// The "no face this tick" body.
pub fn no_face_body() -> Value {
    json!({ "landmarks": null })
}
