//! 形状指标提取
//!
//! 单帧关键点 → 三个标量指标（EAR / MAR / BROW）的纯函数。
//! 无状态、无副作用；同一帧的提取结果是确定的。

use serde::Serialize;

use super::mesh::{
    Landmark, LandmarkFrame, FACE_SCALE, LEFT_BROW, LEFT_EYE, MOUTH_CORNERS, MOUTH_PAIRS,
    RIGHT_BROW, RIGHT_EYE,
};

/// Reference distances below this are degenerate landmark output, not a
/// face; the frame is discarded as "no signal".
const MIN_REFERENCE_SPAN: f64 = 1e-6;

/// The three scalar shape metrics for one frame.
///
/// - `ear`: eye aspect ratio, mean of both eyes. Smaller = more closed.
/// - `mar`: mouth aspect ratio. Larger = more open.
/// - `brow`: brow-to-eyelid distance as a fraction of the inter-ocular
///   span. Larger = more raised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub ear: f64,
    pub mar: f64,
    pub brow: f64,
}

/// Map one landmark frame to its shape metrics.
///
/// `None` in (no face this tick), a short frame, or degenerate reference
/// geometry all yield `None` out; extraction never fails otherwise.
pub fn extract(frame: Option<&LandmarkFrame>) -> Option<Metrics> {
    let frame = frame?;
    if !frame.is_complete() {
        return None;
    }

    let ear_left = eye_aspect_ratio(frame, &LEFT_EYE)?;
    let ear_right = eye_aspect_ratio(frame, &RIGHT_EYE)?;
    let mar = mouth_aspect_ratio(frame)?;
    let brow = brow_raise_fraction(frame)?;

    Some(Metrics {
        ear: (ear_left + ear_right) / 2.0,
        mar,
        brow,
    })
}

/// Standard 6-point EAR: (|p2-p6| + |p3-p5|) / (2 * |p1-p4|).
fn eye_aspect_ratio(frame: &LandmarkFrame, eye: &[usize; 6]) -> Option<f64> {
    let p: Vec<Landmark> = eye.iter().map(|&i| frame.point(i)).collect();

    let horizontal = p[0].distance(&p[3]);
    if horizontal < MIN_REFERENCE_SPAN {
        return None;
    }

    let vertical = p[1].distance(&p[5]) + p[2].distance(&p[4]);
    Some(vertical / (2.0 * horizontal))
}

/// MAR over three lip pairs: (|v1| + |v2| + |v3|) / (2 * |corner span|).
fn mouth_aspect_ratio(frame: &LandmarkFrame) -> Option<f64> {
    let left = frame.point(MOUTH_CORNERS.0);
    let right = frame.point(MOUTH_CORNERS.1);

    let horizontal = left.distance(&right);
    if horizontal < MIN_REFERENCE_SPAN {
        return None;
    }

    let vertical: f64 = MOUTH_PAIRS
        .iter()
        .map(|&(upper, lower)| frame.point(upper).distance(&frame.point(lower)))
        .sum();

    Some(vertical / (2.0 * horizontal))
}

/// Mean brow-to-eyelid vertical distance over both sides, normalized by the
/// inter-ocular span so the fraction is invariant to face size and camera
/// distance.
fn brow_raise_fraction(frame: &LandmarkFrame) -> Option<f64> {
    let scale = frame
        .point(FACE_SCALE.0)
        .distance(&frame.point(FACE_SCALE.1));
    if scale < MIN_REFERENCE_SPAN {
        return None;
    }

    let left = frame
        .point(LEFT_BROW.0)
        .vertical_distance(&frame.point(LEFT_BROW.1));
    let right = frame
        .point(RIGHT_BROW.0)
        .vertical_distance(&frame.point(RIGHT_BROW.1));

    Some((left + right) / 2.0 / scale)
}
