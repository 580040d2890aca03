//! FaceMesh 关键点帧与几何基础
//!
//! 捕获页每个动画帧 POST 一组 MediaPipe FaceMesh 关键点（归一化 [0,1]
//! 图像坐标）。本模块定义帧类型、语义索引约定和二维距离计算；
//! 指标提取只读取帧，不做任何修改。

use serde::Deserialize;

/// Minimum number of mesh points for a usable frame. MediaPipe FaceMesh
/// emits 468 points (478 with refined iris landmarks); every index below
/// is within the base 468.
pub const MESH_POINT_COUNT: usize = 468;

/// 6-point eye scheme, p1..p6: (corner, upper, upper, corner, lower, lower).
/// EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|).
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Mouth corners (horizontal reference).
pub const MOUTH_CORNERS: (usize, usize) = (61, 291);
/// Upper/lower lip pairs, outer to outer.
pub const MOUTH_PAIRS: [(usize, usize); 3] = [(81, 178), (13, 14), (311, 402)];

/// Brow mid-point paired with the upper eyelid below it.
pub const LEFT_BROW: (usize, usize) = (105, 159);
pub const RIGHT_BROW: (usize, usize) = (334, 386);

/// Inter-ocular outer-corner span, the face-scale reference for the brow
/// metric.
pub const FACE_SCALE: (usize, usize) = (33, 263);

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Depth is carried by the mesh but unused by the planar metrics.
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn distance(&self, other: &Landmark) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn vertical_distance(&self, other: &Landmark) -> f64 {
        (self.y - other.y).abs()
    }
}

/// One captured landmark frame. Owned by the caller for the duration of a
/// tick; the detector only reads it.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    points: Vec<Landmark>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A frame with fewer points than the mesh topology cannot satisfy the
    /// index contract and is treated as "no signal".
    pub fn is_complete(&self) -> bool {
        self.points.len() >= MESH_POINT_COUNT
    }

    pub fn point(&self, index: usize) -> Landmark {
        self.points[index]
    }
}
