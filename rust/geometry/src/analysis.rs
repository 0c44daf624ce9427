// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh analysis: enclosed volume, bounding box extents and watertightness

use crate::Mesh;
use rustc_hash::FxHashMap;

/// Warning shown when a mesh is not a closed manifold
pub const NON_MANIFOLD_WARNING: &str = "⚠️ Non-Manifold Mesh";

/// Derived properties of a mesh, in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisResult {
    /// Enclosed volume (mm³), always non-negative
    pub volume: f64,
    /// Bounding box size along x, y, z (mm)
    pub extents: [f64; 3],
    pub watertight: bool,
}

impl AnalysisResult {
    pub fn volume_cm3(&self) -> f64 {
        self.volume / 1000.0
    }

    /// `12.3 cm³`
    pub fn volume_label(&self) -> String {
        format!("{:.1} cm³", self.volume_cm3())
    }

    /// `10x20x5 mm`
    pub fn bounding_box_label(&self) -> String {
        format!(
            "{:.0}x{:.0}x{:.0} mm",
            self.extents[0], self.extents[1], self.extents[2]
        )
    }

    /// Warning text for meshes that are not watertight
    pub fn warning(&self) -> Option<&'static str> {
        if self.watertight {
            None
        } else {
            Some(NON_MANIFOLD_WARNING)
        }
    }
}

/// Analyze a mesh
pub fn analyze(mesh: &Mesh) -> AnalysisResult {
    let extents = match mesh.bounds() {
        Some((min, max)) => [max.x - min.x, max.y - min.y, max.z - min.z],
        None => [0.0; 3],
    };

    let result = AnalysisResult {
        volume: signed_volume(mesh).abs(),
        extents,
        watertight: is_watertight(mesh),
    };

    tracing::debug!(
        volume = result.volume,
        watertight = result.watertight,
        "mesh analyzed"
    );
    result
}

/// Sum of signed tetrahedron volumes against the origin (mm³)
///
/// Positive for closed meshes whose triangles face outward.
pub fn signed_volume(mesh: &Mesh) -> f64 {
    (0..mesh.triangle_count())
        .map(|i| {
            let [a, b, c] = mesh.triangle(i);
            a.coords.dot(&b.coords.cross(&c.coords))
        })
        .sum::<f64>()
        / 6.0
}

/// Every undirected edge is shared by exactly two triangles that traverse it
/// in opposite directions. Empty meshes are not watertight.
pub fn is_watertight(mesh: &Mesh) -> bool {
    if mesh.faces.is_empty() {
        return false;
    }

    // (uses, uses running from the lower to the higher index)
    let mut edges: FxHashMap<(u32, u32), (u32, u32)> =
        FxHashMap::with_capacity_and_hasher(mesh.faces.len() * 3 / 2, Default::default());

    for face in &mesh.faces {
        for k in 0..3 {
            let (a, b) = (face[k], face[(k + 1) % 3]);
            let key = if a < b { (a, b) } else { (b, a) };
            let entry = edges.entry(key).or_insert((0, 0));
            entry.0 += 1;
            if a < b {
                entry.1 += 1;
            }
        }
    }

    edges.values().all(|&(uses, forward)| uses == 2 && forward == 1)
}
