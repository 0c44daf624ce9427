// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interactive 3D preview of a converted mesh

use crate::figure::{
    Axis, Figure, Layout, Margin, Marker, Mesh3d, Scatter3d, Scene, Trace, TRANSPARENT,
};
use curiosity_geometry::Mesh;

/// Meshes with fewer vertices also get a point overlay
pub const POINT_OVERLAY_LIMIT: usize = 5000;

pub const MODEL_COLOR: &str = "#66fcf1";
pub const MODEL_OPACITY: f64 = 0.30;
pub const POINT_COLOR: &str = "#ffffff";
pub const POINT_OPACITY: f64 = 0.3;

/// Translucent flat-shaded mesh, optional vertex markers, no axes
pub fn render_preview(mesh: &Mesh) -> Figure {
    let (x, y, z) = columns(mesh);
    let mut i = Vec::with_capacity(mesh.triangle_count());
    let mut j = Vec::with_capacity(mesh.triangle_count());
    let mut k = Vec::with_capacity(mesh.triangle_count());
    for [a, b, c] in &mesh.faces {
        i.push(*a);
        j.push(*b);
        k.push(*c);
    }

    let overlay = mesh.vertex_count() < POINT_OVERLAY_LIMIT;
    let points = overlay.then(|| {
        Trace::Scatter3d(Scatter3d {
            x: x.clone(),
            y: y.clone(),
            z: z.clone(),
            mode: "markers".to_string(),
            marker: Marker {
                size: 1.0,
                color: POINT_COLOR.to_string(),
                opacity: POINT_OPACITY,
            },
        })
    });

    let mut data = vec![Trace::Mesh3d(Mesh3d {
        x,
        y,
        z,
        i,
        j,
        k,
        color: MODEL_COLOR.to_string(),
        opacity: MODEL_OPACITY,
        name: "Model".to_string(),
        flatshading: true,
    })];
    data.extend(points);

    tracing::debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        overlay,
        "preview rendered"
    );

    Figure {
        data,
        layout: Layout {
            scene: Some(Scene {
                xaxis: Axis::hidden(),
                yaxis: Axis::hidden(),
                zaxis: Axis::hidden(),
                bgcolor: TRANSPARENT.to_string(),
                aspectmode: "data".to_string(),
            }),
            margin: Some(Margin::default()),
            paper_bgcolor: Some(TRANSPARENT.to_string()),
            ..Layout::default()
        },
    }
}

fn columns(mesh: &Mesh) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = mesh.vertex_count();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);
    for p in &mesh.positions {
        x.push(p.x);
        y.push(p.y);
        z.push(p.z);
    }
    (x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curiosity_geometry::Point3;
    use serde_json::json;

    fn points(n: usize) -> Mesh {
        let mut mesh = Mesh::new();
        for i in 0..n {
            mesh.add_vertex(Point3::new(i as f64, 0.0, 0.0));
        }
        mesh
    }

    #[test]
    fn test_overlay_boundary() {
        assert_eq!(render_preview(&points(4999)).data.len(), 2);
        assert_eq!(render_preview(&points(5000)).data.len(), 1);
        assert_eq!(render_preview(&points(5001)).data.len(), 1);
    }

    #[test]
    fn test_json_shape() {
        let mut mesh = points(3);
        mesh.add_triangle(0, 1, 2);
        let value = serde_json::to_value(render_preview(&mesh)).unwrap();

        let model = &value["data"][0];
        assert_eq!(model["type"], "mesh3d");
        assert_eq!(model["x"], json!([0.0, 1.0, 2.0]));
        assert_eq!(model["i"], json!([0]));
        assert_eq!(model["k"], json!([2]));
        assert_eq!(model["color"], "#66fcf1");
        assert_eq!(model["opacity"], 0.3);
        assert_eq!(model["flatshading"], true);

        let points = &value["data"][1];
        assert_eq!(points["type"], "scatter3d");
        assert_eq!(points["mode"], "markers");
        assert_eq!(points["marker"], json!({"size": 1.0, "color": "#ffffff", "opacity": 0.3}));

        let layout = &value["layout"];
        assert_eq!(layout["scene"]["aspectmode"], "data");
        assert_eq!(layout["scene"]["xaxis"], json!({"visible": false}));
        assert_eq!(layout["scene"]["bgcolor"], "rgba(0,0,0,0)");
        assert_eq!(layout["paper_bgcolor"], "rgba(0,0,0,0)");
        assert_eq!(layout["margin"], json!({"l": 0, "r": 0, "b": 0, "t": 0}));
        assert!(layout.get("title").is_none());
    }
}
