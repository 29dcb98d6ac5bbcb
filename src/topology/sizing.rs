// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curvature adaptive sizing. An edge of length `L` approximating a circle
//! of radius `r = 1 / k` deviates from it by `r - sqrt(r^2 - L^2 / 4)`.
//! Bounding that deviation by `eps` gives the target length
//! `L = sqrt(6 eps / k - 3 eps^2)`.

use crate::prelude::*;

use dcel_commons::geometry;

/// The target edge length for maximum curvature `kmax` and approximation
/// error `eps`. `None` when the curvature is zero or negative, or so large
/// that no positive length satisfies the bound.
pub fn target_length(kmax: f32, eps: f32) -> Option<f32> {
    if !kmax.is_finite() || kmax <= 0.0 {
        return None;
    }
    let radicand = 6.0 * eps / kmax - 3.0 * eps * eps;
    let length = radicand.sqrt();
    (radicand > 0.0 && length.is_finite()).then(|| length)
}

/// Maximum principal curvature of every vertex of `mesh`.
pub fn max_curvatures(mesh: &TriangleMesh) -> Vec<f32> {
    let normals = geometry::uniform_normals(&mesh.positions, &mesh.triangles);
    let mean = geometry::mean_curvature(&mesh.positions, &mesh.triangles, &normals);
    let gaussian = geometry::gaussian_curvature(&mesh.positions, &mesh.triangles);
    geometry::max_curvature(&mean, &gaussian)
}

/// Sizing value of every vertex of `mesh`. Where the bound gives no length,
/// flat vertices take the largest value found elsewhere and overly curved
/// ones the smallest. `None` if some used vertex has a non-finite curvature
/// or no vertex has a value at all.
pub fn sizing_field(mesh: &TriangleMesh, eps: f32) -> Option<Vec<f32>> {
    let kmax = max_curvatures(mesh);
    let mut used = vec![false; mesh.num_vertices()];
    for &v in mesh.triangles.iter().flatten() {
        used[v as usize] = true;
    }
    if kmax.iter().zip(&used).any(|(k, &used)| used && !k.is_finite()) {
        return None;
    }

    let lengths = kmax.iter().map(|&k| target_length(k, eps)).collect_vec();
    let (shortest, longest) = lengths
        .iter()
        .flatten()
        .fold((f32::INFINITY, 0.0f32), |(lo, hi), &l| (lo.min(l), hi.max(l)));
    if !shortest.is_finite() {
        return None;
    }
    Some(
        kmax.iter()
            .zip(lengths)
            .map(|(&k, l)| match l {
                Some(l) => l,
                None if k <= 0.0 => longest,
                None => shortest,
            })
            .collect(),
    )
}

/// Elements that have a sizing value.
pub trait SizingValue: Copy {
    fn sizing_value(self, dcel: &Dcel, eps: f32) -> Result<f32>;
}

impl SizingValue for VertexId {
    /// Evaluated on the one-ring only.
    fn sizing_value(self, dcel: &Dcel, eps: f32) -> Result<f32> {
        let (local, _) = dcel.extract(self)?;
        if local.triangles.is_empty() {
            bail!("Vertex {self:?} has no faces");
        }
        // The vertex itself is local index 0
        let kmax = max_curvatures(&local)[0];
        target_length(kmax, eps).ok_or_else(|| {
            anyhow!("No sizing value for {self:?}: max curvature {kmax}, eps {eps}")
        })
    }
}

impl SizingValue for FullEdgeId {
    /// The smaller value of both endpoints.
    fn sizing_value(self, dcel: &Dcel, eps: f32) -> Result<f32> {
        let (a, b) = dcel.edge_endpoints(self)?;
        Ok(a.sizing_value(dcel, eps)?.min(b.sizing_value(dcel, eps)?))
    }
}

impl SizingValue for FaceId {
    /// The smallest value over the face's vertices.
    fn sizing_value(self, dcel: &Dcel, eps: f32) -> Result<f32> {
        dcel.face_vertices(self)?
            .iter()
            .map(|v| v.sizing_value(dcel, eps))
            .fold_ok(f32::INFINITY, f32::min)
    }
}

impl Dcel {
    pub fn sizing_value<T: SizingValue>(&self, element: T, eps: f32) -> Result<f32> {
        element.sizing_value(self, eps)
    }
}
