// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;

use dcel_commons::geometry;
use serde::{Deserialize, Serialize};

/// An indexed triangle mesh with per-vertex normals. Triangles are counter
/// clockwise when seen from the outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

/// Summary of the edge lengths of a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeLengthStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub count: usize,
}

impl TriangleMesh {
    /// Builds a mesh and computes its vertex normals.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let normals = geometry::uniform_normals(&positions, &triangles);
        Self {
            positions,
            normals,
            triangles,
        }
    }

    pub fn with_normals(positions: Vec<Vec3>, normals: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            normals,
            triangles,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn recompute_normals(&mut self) {
        self.normals = geometry::uniform_normals(&self.positions, &self.triangles);
    }

    /// Checks that indices are in range and triangles reference three
    /// distinct vertices.
    pub fn validate(&self) -> Result<()> {
        if !self.normals.is_empty() && self.normals.len() != self.positions.len() {
            bail!(
                "Mesh has {} normals for {} positions",
                self.normals.len(),
                self.positions.len()
            );
        }
        for (i, tri) in self.triangles.iter().enumerate() {
            if let Some(idx) = tri.iter().find(|&&idx| idx as usize >= self.positions.len()) {
                bail!("Triangle {i} has out-of-bounds index {idx}");
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0] {
                bail!("Triangle {i} has duplicate vertices {tri:?}");
            }
        }
        Ok(())
    }

    /// Unique undirected edges as `(low, high)` index pairs.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        self.triangles
            .iter()
            .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
            .map(|(a, b)| (a.min(b), a.max(b)))
            .sorted()
            .dedup()
            .collect()
    }

    pub fn edge_length_stats(&self) -> Option<EdgeLengthStats> {
        let edges = self.edges();
        if edges.is_empty() {
            return None;
        }
        let lengths = edges
            .iter()
            .map(|&(a, b)| self.positions[a as usize].distance(self.positions[b as usize]))
            .collect_vec();
        let min = lengths.iter().copied().fold(f32::INFINITY, f32::min);
        let max = lengths.iter().copied().fold(0.0, f32::max);
        let mean = lengths.iter().sum::<f32>() / lengths.len() as f32;
        Some(EdgeLengthStats {
            min,
            max,
            mean,
            count: lengths.len(),
        })
    }

    /// Triangles rotated so the smallest index comes first, then sorted.
    /// Two meshes with the same connectivity and vertex labels compare equal
    /// regardless of face order or starting corner.
    pub fn canonical_triangles(&self) -> Vec<[u32; 3]> {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                if a <= b && a <= c {
                    [a, b, c]
                } else if b <= a && b <= c {
                    [b, c, a]
                } else {
                    [c, a, b]
                }
            })
            .sorted()
            .collect()
    }
}
