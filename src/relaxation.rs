// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Moves every interior vertex towards the weighted centroid of its one-ring,
//! restricted to the tangent plane so the surface shape is kept.
//!
//! - Tangential: `p' = p + lambda (I - n n^T) (c - p)`, with the centroid `c`
//!   weighted by the barycentric area of each neighbor.
//! - Adaptive: `p' = c + n n^T (p - c)`, with the centroid weighted by the
//!   curvature sizing value of each neighbor (see
//!   [`crate::topology::sizing::sizing_field`]).
//!
//! Border vertices and vertices without triangles stay in place.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::prelude::*;
use crate::topology::sizing::sizing_field;

use dcel_commons::geometry;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RelaxationMode {
    /// Area weighted, damped by `lambda` in `(0, 1]`.
    Tangential { lambda: f32 },
    /// Sizing weighted for the approximation error `eps`.
    Adaptive { eps: f32 },
}

impl Default for RelaxationMode {
    fn default() -> Self {
        RelaxationMode::Tangential { lambda: 0.5 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationParameter {
    pub iterations: u32,
    pub mode: RelaxationMode,
}

impl Default for RelaxationParameter {
    fn default() -> Self {
        Self {
            iterations: 5,
            mode: RelaxationMode::default(),
        }
    }
}

impl RelaxationParameter {
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_mode(mut self, mode: RelaxationMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum RelaxationStatus {
    #[default]
    Success = 0,
    InvalidParameter = 1,
    InvalidMesh = 2,
    InvalidNormal = 3,
    InvalidArea = 4,
    InvalidCentroid = 5,
    InvalidPoint = 6,
    InvalidSizingValue = 7,
}
crate::impl_status_error!(RelaxationStatus);

impl ExitStatus for RelaxationStatus {
    fn code(&self) -> u32 {
        *self as u32
    }
}

pub struct Relaxation<'a> {
    mesh: &'a mut TriangleMesh,
    parameter: RelaxationParameter,
    neighbors: Vec<SVecN<u32, 8>>,
    border: Vec<bool>,
}

impl<'a> Relaxation<'a> {
    pub fn new(mesh: &'a mut TriangleMesh, parameter: RelaxationParameter) -> Self {
        Self {
            mesh,
            parameter,
            neighbors: vec![],
            border: vec![],
        }
    }

    pub fn parameter(&self) -> &RelaxationParameter {
        &self.parameter
    }

    /// Per vertex centroid weights, and the status to report if one of them
    /// turns out to be non-finite where it is used.
    fn weights(&self) -> Result<(Vec<f32>, RelaxationStatus), RelaxationStatus> {
        let mesh = &*self.mesh;
        match self.parameter.mode {
            RelaxationMode::Tangential { .. } => Ok((
                geometry::barycentric_areas(&mesh.positions, &mesh.triangles),
                RelaxationStatus::InvalidArea,
            )),
            RelaxationMode::Adaptive { eps } => sizing_field(mesh, eps)
                .map(|field| (field, RelaxationStatus::InvalidSizingValue))
                .ok_or(RelaxationStatus::InvalidSizingValue),
        }
    }

    #[profiling::function]
    fn step(&mut self) -> Result<(), RelaxationStatus> {
        let (weights, invalid_weight) = self.weights()?;
        let mesh = &*self.mesh;
        let normals = geometry::uniform_normals(&mesh.positions, &mesh.triangles);
        let (neighbors, border) = (&self.neighbors, &self.border);
        let mode = self.parameter.mode;

        let updated: Vec<Result<Vec3, RelaxationStatus>> = (0..mesh.positions.len())
            .into_par_iter()
            .map(|i| {
                let p = mesh.positions[i];
                let ring = &neighbors[i];
                if ring.is_empty() || border[i] {
                    return Ok(p);
                }
                let ring = ring
                    .iter()
                    .map(|&j| (mesh.positions[j as usize], weights[j as usize]));
                relax_vertex(p, normals[i], ring, mode, invalid_weight)
            })
            .collect();
        // The first failing vertex in index order decides the status
        let updated = updated.into_iter().collect::<Result<Vec<_>, _>>()?;

        self.mesh.positions = updated;
        Ok(())
    }
}

/// Moves `p` towards the weighted centroid of its one-ring. `invalid_weight`
/// is reported for a non-finite weight.
fn relax_vertex(
    p: Vec3,
    n: Vec3,
    ring: impl Iterator<Item = (Vec3, f32)>,
    mode: RelaxationMode,
    invalid_weight: RelaxationStatus,
) -> Result<Vec3, RelaxationStatus> {
    if !n.is_finite() {
        return Err(RelaxationStatus::InvalidNormal);
    }

    let mut sum = Vec3::ZERO;
    let mut total = 0.0;
    for (q, w) in ring {
        if !w.is_finite() {
            return Err(invalid_weight);
        }
        sum += w * q;
        total += w;
    }
    let centroid = sum / total;
    if !centroid.is_finite() {
        return Err(RelaxationStatus::InvalidCentroid);
    }

    let moved = match mode {
        RelaxationMode::Tangential { lambda } => {
            let d = centroid - p;
            p + lambda * (d - n * n.dot(d))
        }
        RelaxationMode::Adaptive { .. } => centroid + n * n.dot(p - centroid),
    };
    if !moved.is_finite() {
        return Err(RelaxationStatus::InvalidPoint);
    }
    Ok(moved)
}

impl<'a> AlgorithmStages for Relaxation<'a> {
    type ExitStatus = RelaxationStatus;
    const NAME: &'static str = "Relaxation";

    fn config_check(&mut self) -> Result<(), RelaxationStatus> {
        let valid = match self.parameter.mode {
            RelaxationMode::Tangential { lambda } => lambda > 0.0 && lambda <= 1.0,
            RelaxationMode::Adaptive { eps } => eps.is_finite() && eps > 0.0,
        };
        if !valid {
            return Err(RelaxationStatus::InvalidParameter);
        }
        Ok(())
    }

    fn preprocessing(&mut self) -> Result<(), RelaxationStatus> {
        if let Err(err) = self.mesh.validate() {
            log::debug!("Cannot relax mesh: {err}");
            return Err(RelaxationStatus::InvalidMesh);
        }
        let num_vertices = self.mesh.num_vertices();
        self.neighbors = geometry::vertex_neighbors(&self.mesh.triangles, num_vertices);
        self.border = geometry::boundary_vertices(&self.mesh.triangles, num_vertices);
        Ok(())
    }

    fn processing(&mut self) -> Result<RelaxationStatus, RelaxationStatus> {
        for _ in 0..self.parameter.iterations {
            self.step()?;
        }
        Ok(RelaxationStatus::Success)
    }

    fn postprocessing(&mut self) -> Result<(), RelaxationStatus> {
        self.mesh.recompute_normals();
        let broken = self
            .mesh
            .normals
            .iter()
            .zip(&self.neighbors)
            .any(|(n, ring)| !ring.is_empty() && !n.is_finite());
        if broken {
            return Err(RelaxationStatus::InvalidNormal);
        }
        Ok(())
    }
}
