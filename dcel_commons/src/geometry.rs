// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Discrete differential geometry over an indexed triangle list.
//!
//! All functions take the vertex positions and the triangles (three indices
//! each, counter-clockwise) and return one value per vertex. Triangle indices
//! must be in range; validating them is the caller's job.
//!
//! Per-triangle contributions are accumulated into per-vertex sums from
//! several threads at once. Since many triangles share a vertex, the sums are
//! stored in atomics and added with relaxed ordering: only the final value
//! after the parallel region is read.

use std::f32::consts::{FRAC_PI_2, PI};
use std::sync::atomic::Ordering;

use atomic_float::AtomicF32;
use glam::Vec3;
use rayon::prelude::*;

use crate::math::{corner_angle, cotangent, triangle_area, triangle_normal, AtomicVec3};
use crate::utils::{transmute_vec, SVecN};

pub type Triangle = [u32; 3];

/// Adds a per-corner scalar contribution of every triangle to its three
/// vertices.
fn scatter_scalar<F>(num_vertices: usize, triangles: &[Triangle], contribution: F) -> Vec<f32>
where
    F: Fn(&Triangle) -> [f32; 3] + Sync,
{
    let sums = (0..num_vertices)
        .map(|_| AtomicF32::new(0.0))
        .collect::<Vec<_>>();
    triangles.par_iter().for_each(|tri| {
        let values = contribution(tri);
        for (&v, value) in tri.iter().zip(values) {
            sums[v as usize].fetch_add(value, Ordering::Relaxed);
        }
    });
    sums.iter().map(|s| s.load(Ordering::Relaxed)).collect()
}

/// Same as [`scatter_scalar`], for vector valued contributions.
fn scatter_vector<F>(num_vertices: usize, triangles: &[Triangle], contribution: F) -> Vec<Vec3>
where
    F: Fn(&Triangle) -> [Vec3; 3] + Sync,
{
    // SAFETY: Vec3 and AtomicVec3 have the exact same memory layout
    let sums = unsafe { transmute_vec::<Vec3, AtomicVec3>(vec![Vec3::ZERO; num_vertices]) };
    triangles.par_iter().for_each(|tri| {
        let values = contribution(tri);
        for (&v, value) in tri.iter().zip(values) {
            sums[v as usize].fetch_add(value, Ordering::Relaxed);
        }
    });
    // SAFETY: Same as above, Vec3 and AtomicVec3 have the same memory layout
    unsafe { transmute_vec::<AtomicVec3, Vec3>(sums) }
}

fn corners(positions: &[Vec3], tri: &Triangle) -> (Vec3, Vec3, Vec3) {
    (
        positions[tri[0] as usize],
        positions[tri[1] as usize],
        positions[tri[2] as usize],
    )
}

/// For each vertex, the list of triangles using it.
pub fn vertex_triangles(triangles: &[Triangle], num_vertices: usize) -> Vec<SVecN<u32, 8>> {
    let mut result = vec![SVecN::new(); num_vertices];
    for (t, tri) in triangles.iter().enumerate() {
        for &v in tri {
            result[v as usize].push(t as u32);
        }
    }
    result
}

/// For each vertex, its sorted list of one-ring neighbors.
pub fn vertex_neighbors(triangles: &[Triangle], num_vertices: usize) -> Vec<SVecN<u32, 8>> {
    let mut result: Vec<SVecN<u32, 8>> = vec![SVecN::new(); num_vertices];
    for tri in triangles {
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            result[a as usize].push(b);
            result[b as usize].push(a);
        }
    }
    result.par_iter_mut().for_each(|n| {
        n.sort_unstable();
        n.dedup();
    });
    result
}

/// A vertex lies on the boundary when one of its edges is used by a single
/// triangle.
pub fn boundary_vertices(triangles: &[Triangle], num_vertices: usize) -> Vec<bool> {
    let mut edge_counts = std::collections::HashMap::<(u32, u32), u32>::new();
    for tri in triangles {
        for k in 0..3 {
            let (a, b) = (tri[k], tri[(k + 1) % 3]);
            *edge_counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
        }
    }
    let mut boundary = vec![false; num_vertices];
    for ((a, b), count) in edge_counts {
        if count == 1 {
            boundary[a as usize] = true;
            boundary[b as usize] = true;
        }
    }
    boundary
}

/// Unit normal of every triangle.
pub fn face_normals(positions: &[Vec3], triangles: &[Triangle]) -> Vec<Vec3> {
    triangles
        .par_iter()
        .map(|tri| {
            let (a, b, c) = corners(positions, tri);
            triangle_normal(a, b, c).normalize()
        })
        .collect()
}

/// Per-vertex normal as the unweighted average of the unit normals of the
/// adjacent triangles. Vertices without triangles get a zero normal, a
/// degenerate neighbourhood yields a non-finite one.
#[profiling::function]
pub fn uniform_normals(positions: &[Vec3], triangles: &[Triangle]) -> Vec<Vec3> {
    let face_normals = face_normals(positions, triangles);
    let adjacency = vertex_triangles(triangles, positions.len());
    adjacency
        .par_iter()
        .map(|tris| {
            if tris.is_empty() {
                return Vec3::ZERO;
            }
            tris.iter()
                .fold(Vec3::ZERO, |acc, &t| acc + face_normals[t as usize])
                .normalize()
        })
        .collect()
}

/// Per-vertex area as a third of the area of every adjacent triangle.
#[profiling::function]
pub fn barycentric_areas(positions: &[Vec3], triangles: &[Triangle]) -> Vec<f32> {
    scatter_scalar(positions.len(), triangles, |tri| {
        let (a, b, c) = corners(positions, tri);
        [triangle_area(a, b, c) / 3.0; 3]
    })
}

/// Mixed Voronoi area of every vertex (Meyer et al.): the Voronoi region for
/// non-obtuse triangles, half / a quarter of the triangle area for obtuse
/// ones.
#[profiling::function]
pub fn voronoi_areas(positions: &[Vec3], triangles: &[Triangle]) -> Vec<f32> {
    scatter_scalar(positions.len(), triangles, |tri| {
        let p = [
            positions[tri[0] as usize],
            positions[tri[1] as usize],
            positions[tri[2] as usize],
        ];
        let area = triangle_area(p[0], p[1], p[2]);
        let angles = [
            corner_angle(p[0], p[1], p[2]),
            corner_angle(p[1], p[2], p[0]),
            corner_angle(p[2], p[0], p[1]),
        ];
        let obtuse = angles.iter().position(|&a| a > FRAC_PI_2);
        let mut result = [0.0; 3];
        for i in 0..3 {
            let j = (i + 1) % 3;
            let k = (i + 2) % 3;
            result[i] = match obtuse {
                None => {
                    0.125
                        * ((p[k] - p[i]).length_squared() * cotangent(p[j], p[k], p[i])
                            + (p[j] - p[i]).length_squared() * cotangent(p[k], p[i], p[j]))
                }
                Some(o) if o == i => area / 2.0,
                Some(_) => area / 4.0,
            };
        }
        result
    })
}

/// The cotangent weighted Laplacian: `0.5 * sum_j (cot a_ij + cot b_ij) (p_j - p_i)`.
#[profiling::function]
pub fn cotangent_weight_laplacian(positions: &[Vec3], triangles: &[Triangle]) -> Vec<Vec3> {
    scatter_vector(positions.len(), triangles, |tri| {
        let p = [
            positions[tri[0] as usize],
            positions[tri[1] as usize],
            positions[tri[2] as usize],
        ];
        let mut result = [Vec3::ZERO; 3];
        // Corner k weighs the opposite edge (i, j)
        for k in 0..3 {
            let i = (k + 1) % 3;
            let j = (k + 2) % 3;
            let w = 0.5 * cotangent(p[k], p[i], p[j]);
            result[i] += w * (p[j] - p[i]);
            result[j] += w * (p[i] - p[j]);
        }
        result
    })
}

/// The mean curvature normal `-2 H n` of every vertex, as the cotangent
/// Laplacian divided by the mixed Voronoi area.
pub fn mean_curvature_normals(positions: &[Vec3], triangles: &[Triangle]) -> Vec<Vec3> {
    let laplacian = cotangent_weight_laplacian(positions, triangles);
    let areas = voronoi_areas(positions, triangles);
    laplacian
        .par_iter()
        .zip(areas.par_iter())
        .map(|(l, a)| *l / *a)
        .collect()
}

/// Signed mean curvature, positive where the surface bends away from
/// `normals` (e.g. a sphere with outward normals).
pub fn mean_curvature(positions: &[Vec3], triangles: &[Triangle], normals: &[Vec3]) -> Vec<f32> {
    mean_curvature_normals(positions, triangles)
        .par_iter()
        .zip(normals.par_iter())
        .map(|(hn, n)| -0.5 * hn.dot(*n))
        .collect()
}

/// Gaussian curvature from the angle defect, divided by the mixed Voronoi
/// area. Boundary vertices use a defect of pi instead of 2 pi.
#[profiling::function]
pub fn gaussian_curvature(positions: &[Vec3], triangles: &[Triangle]) -> Vec<f32> {
    let angle_sums = scatter_scalar(positions.len(), triangles, |tri| {
        let (a, b, c) = corners(positions, tri);
        [
            corner_angle(a, b, c),
            corner_angle(b, c, a),
            corner_angle(c, a, b),
        ]
    });
    let areas = voronoi_areas(positions, triangles);
    let boundary = boundary_vertices(triangles, positions.len());
    (0..positions.len())
        .into_par_iter()
        .map(|v| {
            let full = if boundary[v] { PI } else { 2.0 * PI };
            (full - angle_sums[v]) / areas[v]
        })
        .collect()
}

/// Maximum absolute principal curvature: `|H| + sqrt(max(H^2 - K, 0))`.
pub fn max_curvature(mean: &[f32], gaussian: &[f32]) -> Vec<f32> {
    mean.par_iter()
        .zip(gaussian.par_iter())
        .map(|(&h, &k)| h.abs() + (h * h - k).max(0.0).sqrt())
        .collect()
}

#[cfg(test)]
pub mod test {
    use super::*;

    /// Regular octahedron inscribed in the unit sphere.
    fn octahedron() -> (Vec<Vec3>, Vec<Triangle>) {
        let positions = vec![
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
        ];
        let triangles = vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        (positions, triangles)
    }

    #[test]
    pub fn test_normals_point_outwards() {
        let (positions, triangles) = octahedron();
        let normals = uniform_normals(&positions, &triangles);
        for (p, n) in positions.iter().zip(normals.iter()) {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(n.dot(*p) > 0.99);
        }
    }

    #[test]
    pub fn test_areas_sum_to_surface_area() {
        let (positions, triangles) = octahedron();
        let total: f32 = triangles
            .iter()
            .map(|t| {
                let (a, b, c) = corners(&positions, t);
                triangle_area(a, b, c)
            })
            .sum();
        let barycentric: f32 = barycentric_areas(&positions, &triangles).iter().sum();
        let voronoi: f32 = voronoi_areas(&positions, &triangles).iter().sum();
        assert!((barycentric - total).abs() < 1e-4);
        assert!((voronoi - total).abs() < 1e-4);
    }

    #[test]
    pub fn test_curvature_is_positive_on_convex_shapes() {
        let (positions, triangles) = octahedron();
        let normals = uniform_normals(&positions, &triangles);
        let mean = mean_curvature(&positions, &triangles, &normals);
        let gaussian = gaussian_curvature(&positions, &triangles);
        let kmax = max_curvature(&mean, &gaussian);
        for v in 0..positions.len() {
            assert!(mean[v] > 0.0);
            assert!(gaussian[v] > 0.0);
            assert!(kmax[v] >= mean[v]);
        }
        // Gauss-Bonnet: the total angle defect of a sphere is 4 pi
        let areas = voronoi_areas(&positions, &triangles);
        let total: f32 = gaussian.iter().zip(areas.iter()).map(|(k, a)| k * a).sum();
        assert!((total - 4.0 * PI).abs() < 1e-3);
    }

    #[test]
    pub fn test_flat_grid_has_no_interior_curvature() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
        ];
        let triangles = vec![
            [0, 1, 4],
            [0, 4, 3],
            [1, 2, 5],
            [1, 5, 4],
            [3, 4, 7],
            [3, 7, 6],
            [4, 5, 8],
            [4, 8, 7],
        ];
        let boundary = boundary_vertices(&triangles, positions.len());
        assert_eq!(boundary.iter().filter(|b| **b).count(), 8);
        assert!(!boundary[4]);

        let laplacian = cotangent_weight_laplacian(&positions, &triangles);
        assert!(laplacian[4].length() < 1e-5);
        let gaussian = gaussian_curvature(&positions, &triangles);
        assert!(gaussian[4].abs() < 1e-4);

        let neighbors = vertex_neighbors(&triangles, positions.len());
        assert_eq!(neighbors[4].as_slice(), &[0, 1, 3, 5, 7, 8]);
    }
}
