// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Iterative remeshing. Every iteration runs four passes over the mesh:
//!
//! 1. Split edges longer than `long_scale` times their target length,
//!    longest first.
//! 2. Collapse edges shorter than `short_scale` times their target length,
//!    shortest first, unless the collapse would create an edge that the next
//!    split pass would have to cut again.
//! 3. Flip interior edges when that brings the valences of the four
//!    involved vertices closer to 6 (4 on the border).
//! 4. Relax the vertex positions, keeping the border fixed.
//!
//! The drivers only differ in the target length they ask for: [`Bk2004`]
//! uses a single length for the whole mesh, [`Dvbb2013`] derives one per
//! edge from the local curvature.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::edge_ops::{collapse_edge, flip_edge, split_edge, EdgeHandles, FlipParameter};
use crate::prelude::*;
use crate::relaxation::{Relaxation, RelaxationParameter};
use crate::topology::sizing::sizing_field;

pub mod bk2004;
pub mod dvbb2013;

pub use bk2004::{Bk2004, Bk2004Parameter};
pub use dvbb2013::{Dvbb2013, Dvbb2013Parameter};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum RemeshStatus {
    #[default]
    Success = 0,
    InvalidParameter = 1,
    /// Empty mesh, or a face that is not a triangle.
    InvalidMesh = 2,
    DcelNotConsistent = 3,
    SplitFailed = 4,
    CollapseFailed = 5,
    FlipFailed = 6,
    RelaxationFailed = 7,
    InvalidSizingValue = 8,
}
crate::impl_status_error!(RemeshStatus);

impl ExitStatus for RemeshStatus {
    fn code(&self) -> u32 {
        *self as u32
    }
}

/// Edits performed by one remeshing iteration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassCounts {
    pub splits: usize,
    pub collapses: usize,
    pub flips: usize,
}

impl std::ops::Add for PassCounts {
    type Output = PassCounts;

    fn add(self, rhs: Self) -> Self::Output {
        PassCounts {
            splits: self.splits + rhs.splits,
            collapses: self.collapses + rhs.collapses,
            flips: self.flips + rhs.flips,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RemeshStats {
    /// One entry per completed iteration.
    pub iterations: Vec<PassCounts>,
}

impl RemeshStats {
    pub fn total(&self) -> PassCounts {
        self.iterations
            .iter()
            .fold(PassCounts::default(), |acc, &counts| acc + counts)
    }
}

/// How long the edges of the remeshed surface should be.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum TargetLength {
    Uniform(f32),
    /// Curvature sizing for the approximation error `eps`.
    Adaptive { eps: f32 },
}

/// Target lengths frozen at the start of a pass.
enum TargetField {
    Uniform(f32),
    PerVertex(HashMap<VertexId, f32>),
}

impl TargetLength {
    fn field(self, dcel: &Dcel) -> Result<TargetField, RemeshStatus> {
        match self {
            TargetLength::Uniform(length) => Ok(TargetField::Uniform(length)),
            TargetLength::Adaptive { eps } => {
                let (mesh, mapping) = dcel.to_triangle_mesh_with_mapping();
                let field = sizing_field(&mesh, eps).ok_or(RemeshStatus::InvalidSizingValue)?;
                Ok(TargetField::PerVertex(
                    mapping.ids.into_iter().zip(field).collect(),
                ))
            }
        }
    }
}

impl TargetField {
    fn edge_target(&self, dcel: &Dcel, edge: FullEdgeId) -> Result<f32, RemeshStatus> {
        match self {
            TargetField::Uniform(length) => Ok(*length),
            TargetField::PerVertex(lengths) => {
                let (a, b) = dcel
                    .edge_endpoints(edge)
                    .map_err(|_| RemeshStatus::DcelNotConsistent)?;
                match (lengths.get(&a), lengths.get(&b)) {
                    (Some(la), Some(lb)) if la.is_finite() && lb.is_finite() => Ok(la.min(*lb)),
                    _ => Err(RemeshStatus::InvalidSizingValue),
                }
            }
        }
    }
}

/// Settings shared by both drivers.
#[derive(Copy, Clone, Debug)]
pub(crate) struct PassSettings {
    pub long_scale: f32,
    pub short_scale: f32,
    pub relaxation: RelaxationParameter,
    pub check_consistency: bool,
}

/// Checks the scale factors common to both parameter sets.
pub(crate) fn valid_scales(long_scale: f32, short_scale: f32) -> bool {
    long_scale.is_finite()
        && short_scale.is_finite()
        && short_scale > 0.0
        && long_scale > 0.0
        && short_scale < long_scale
}

/// Rejects meshes the passes cannot work with.
pub(crate) fn check_input(dcel: &Dcel, check_consistency: bool) -> Result<(), RemeshStatus> {
    if dcel.num_faces() == 0 {
        return Err(RemeshStatus::InvalidMesh);
    }
    for (f, _) in dcel.iter_faces() {
        match dcel.face_edges(f) {
            Ok(edges) if edges.len() == 3 => {}
            _ => {
                log::debug!("Face {f:?} is not a triangle");
                return Err(RemeshStatus::InvalidMesh);
            }
        }
    }
    check_pass(dcel, check_consistency, "input")
}

fn check_pass(dcel: &Dcel, enabled: bool, pass: &str) -> Result<(), RemeshStatus> {
    if !enabled {
        return Ok(());
    }
    dcel.check_consistency().map_err(|err| {
        log::warn!("Mesh is not consistent after the {pass} pass: {err}");
        RemeshStatus::DcelNotConsistent
    })
}

/// Runs one split, collapse, flip and smoothing round.
#[profiling::function]
pub(crate) fn remesh_iteration(
    dcel: &mut Dcel,
    target: TargetLength,
    settings: &PassSettings,
) -> Result<PassCounts, RemeshStatus> {
    let targets = target.field(dcel)?;
    let splits = split_pass(dcel, &targets, settings.long_scale)?;
    check_pass(dcel, settings.check_consistency, "split")?;

    let targets = target.field(dcel)?;
    let collapses = collapse_pass(dcel, &targets, settings.short_scale, settings.long_scale)?;
    check_pass(dcel, settings.check_consistency, "collapse")?;

    let flips = flip_pass(dcel)?;
    check_pass(dcel, settings.check_consistency, "flip")?;

    smoothing_pass(dcel, settings.relaxation)?;
    check_pass(dcel, settings.check_consistency, "smoothing")?;

    Ok(PassCounts {
        splits,
        collapses,
        flips,
    })
}

#[profiling::function]
fn split_pass(dcel: &mut Dcel, targets: &TargetField, long_scale: f32) -> Result<usize, RemeshStatus> {
    let revision = dcel.revision();
    let mut candidates = vec![];
    for (e, _) in dcel.iter_fulledges() {
        let length2 = dcel
            .edge_length_squared(e)
            .map_err(|_| RemeshStatus::DcelNotConsistent)?;
        let threshold = long_scale * targets.edge_target(dcel, e)?;
        if length2 > threshold * threshold {
            candidates.push((e, length2));
        }
    }
    candidates.sort_by_key(|&(_, length2)| Reverse(length2.to_ord()));

    // Splitting only shortens the edge it cuts, so every candidate is still
    // live and still too long when its turn comes.
    for &(e, _) in &candidates {
        if let Err(err) = split_edge(dcel, e) {
            log::warn!("{err:?}");
            return Err(RemeshStatus::SplitFailed);
        }
    }
    log::debug!(
        "Split {} edges, revision {} -> {}",
        candidates.len(),
        revision,
        dcel.revision()
    );
    Ok(candidates.len())
}

/// Would collapsing `e` into its midpoint leave an edge longer than `max`?
fn creates_long_edge(dcel: &Dcel, e: FullEdgeId, max: f32) -> Result<bool, RemeshStatus> {
    let (a, b) = dcel
        .edge_endpoints(e)
        .map_err(|_| RemeshStatus::DcelNotConsistent)?;
    let merged = (dcel[a].position + dcel[b].position) * 0.5;
    for v in [a, b] {
        let neighbors = dcel
            .at_vertex(v)
            .neighbors()
            .map_err(|_| RemeshStatus::DcelNotConsistent)?;
        let too_long = neighbors
            .iter_cpy()
            .filter(|&n| n != a && n != b)
            .any(|n| dcel[n].position.distance_squared(merged) > max * max);
        if too_long {
            return Ok(true);
        }
    }
    Ok(false)
}

#[profiling::function]
fn collapse_pass(
    dcel: &mut Dcel,
    targets: &TargetField,
    short_scale: f32,
    long_scale: f32,
) -> Result<usize, RemeshStatus> {
    let revision = dcel.revision();
    let mut candidates = vec![];
    for (e, _) in dcel.iter_fulledges() {
        let length2 = dcel
            .edge_length_squared(e)
            .map_err(|_| RemeshStatus::DcelNotConsistent)?;
        let target = targets.edge_target(dcel, e)?;
        let threshold = short_scale * target;
        if length2 < threshold * threshold {
            candidates.push((e, length2, target));
        }
    }
    candidates.sort_by_key(|&(_, length2, _)| length2.to_ord());

    let mut collapsed = 0;
    for (e, length2, target) in candidates {
        // Earlier collapses may have removed or moved this edge
        if !dcel.contains(e) {
            continue;
        }
        match dcel.edge_length_squared(e) {
            Ok(current) if current == length2 => {}
            _ => continue,
        }
        if creates_long_edge(dcel, e, long_scale * target)? {
            continue;
        }
        match collapse_edge(dcel, e) {
            Ok(Some(_)) => collapsed += 1,
            Ok(None) => {}
            Err(err) => {
                log::warn!("{err:?}");
                return Err(RemeshStatus::CollapseFailed);
            }
        }
    }
    log::debug!(
        "Collapsed {} edges, revision {} -> {}",
        collapsed,
        revision,
        dcel.revision()
    );
    Ok(collapsed)
}

fn valence_error(dcel: &Dcel, v: VertexId, delta: i32) -> Result<u32, RemeshStatus> {
    let valence = dcel
        .at_vertex(v)
        .valence()
        .map_err(|_| RemeshStatus::DcelNotConsistent)?;
    let target = if dcel.is_border(v) { 4 } else { 6 };
    Ok((valence as i32 + delta - target).unsigned_abs())
}

/// Valence error of the four vertices around `e`, before and after flipping
/// it. `None` for border edges.
fn flip_errors(dcel: &Dcel, e: FullEdgeId) -> Result<Option<(u32, u32)>, RemeshStatus> {
    let handles = EdgeHandles::resolve(dcel, e).map_err(|_| RemeshStatus::DcelNotConsistent)?;
    let (Some(x), Some(y)) = (handles.x, handles.y) else {
        return Ok(None);
    };
    if handles.is_border() {
        return Ok(None);
    }
    let mut before = 0;
    let mut after = 0;
    for (v, delta) in [(handles.v0, -1), (handles.v1, -1), (x, 1), (y, 1)] {
        before += valence_error(dcel, v, 0)?;
        after += valence_error(dcel, v, delta)?;
    }
    Ok(Some((before, after)))
}

#[profiling::function]
fn flip_pass(dcel: &mut Dcel) -> Result<usize, RemeshStatus> {
    let revision = dcel.revision();
    let mut candidates = vec![];
    for (e, _) in dcel.iter_fulledges() {
        if let Some((before, _)) = flip_errors(dcel, e)? {
            candidates.push((e, before));
        }
    }
    candidates.sort_by_key(|&(_, before)| Reverse(before));

    let parameter = FlipParameter::default().with_check_quality(true);
    let mut flipped = 0;
    for (e, _) in candidates {
        // Valences change as neighboring edges get flipped
        match flip_errors(dcel, e)? {
            Some((before, after)) if after <= before => {}
            _ => continue,
        }
        match flip_edge(dcel, e, parameter) {
            Ok(true) => flipped += 1,
            Ok(false) => {}
            Err(err) => {
                log::warn!("{err:?}");
                return Err(RemeshStatus::FlipFailed);
            }
        }
    }
    log::debug!(
        "Flipped {} edges, revision {} -> {}",
        flipped,
        revision,
        dcel.revision()
    );
    Ok(flipped)
}

/// Relaxes an exported copy of the mesh and writes the interior vertices
/// back.
#[profiling::function]
fn smoothing_pass(dcel: &mut Dcel, parameter: RelaxationParameter) -> Result<(), RemeshStatus> {
    let (mut mesh, mapping) = dcel.to_triangle_mesh_with_mapping();
    let mut relaxation = Algorithm::new(Relaxation::new(&mut mesh, parameter));
    relaxation.run();
    if relaxation.is_failed() {
        log::warn!(
            "Smoothing failed in state {:?}: {}",
            relaxation.state(),
            relaxation.exit_status()
        );
        return Err(RemeshStatus::RelaxationFailed);
    }

    for (i, &v) in mapping.ids.iter().enumerate() {
        if dcel.is_border(v) {
            continue;
        }
        let vertex = &mut dcel[v];
        vertex.position = mesh.positions[i];
        vertex.normal = mesh.normals[i];
    }
    log::debug!("Relaxed {} vertices", mapping.len());
    Ok(())
}

/// Logs one finished iteration.
pub(crate) fn log_iteration(name: &str, iteration: u32, counts: &PassCounts, dcel: &Dcel) {
    log::info!(
        "{name} iteration {iteration}: {} splits, {} collapses, {} flips, {} vertices, {} faces",
        counts.splits,
        counts.collapses,
        counts.flips,
        dcel.num_vertices(),
        dcel.num_faces()
    );
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::test_meshes;

    #[test]
    pub fn test_split_pass_longest_first() {
        let mut dcel = Dcel::try_from(&test_meshes::octahedron()).unwrap();
        // Octahedron edges are sqrt(2) long; all of them exceed the threshold.
        // Candidates are taken once, so an edge from a midpoint to the
        // opposite corner (sqrt(1.5) long) may survive the pass.
        let splits = split_pass(&mut dcel, &TargetField::Uniform(1.0), 1.2).unwrap();
        assert_eq!(splits, 12);
        assert_eq!(dcel.num_vertices(), 18);
        assert!(dcel.is_consistent());
        assert!(dcel
            .iter_fulledges()
            .all(|(e, _)| dcel.edge_length(e).unwrap() < 1.25));
    }

    #[test]
    pub fn test_collapse_pass_guards_long_edges() {
        let mut dcel = Dcel::try_from(&test_meshes::icosahedron()).unwrap();
        let mean = dcel.mean_edge_length().unwrap();

        // Every edge is short, but collapsing any of them would pull the
        // merged vertex about 1.25 edge lengths away from two of its new
        // neighbors, past the split threshold
        let collapsed = collapse_pass(&mut dcel, &TargetField::Uniform(mean), 1.1, 1.1).unwrap();
        assert_eq!(collapsed, 0);
        assert_eq!(dcel.num_vertices(), 12);

        let collapsed = collapse_pass(&mut dcel, &TargetField::Uniform(mean), 1.1, 100.0).unwrap();
        assert!(collapsed > 0);
        assert!(dcel.is_consistent());
    }

    fn total_valence_error(dcel: &Dcel) -> u32 {
        dcel.iter_vertices()
            .map(|(v, _)| valence_error(dcel, v, 0).unwrap())
            .sum()
    }

    fn has_edge(dcel: &Dcel, a: VertexId, b: VertexId) -> bool {
        dcel.at_vertex(a).halfedge_to(b).try_end().is_ok()
    }

    #[test]
    pub fn test_flip_pass_improves_valence() {
        // A flat half fan around the origin. The origin has five neighbors
        // and the middle spoke runs out to a far tip, leaving two thin
        // triangles on either side of it.
        //
        //            r2
        //           /|\
        //          / | \
        //        r3  |  r1
        //       / \ | / \
        //     r4 --- v0 --- r0
        let mesh = TriangleMesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 3.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
                Vec3::new(-2.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 5]],
        );
        let mut dcel = Dcel::from_triangle_mesh_with_border(&mesh).unwrap();
        let ids = dcel.vertex_mapping().ids;
        assert_eq!(total_valence_error(&dcel), 8);

        // The outer spokes score better but their quads are not convex, so
        // only the middle spoke turns into the r1 - r3 edge
        let flips = flip_pass(&mut dcel).unwrap();
        assert_eq!(flips, 1);
        assert!(dcel.is_consistent());
        assert!(has_edge(&dcel, ids[2], ids[4]));
        assert!(!has_edge(&dcel, ids[0], ids[3]));
        assert_eq!(total_valence_error(&dcel), 6);
    }

    #[test]
    pub fn test_flip_pass_takes_even_valence_trades() {
        // A flat rhombus cut along its long diagonal. Flipping trades one
        // unit of valence error between the two pairs of corners and fixes
        // the two thin triangles.
        let mesh = TriangleMesh::new(
            vec![
                Vec3::new(-2.0, 0.0, 0.0),
                Vec3::new(0.0, -1.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        );
        let mut dcel = Dcel::from_triangle_mesh_with_border(&mesh).unwrap();
        let ids = dcel.vertex_mapping().ids;
        let diagonal = dcel.at_vertex(ids[0]).halfedge_to(ids[2]).fulledge().end();
        assert_eq!(flip_errors(&dcel, diagonal).unwrap(), Some((6, 6)));

        assert_eq!(flip_pass(&mut dcel).unwrap(), 1);
        assert!(dcel.is_consistent());
        assert!(has_edge(&dcel, ids[1], ids[3]));
        assert!(!has_edge(&dcel, ids[0], ids[2]));
        assert_eq!(total_valence_error(&dcel), 6);
    }

    #[test]
    pub fn test_stats_total() {
        let stats = RemeshStats {
            iterations: vec![
                PassCounts {
                    splits: 3,
                    collapses: 1,
                    flips: 2,
                },
                PassCounts {
                    splits: 1,
                    collapses: 0,
                    flips: 4,
                },
            ],
        };
        assert_eq!(
            stats.total(),
            PassCounts {
                splits: 4,
                collapses: 1,
                flips: 6
            }
        );
    }

    #[test]
    pub fn test_scales() {
        assert!(valid_scales(4.0 / 3.0, 0.8));
        assert!(!valid_scales(0.8, 0.8));
        assert!(!valid_scales(f32::INFINITY, 0.8));
        assert!(!valid_scales(1.0, 0.0));
    }
}
