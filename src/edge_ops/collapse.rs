// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{EdgeHandles, EdgeOperation, EdgeStatus};
use crate::prelude::*;

use dcel_commons::math::{orthonormal_basis, signed_area_2d};

/// Relative projected area below which a face counts as seen edge-on.
const EDGE_ON_TOLERANCE: f32 = 1e-5;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CollapseStatus {
    #[default]
    Success,
    Edge(EdgeStatus),
    BorderFullEdge,
    OneRingIntersectionProblem,
    FaceInversion,
    VertexNotRemoved,
    HalfEdgeNotRemoved,
    FullEdgeNotRemoved,
    FaceNotRemoved,
}
crate::impl_status_error!(CollapseStatus);

impl ExitStatus for CollapseStatus {
    fn code(&self) -> u32 {
        match self {
            CollapseStatus::Success => 0,
            CollapseStatus::Edge(status) => status.code(),
            CollapseStatus::BorderFullEdge => 10,
            CollapseStatus::OneRingIntersectionProblem => 11,
            CollapseStatus::FaceInversion => 12,
            CollapseStatus::VertexNotRemoved => 20,
            CollapseStatus::HalfEdgeNotRemoved => 21,
            CollapseStatus::FullEdgeNotRemoved => 22,
            CollapseStatus::FaceNotRemoved => 23,
        }
    }
}

impl From<EdgeStatus> for CollapseStatus {
    fn from(status: EdgeStatus) -> Self {
        CollapseStatus::Edge(status)
    }
}

/// Merges the two endpoints of a full-edge into the first one, placed at the
/// midpoint. The two adjacent triangles degenerate and are removed together
/// with the edge, the second endpoint and one full-edge on each side.
///
/// ```text
///         x                      x
///        / \                     |
///     b /   \ a                  |  b_t + a_t
///      /  h  \                   |
///    v0 ----> v1    ==>          v0
///      \  t  /                   |
///     c \   / d                  |  c_t + d_t
///        \ /                     |
///         y                      y
/// ```
pub struct EdgeCollapser<'a> {
    dcel: &'a mut Dcel,
    fulledge: FullEdgeId,
    surviving_vertex: Option<VertexId>,
}

/// The half-edges of the two triangles, besides `h` and `t`, and their
/// twins.
struct Wings {
    a: HalfEdgeId,
    b: HalfEdgeId,
    c: HalfEdgeId,
    d: HalfEdgeId,
    a_t: HalfEdgeId,
    b_t: HalfEdgeId,
    c_t: HalfEdgeId,
    d_t: HalfEdgeId,
}

impl Wings {
    fn resolve(dcel: &Dcel, e: &EdgeHandles) -> Result<Self, TraversalError> {
        let a = dcel.at_halfedge(e.h).next().try_end()?;
        let b = dcel.at_halfedge(a).next().try_end()?;
        let c = dcel.at_halfedge(e.t).next().try_end()?;
        let d = dcel.at_halfedge(c).next().try_end()?;
        Ok(Wings {
            a,
            b,
            c,
            d,
            a_t: dcel.at_halfedge(a).twin().try_end()?,
            b_t: dcel.at_halfedge(b).twin().try_end()?,
            c_t: dcel.at_halfedge(c).twin().try_end()?,
            d_t: dcel.at_halfedge(d).twin().try_end()?,
        })
    }
}

impl<'a> EdgeCollapser<'a> {
    pub fn new(dcel: &'a mut Dcel, fulledge: FullEdgeId) -> Self {
        Self {
            dcel,
            fulledge,
            surviving_vertex: None,
        }
    }

    /// The merged vertex, once the collapse went through.
    pub fn surviving_vertex(&self) -> Option<VertexId> {
        self.surviving_vertex
    }

    /// The merged one-ring must stay a disk: both endpoints may only share
    /// the two opposite corners, and those must keep at least three edges.
    fn check_one_ring(&self, e: &EdgeHandles) -> Result<(), CollapseStatus> {
        let dcel = &*self.dcel;
        let invalid = |_| CollapseStatus::Edge(EdgeStatus::InvalidVertex);
        let ring0 = dcel.at_vertex(e.v0).neighbors().map_err(invalid)?;
        let ring1 = dcel.at_vertex(e.v1).neighbors().map_err(invalid)?;
        let shared = ring0.iter().filter(|v| ring1.contains(v)).count();
        if shared >= 3 {
            return Err(CollapseStatus::OneRingIntersectionProblem);
        }
        for corner in [e.x, e.y].into_iter().flatten() {
            if dcel.at_vertex(corner).valence().map_err(invalid)? <= 3 {
                return Err(CollapseStatus::OneRingIntersectionProblem);
            }
        }
        Ok(())
    }

    /// Projects every face that survives the collapse onto the plane between
    /// the two removed faces and rejects the collapse if any of them changes
    /// its winding there.
    fn check_inversion(&self, e: &EdgeHandles, merged: Vec3) -> Result<(), CollapseStatus> {
        let dcel = &*self.dcel;
        let (Some(f0), Some(f1)) = (e.f0, e.f1) else {
            return Err(CollapseStatus::BorderFullEdge);
        };
        let plane_normal = dcel
            .face_normal(f0)
            .zip(dcel.face_normal(f1))
            .and_then(|(n0, n1)| (n0 + n1).try_normalize())
            .ok_or(CollapseStatus::FaceInversion)?;
        let (u, w) = orthonormal_basis(plane_normal);
        let project = |p: Vec3| Vec2::new(p.dot(u), p.dot(w));

        let invalid = |_| CollapseStatus::Edge(EdgeStatus::InvalidFace);
        let mut faces = dcel.at_vertex(e.v0).adjacent_faces().map_err(invalid)?;
        faces.extend(dcel.at_vertex(e.v1).adjacent_faces().map_err(invalid)?);
        for f in faces.into_iter().unique() {
            if f == f0 || f == f1 {
                continue;
            }
            let vertices = dcel.face_vertices(f).map_err(invalid)?;
            if vertices.len() != 3 {
                return Err(CollapseStatus::Edge(EdgeStatus::DegenerateFace));
            }
            let before = vertices.iter().map(|&v| project(dcel[v].position)).collect_svec();
            let after = vertices
                .iter()
                .map(|&v| {
                    if v == e.v0 || v == e.v1 {
                        project(merged)
                    } else {
                        project(dcel[v].position)
                    }
                })
                .collect_svec();
            let area_before = signed_area_2d(before[0], before[1], before[2]);
            // Faces seen edge-on in the plane carry no winding
            let scale = (before[1] - before[0])
                .length_squared()
                .max((before[2] - before[0]).length_squared());
            if area_before.abs() <= EDGE_ON_TOLERANCE * scale {
                continue;
            }
            let area_after = signed_area_2d(after[0], after[1], after[2]);
            if area_before * area_after < 0.0 {
                return Err(CollapseStatus::FaceInversion);
            }
        }
        Ok(())
    }
}

impl<'a> EdgeOperation for EdgeCollapser<'a> {
    type Status = CollapseStatus;

    fn dcel(&self) -> &Dcel {
        self.dcel
    }

    fn fulledge(&self) -> FullEdgeId {
        self.fulledge
    }

    fn is_processable(&self, e: &EdgeHandles) -> Result<(), CollapseStatus> {
        if e.is_border() || (self.dcel.is_border(e.v0) && self.dcel.is_border(e.v1)) {
            return Err(CollapseStatus::BorderFullEdge);
        }
        self.check_one_ring(e)?;
        let merged = (self.dcel[e.v0].position + self.dcel[e.v1].position) * 0.5;
        self.check_inversion(e, merged)
    }

    fn apply(&mut self, e: &EdgeHandles) -> Result<(), CollapseStatus> {
        let (Some(f0), Some(f1), Some(x), Some(y)) = (e.f0, e.f1, e.x, e.y) else {
            return Err(CollapseStatus::BorderFullEdge);
        };
        let invalid = |_| CollapseStatus::Edge(EdgeStatus::InvalidHalfEdge);
        let w = Wings::resolve(self.dcel, e).map_err(invalid)?;
        let fe_a = self.dcel.at_halfedge(w.a).fulledge().try_end().map_err(invalid)?;
        let fe_b = self.dcel.at_halfedge(w.b).fulledge().try_end().map_err(invalid)?;
        let fe_c = self.dcel.at_halfedge(w.c).fulledge().try_end().map_err(invalid)?;
        let fe_d = self.dcel.at_halfedge(w.d).fulledge().try_end().map_err(invalid)?;
        let moved = self
            .dcel
            .at_vertex(e.v1)
            .outgoing_halfedges()
            .map_err(invalid)?;

        // Detach everything that goes away, then stitch the survivors
        self.dcel.unbind(e.v1);
        for f in [f0, f1] {
            self.dcel.unbind(f);
        }
        for fe in [e.fulledge, fe_a, fe_d] {
            self.dcel.unbind(fe);
        }
        for h in [e.h, e.t, w.a, w.b, w.c, w.d] {
            self.dcel.unbind(h);
        }

        for h in moved {
            if h != e.t && h != w.a {
                self.dcel[h].vertex = Some(e.v0);
            }
        }
        self.dcel.link_twins(w.b_t, w.a_t, fe_b);
        self.dcel.link_twins(w.c_t, w.d_t, fe_c);
        self.dcel[e.v0].halfedge = Some(w.b_t);
        self.dcel[x].halfedge = Some(w.a_t);
        self.dcel[y].halfedge = Some(w.c_t);

        let (p0, p1) = (self.dcel[e.v0].position, self.dcel[e.v1].position);
        let (n0, n1) = (self.dcel[e.v0].normal, self.dcel[e.v1].normal);
        let v0 = &mut self.dcel[e.v0];
        v0.position = (p0 + p1) * 0.5;
        v0.normal = (n0 + n1).try_normalize().unwrap_or(n0);

        for h in [e.h, e.t, w.a, w.b, w.c, w.d] {
            self.dcel
                .remove(h)
                .ok_or(CollapseStatus::HalfEdgeNotRemoved)?;
        }
        for fe in [e.fulledge, fe_a, fe_d] {
            self.dcel
                .remove(fe)
                .ok_or(CollapseStatus::FullEdgeNotRemoved)?;
        }
        for f in [f0, f1] {
            self.dcel.remove(f).ok_or(CollapseStatus::FaceNotRemoved)?;
        }
        self.dcel
            .remove(e.v1)
            .ok_or(CollapseStatus::VertexNotRemoved)?;

        self.surviving_vertex = Some(e.v0);
        Ok(())
    }
}

impl<'a> AlgorithmStages for EdgeCollapser<'a> {
    type ExitStatus = CollapseStatus;
    const NAME: &'static str = "EdgeCollapser";

    fn config_check(&mut self) -> Result<(), CollapseStatus> {
        self.check_index()
    }

    fn preprocessing(&mut self) -> Result<(), CollapseStatus> {
        self.check_present()
    }

    fn processing(&mut self) -> Result<CollapseStatus, CollapseStatus> {
        self.process_edge()
    }

    /// The removed edge must be gone and the survivor must still be anchored.
    fn postprocessing(&mut self) -> Result<(), CollapseStatus> {
        let Some(v0) = self.surviving_vertex else {
            return Ok(());
        };
        if self.dcel.contains(self.fulledge) {
            return Err(CollapseStatus::FullEdgeNotRemoved);
        }
        if !self.dcel.is_valid(v0) {
            return Err(CollapseStatus::Edge(EdgeStatus::InvalidVertex));
        }
        Ok(())
    }
}
