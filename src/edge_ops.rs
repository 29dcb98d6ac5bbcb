// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Local edits of a single full-edge. Each operator is an [`AlgorithmStages`]
//! implementation, so it is run through an [`Algorithm`] and reports a typed
//! exit status. The shared structural checks live here.
//!
//! An edit that is well formed but would break manifoldness or degrade the
//! mesh is not a failure: the operator completes without touching the mesh
//! and reports why through its exit status.

use crate::prelude::*;

pub mod collapse;
pub mod flip;
pub mod split;

pub use collapse::{CollapseStatus, EdgeCollapser};
pub use flip::{EdgeFlipper, FlipParameter, FlipStatus};
pub use split::{EdgeSplitter, SplitStatus};

/// Structural problems with the edge being edited, shared by all operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum EdgeStatus {
    InvalidIndex = 1,
    EdgeNotPresent = 2,
    InvalidFullEdge = 3,
    InvalidHalfEdge = 4,
    InvalidVertex = 5,
    InvalidFace = 6,
    DegenerateFullEdge = 7,
    DegenerateFace = 8,
}
crate::impl_status_error!(EdgeStatus);

impl EdgeStatus {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// The elements around a full-edge, seen from its representative half-edge
/// `h: v0 -> v1` and its twin `t: v1 -> v0`. `x` and `y` are the corners
/// opposite to the edge in the faces of `h` and `t`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EdgeHandles {
    pub fulledge: FullEdgeId,
    pub h: HalfEdgeId,
    pub t: HalfEdgeId,
    pub v0: VertexId,
    pub v1: VertexId,
    pub f0: Option<FaceId>,
    pub f1: Option<FaceId>,
    pub x: Option<VertexId>,
    pub y: Option<VertexId>,
}

impl EdgeHandles {
    /// Resolves and validates the neighborhood of `fulledge`. Faces must be
    /// triangles.
    pub fn resolve(dcel: &Dcel, fulledge: FullEdgeId) -> Result<Self, EdgeStatus> {
        use EdgeStatus::*;
        if !dcel.contains(fulledge) {
            return Err(EdgeNotPresent);
        }
        let h = dcel
            .at_fulledge(fulledge)
            .halfedge()
            .try_end()
            .map_err(|_| InvalidFullEdge)?;
        let t = dcel
            .at_halfedge(h)
            .twin()
            .try_end()
            .map_err(|_| InvalidHalfEdge)?;
        if !dcel.is_valid(h) || !dcel.is_valid(t) || dcel[t].twin != Some(h) {
            return Err(InvalidHalfEdge);
        }
        if dcel[h].fulledge != Some(fulledge) || dcel[t].fulledge != Some(fulledge) {
            return Err(InvalidFullEdge);
        }

        let (v0, v1) = dcel
            .at_halfedge(h)
            .src_dst_pair()
            .map_err(|_| InvalidVertex)?;
        if dcel[t].vertex != Some(v1) {
            return Err(InvalidHalfEdge);
        }
        if !dcel.is_valid(v0) || !dcel.is_valid(v1) {
            return Err(InvalidVertex);
        }
        if v0 == v1 {
            return Err(DegenerateFullEdge);
        }

        let f0 = dcel[h].face;
        let f1 = dcel[t].face;
        if f0.is_none() && f1.is_none() {
            return Err(DegenerateFullEdge);
        }
        if f0.is_some() && f0 == f1 {
            return Err(DegenerateFace);
        }
        let opposite = |he: HalfEdgeId, face: Option<FaceId>| -> Result<Option<VertexId>, EdgeStatus> {
            let Some(face) = face else {
                return Ok(None);
            };
            if !dcel.is_valid(face) {
                return Err(InvalidFace);
            }
            let sides = dcel.face_edges(face).map_err(|_| InvalidFace)?;
            if sides.len() != 3 {
                return Err(DegenerateFace);
            }
            dcel.at_halfedge(he)
                .next()
                .dst_vertex()
                .try_end()
                .map(Some)
                .map_err(|_| InvalidVertex)
        };
        let x = opposite(h, f0)?;
        let y = opposite(t, f1)?;

        Ok(EdgeHandles {
            fulledge,
            h,
            t,
            v0,
            v1,
            f0,
            f1,
            x,
            y,
        })
    }

    pub fn is_border(&self) -> bool {
        self.f0.is_none() || self.f1.is_none()
    }
}

/// The part of an edge operator that differs between split, collapse and
/// flip. The provided methods implement the shared stage bodies.
pub trait EdgeOperation {
    type Status: ExitStatus + From<EdgeStatus>;

    fn dcel(&self) -> &Dcel;
    fn fulledge(&self) -> FullEdgeId;

    /// The operator specific legality predicate. `Err` carries the reason
    /// the edit would break the mesh; nothing has been modified then.
    fn is_processable(&self, handles: &EdgeHandles) -> Result<(), Self::Status>;

    /// Performs the edit on an edge that passed every check.
    fn apply(&mut self, handles: &EdgeHandles) -> Result<(), Self::Status>;

    fn check_index(&self) -> Result<(), Self::Status> {
        use slotmap::Key;
        if self.fulledge().is_null() {
            return Err(EdgeStatus::InvalidIndex.into());
        }
        Ok(())
    }

    fn check_present(&self) -> Result<(), Self::Status> {
        if !self.dcel().contains(self.fulledge()) {
            return Err(EdgeStatus::EdgeNotPresent.into());
        }
        if !self.dcel().is_valid(self.fulledge()) {
            return Err(EdgeStatus::InvalidFullEdge.into());
        }
        Ok(())
    }

    fn check_fulledge(&self) -> Result<EdgeHandles, Self::Status> {
        Ok(EdgeHandles::resolve(self.dcel(), self.fulledge())?)
    }

    fn process_edge(&mut self) -> Result<Self::Status, Self::Status> {
        let handles = self.check_fulledge()?;
        if let Err(status) = self.is_processable(&handles) {
            return Ok(status);
        }
        self.apply(&handles)?;
        Ok(Self::Status::default())
    }
}

/// Splits `edge` at its midpoint. Returns the new vertex.
pub fn split_edge(dcel: &mut Dcel, edge: FullEdgeId) -> Result<VertexId> {
    let splitter = Algorithm::new(EdgeSplitter::new(dcel, edge));
    run_to_result(splitter)?
        .created_vertex()
        .ok_or_else(|| anyhow!("Split of {edge:?} did not create a vertex"))
}

/// Collapses `edge` into its first endpoint. Returns the surviving vertex,
/// or `None` if the collapse would have been illegal.
pub fn collapse_edge(dcel: &mut Dcel, edge: FullEdgeId) -> Result<Option<VertexId>> {
    let collapser = Algorithm::new(EdgeCollapser::new(dcel, edge));
    Ok(run_to_result(collapser)?.surviving_vertex())
}

/// Flips `edge`. Returns whether the flip was legal and performed.
pub fn flip_edge(dcel: &mut Dcel, edge: FullEdgeId, parameter: FlipParameter) -> Result<bool> {
    let flipper = Algorithm::new(EdgeFlipper::new(dcel, edge, parameter));
    Ok(run_to_result(flipper)?.is_flipped())
}

/// Runs an edge operator. Legality rejections are not errors.
fn run_to_result<S: AlgorithmStages>(mut alg: Algorithm<S>) -> Result<S> {
    alg.run();
    if alg.is_failed() {
        return Err(anyhow::Error::new(alg.exit_status()))
            .with_context(|| format!("{} failed in state {:?}", S::NAME, alg.state()));
    }
    Ok(alg.into_inner())
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::test_meshes;

    #[test]
    pub fn test_resolve_handles() {
        let dcel = Dcel::try_from(&test_meshes::octahedron()).unwrap();
        for (e, _) in dcel.iter_fulledges() {
            let handles = EdgeHandles::resolve(&dcel, e).unwrap();
            assert_eq!(dcel.at_halfedge(handles.h).twin().end(), handles.t);
            assert_ne!(handles.x, handles.y);
            assert!(!handles.is_border());
        }
    }

    #[test]
    pub fn test_resolve_rejects_removed_and_border() {
        let mut dcel = Dcel::from_triangle_mesh_with_border(&test_meshes::grid(1)).unwrap();
        let border = dcel
            .iter_fulledges()
            .map(|(e, _)| e)
            .find(|&e| dcel.is_border(e))
            .unwrap();
        let handles = EdgeHandles::resolve(&dcel, border).unwrap();
        assert!(handles.is_border());
        assert!(handles.x.is_some() != handles.y.is_some());

        dcel.remove(border);
        assert_eq!(
            EdgeHandles::resolve(&dcel, border),
            Err(EdgeStatus::EdgeNotPresent)
        );
    }

    #[test]
    pub fn test_failures_become_errors() {
        let mut dcel = Dcel::try_from(&test_meshes::octahedron()).unwrap();
        assert!(split_edge(&mut dcel, FullEdgeId::default()).is_err());
        let (e, _) = dcel.iter_fulledges().next().unwrap();
        dcel.remove(e);
        assert!(collapse_edge(&mut dcel, e).is_err());
        assert!(flip_edge(&mut dcel, e, FlipParameter::default()).is_err());
    }
}
