// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::{EdgeHandles, EdgeOperation, EdgeStatus};
use crate::prelude::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SplitStatus {
    #[default]
    Success,
    Edge(EdgeStatus),
    VertexNotInserted,
    HalfEdgeNotInserted,
    FullEdgeNotInserted,
    FaceNotInserted,
}
crate::impl_status_error!(SplitStatus);

impl ExitStatus for SplitStatus {
    fn code(&self) -> u32 {
        match self {
            SplitStatus::Success => 0,
            SplitStatus::Edge(status) => status.code(),
            SplitStatus::VertexNotInserted => 24,
            SplitStatus::HalfEdgeNotInserted => 25,
            SplitStatus::FullEdgeNotInserted => 26,
            SplitStatus::FaceNotInserted => 27,
        }
    }
}

impl From<EdgeStatus> for SplitStatus {
    fn from(status: EdgeStatus) -> Self {
        SplitStatus::Edge(status)
    }
}

/// Inserts a vertex at the midpoint of a full-edge and splits each adjacent
/// triangle in two. A border side has no triangle to split: the new vertex
/// is only inserted in its border loop.
///
/// ```text
///         x                      x
///        / \                    /|\
///   f0  /   \                  / | \
///      /  h  \                /  |  \
///    v0 ----> v1    ==>     v0 - m -> v1
///      \  t  /                \  |  /
///   f1  \   /                  \ | /
///        \ /                    \|/
///         y                      y
/// ```
pub struct EdgeSplitter<'a> {
    dcel: &'a mut Dcel,
    fulledge: FullEdgeId,
    created_vertex: Option<VertexId>,
    created_halfedges: SVecN<HalfEdgeId, 6>,
    created_fulledges: SVec<FullEdgeId>,
    created_faces: SVecN<FaceId, 2>,
}

impl<'a> EdgeSplitter<'a> {
    pub fn new(dcel: &'a mut Dcel, fulledge: FullEdgeId) -> Self {
        Self {
            dcel,
            fulledge,
            created_vertex: None,
            created_halfedges: SVecN::new(),
            created_fulledges: SVec::new(),
            created_faces: SVecN::new(),
        }
    }

    /// The midpoint vertex, once the split went through.
    pub fn created_vertex(&self) -> Option<VertexId> {
        self.created_vertex
    }

    fn new_halfedge(&mut self, origin: VertexId) -> HalfEdgeId {
        let h = self.dcel.alloc_halfedge(HalfEdge {
            vertex: Some(origin),
            ..Default::default()
        });
        self.created_halfedges.push(h);
        h
    }

    /// Splits one side of the edge. `first` ends at the new vertex and
    /// `second` starts there; both already replace the old half-edge of
    /// this side in the twin structure.
    fn split_side(
        &mut self,
        first: HalfEdgeId,
        second: HalfEdgeId,
        face: Option<FaceId>,
    ) -> Result<(), SplitStatus> {
        let invalid = |_| SplitStatus::Edge(EdgeStatus::InvalidHalfEdge);
        // Read the old loop before relinking anything
        let a = self.dcel.at_halfedge(first).next().try_end().map_err(invalid)?;

        let Some(face) = face else {
            self.dcel.link(first, second);
            self.dcel.link(second, a);
            return Ok(());
        };

        let b = self.dcel.at_halfedge(a).next().try_end().map_err(invalid)?;
        let x = self.dcel.at_halfedge(b).vertex().try_end().map_err(invalid)?;
        let m = self.dcel.at_halfedge(second).vertex().try_end().map_err(invalid)?;

        let to_m = self.new_halfedge(x);
        let from_m = self.new_halfedge(m);
        let fe = self.dcel.alloc_fulledge(None);
        self.created_fulledges.push(fe);
        self.dcel.link_twins(to_m, from_m, fe);

        // The old face keeps the triangle (v0, m, x), the new one gets (m, v1, x)
        self.dcel.link(first, from_m);
        self.dcel.link(from_m, b);
        self.dcel.link(b, first);
        self.dcel.link(second, a);
        self.dcel.link(a, to_m);
        self.dcel.link(to_m, second);

        self.dcel[face].halfedge = Some(first);
        let new_face = self.dcel.alloc_face(Some(second));
        self.created_faces.push(new_face);

        let invalid_face = |_| SplitStatus::Edge(EdgeStatus::InvalidFace);
        self.dcel.bind(face).map_err(invalid_face)?;
        self.dcel.bind(new_face).map_err(invalid_face)?;
        Ok(())
    }
}

impl<'a> EdgeOperation for EdgeSplitter<'a> {
    type Status = SplitStatus;

    fn dcel(&self) -> &Dcel {
        self.dcel
    }

    fn fulledge(&self) -> FullEdgeId {
        self.fulledge
    }

    /// Any well formed edge can be split.
    fn is_processable(&self, _handles: &EdgeHandles) -> Result<(), SplitStatus> {
        Ok(())
    }

    fn apply(&mut self, e: &EdgeHandles) -> Result<(), SplitStatus> {
        let (p0, p1) = (self.dcel[e.v0].position, self.dcel[e.v1].position);
        let (n0, n1) = (self.dcel[e.v0].normal, self.dcel[e.v1].normal);
        let normal = (n0 + n1).try_normalize().unwrap_or(n0);

        let m = self.dcel.alloc_vertex((p0 + p1) * 0.5, normal);
        self.created_vertex = Some(m);

        // h: v0 -> m, h2: m -> v1, t: v1 -> m, t2: m -> v0
        let h2 = self.new_halfedge(m);
        let t2 = self.new_halfedge(m);
        let fe2 = self.dcel.alloc_fulledge(None);
        self.created_fulledges.push(fe2);
        self.dcel.link_twins(e.h, t2, e.fulledge);
        self.dcel.link_twins(h2, e.t, fe2);
        self.dcel[m].halfedge = Some(h2);

        self.split_side(e.h, h2, e.f0)?;
        self.split_side(e.t, t2, e.f1)?;
        Ok(())
    }
}

impl<'a> AlgorithmStages for EdgeSplitter<'a> {
    type ExitStatus = SplitStatus;
    const NAME: &'static str = "EdgeSplitter";

    fn config_check(&mut self) -> Result<(), SplitStatus> {
        self.check_index()
    }

    fn preprocessing(&mut self) -> Result<(), SplitStatus> {
        self.check_present()
    }

    fn processing(&mut self) -> Result<SplitStatus, SplitStatus> {
        self.process_edge()
    }

    /// Every element the split allocated must be live.
    fn postprocessing(&mut self) -> Result<(), SplitStatus> {
        match self.created_vertex {
            Some(v) if self.dcel.contains(v) => {}
            _ => return Err(SplitStatus::VertexNotInserted),
        }
        if !self.created_halfedges.iter().all(|&h| self.dcel.contains(h)) {
            return Err(SplitStatus::HalfEdgeNotInserted);
        }
        if !self.created_fulledges.iter().all(|&e| self.dcel.contains(e)) {
            return Err(SplitStatus::FullEdgeNotInserted);
        }
        if !self.created_faces.iter().all(|&f| self.dcel.contains(f)) {
            return Err(SplitStatus::FaceNotInserted);
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::edge_ops::{collapse_edge, split_edge};
    use crate::test_meshes;

    #[test]
    pub fn test_split_tetrahedron() {
        test_meshes::init_logging();
        let mut dcel = Dcel::try_from(&test_meshes::tetrahedron()).unwrap();
        let (e, _) = dcel.iter_fulledges().next().unwrap();
        let (a, b) = dcel.edge_endpoints(e).unwrap();
        let expected = (dcel[a].position + dcel[b].position) * 0.5;

        let mut alg = Algorithm::new(EdgeSplitter::new(&mut dcel, e));
        assert_eq!(alg.run(), 0);
        assert!(alg.is_completed());
        let m = alg.stages().created_vertex().unwrap();

        assert_eq!(dcel.num_vertices(), 5);
        assert_eq!(dcel.num_faces(), 6);
        assert_eq!(dcel.num_fulledges(), 9);
        assert_eq!(dcel.num_halfedges(), 18);
        assert!(dcel.is_consistent());
        assert_eq!(dcel[m].position, expected);
        assert_eq!(dcel.at_vertex(m).valence().unwrap(), 4);
        let neighbors = dcel.at_vertex(m).neighbors().unwrap();
        assert!(neighbors.contains(&a) && neighbors.contains(&b));
        for f in dcel.at_vertex(m).adjacent_faces().unwrap() {
            assert_eq!(dcel.face_edges(f).unwrap().len(), 3);
        }
    }

    #[test]
    pub fn test_split_border_edge() {
        let mut dcel = Dcel::from_triangle_mesh_with_border(&test_meshes::grid(1)).unwrap();
        let border = dcel
            .iter_fulledges()
            .map(|(e, _)| e)
            .find(|&e| dcel.is_border(e))
            .unwrap();
        let (v, he, fe, f) = (
            dcel.num_vertices(),
            dcel.num_halfedges(),
            dcel.num_fulledges(),
            dcel.num_faces(),
        );
        let m = split_edge(&mut dcel, border).unwrap();
        assert_eq!(dcel.num_vertices(), v + 1);
        assert_eq!(dcel.num_halfedges(), he + 4);
        assert_eq!(dcel.num_fulledges(), fe + 2);
        assert_eq!(dcel.num_faces(), f + 1);
        assert!(dcel.is_consistent());
        assert!(dcel.is_border(m));
        assert_eq!(dcel.at_vertex(m).valence().unwrap(), 3);
    }

    #[test]
    pub fn test_split_then_collapse_restores_counts() {
        let mut dcel = Dcel::try_from(&test_meshes::octahedron()).unwrap();
        let counts = |d: &Dcel| (d.num_vertices(), d.num_halfedges(), d.num_fulledges(), d.num_faces());
        let before = counts(&dcel);

        let (e, _) = dcel.iter_fulledges().next().unwrap();
        let (v0, _) = dcel.edge_endpoints(e).unwrap();
        let m = split_edge(&mut dcel, e).unwrap();
        assert_eq!(dcel.num_vertices(), 7);
        assert_eq!(dcel.num_faces(), 10);

        // The original full-edge now runs from v0 to the midpoint
        assert_eq!(dcel.edge_endpoints(e).unwrap(), (v0, m));
        let survivor = collapse_edge(&mut dcel, e).unwrap();
        assert_eq!(survivor, Some(v0));
        assert_eq!(counts(&dcel), before);
        assert!(dcel.is_consistent());
        assert!(!dcel.contains(m));
    }
}
