// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use slotmap::SecondaryMap;

use crate::prelude::*;

/// The first structural violation found by [`Dcel::check_consistency`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConsistencyError {
    Traversal(TraversalError),
    MissingLink(HalfEdgeId),
    DanglingLink(HalfEdgeId),
    TwinMismatch(HalfEdgeId),
    NextPrevMismatch(HalfEdgeId),
    EndpointMismatch(HalfEdgeId),
    FaceMismatch(HalfEdgeId),
    FullEdgeMismatch(HalfEdgeId),
    UnclosedLoop(HalfEdgeId),
    DegenerateLoop(HalfEdgeId),
    OrphanVertex(VertexId),
    OrphanFullEdge(FullEdgeId),
    OrphanFace(FaceId),
    HalfEdgeCount { halfedges: usize, fulledges: usize },
}
impl std::fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{self:?}"))
    }
}
impl std::error::Error for ConsistencyError {}

impl From<TraversalError> for ConsistencyError {
    fn from(err: TraversalError) -> Self {
        ConsistencyError::Traversal(err)
    }
}

impl Dcel {
    pub fn is_consistent(&self) -> bool {
        match self.check_consistency() {
            Ok(()) => true,
            Err(err) => {
                log::debug!("Inconsistent mesh: {err}");
                false
            }
        }
    }

    /// Verifies every structural invariant of the container:
    ///
    /// - Every half-edge has all of its links, and they point at live
    ///   elements.
    /// - `twin` is an involution without fixed points, `next` and `prev` are
    ///   inverse, and a half-edge ends where its twin starts.
    /// - `next` loops close within [`MAX_LOOP_ITERATIONS`], share a single
    ///   face (or none), and faces are at least triangles.
    /// - Twins share a full-edge, and that full-edge points at one of them.
    /// - Vertex, full-edge and face anchors point back at their owner.
    /// - There are exactly two half-edges per full-edge.
    #[profiling::function]
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        use ConsistencyError::*;

        for (h, halfedge) in self.iter_halfedges() {
            let (Some(vertex), Some(next), Some(prev), Some(twin), Some(fulledge)) = (
                halfedge.vertex,
                halfedge.next,
                halfedge.prev,
                halfedge.twin,
                halfedge.fulledge,
            ) else {
                return Err(MissingLink(h));
            };
            if !self.contains(vertex)
                || !self.contains(next)
                || !self.contains(prev)
                || !self.contains(twin)
                || !self.contains(fulledge)
                || halfedge.face.map(|f| !self.contains(f)).unwrap_or(false)
            {
                return Err(DanglingLink(h));
            }
            if twin == h || self[twin].twin != Some(h) {
                return Err(TwinMismatch(h));
            }
            if self[next].prev != Some(h) || self[prev].next != Some(h) {
                return Err(NextPrevMismatch(h));
            }
            if self[twin].vertex != self[next].vertex {
                return Err(EndpointMismatch(h));
            }
            if self[next].face != halfedge.face {
                return Err(FaceMismatch(h));
            }
            let owner = self[fulledge].halfedge;
            if self[twin].fulledge != Some(fulledge) || (owner != Some(h) && owner != Some(twin))
            {
                return Err(FullEdgeMismatch(h));
            }
        }

        let mut visited = SecondaryMap::<HalfEdgeId, ()>::new();
        for (h0, halfedge) in self.iter_halfedges() {
            if visited.contains_key(h0) {
                continue;
            }
            let mut h = h0;
            let mut count = 0;
            loop {
                if count > MAX_LOOP_ITERATIONS || visited.insert(h, ()).is_some() {
                    return Err(UnclosedLoop(h0));
                }
                count += 1;
                h = self.at_halfedge(h).next().try_end()?;
                if h == h0 {
                    break;
                }
            }
            if halfedge.face.is_some() && count < 3 {
                return Err(DegenerateLoop(h0));
            }
        }

        for (v, vertex) in self.iter_vertices() {
            match vertex.halfedge {
                Some(h) if self.halfedge(h).and_then(|h| h.vertex) == Some(v) => (),
                _ => return Err(OrphanVertex(v)),
            }
            // Walks the fan, which fails on a broken or non-manifold fan.
            self.at_vertex(v).outgoing_halfedges()?;
        }

        for (e, fulledge) in self.iter_fulledges() {
            match fulledge.halfedge {
                Some(h) if self.halfedge(h).and_then(|h| h.fulledge) == Some(e) => (),
                _ => return Err(OrphanFullEdge(e)),
            }
        }

        for (f, face) in self.iter_faces() {
            match face.halfedge {
                Some(h) if self.halfedge(h).and_then(|h| h.face) == Some(f) => (),
                _ => return Err(OrphanFace(f)),
            }
        }

        if self.num_halfedges() != 2 * self.num_fulledges() {
            return Err(HalfEdgeCount {
                halfedges: self.num_halfedges(),
                fulledges: self.num_fulledges(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::test_meshes;

    #[test]
    pub fn test_fresh_meshes_are_consistent() {
        for mesh in [
            test_meshes::tetrahedron(),
            test_meshes::octahedron(),
            test_meshes::icosphere(1),
            test_meshes::cube(),
        ] {
            let dcel = Dcel::try_from(&mesh).unwrap();
            assert_eq!(dcel.check_consistency(), Ok(()));
        }
        let open = Dcel::from_triangle_mesh_with_border(&test_meshes::grid(3)).unwrap();
        assert_eq!(open.check_consistency(), Ok(()));
        assert!(Dcel::new().is_consistent());
    }

    #[test]
    pub fn test_detects_broken_links() {
        let mesh = test_meshes::octahedron();

        let mut dcel = Dcel::try_from(&mesh).unwrap();
        let (h, _) = dcel.iter_halfedges().next().unwrap();
        let twin = dcel[h].twin.unwrap();
        dcel[twin].twin = Some(twin);
        assert!(matches!(
            dcel.check_consistency(),
            Err(ConsistencyError::TwinMismatch(_))
        ));

        let mut dcel = Dcel::try_from(&mesh).unwrap();
        let (h, _) = dcel.iter_halfedges().next().unwrap();
        let next = dcel[h].next.unwrap();
        dcel[next].prev = None;
        assert!(matches!(
            dcel.check_consistency(),
            Err(ConsistencyError::MissingLink(_) | ConsistencyError::NextPrevMismatch(_))
        ));

        let mut dcel = Dcel::try_from(&mesh).unwrap();
        dcel.insert(Face::default());
        assert!(matches!(
            dcel.check_consistency(),
            Err(ConsistencyError::OrphanFace(_))
        ));

        let mut dcel = Dcel::try_from(&mesh).unwrap();
        dcel.insert(FullEdge::default());
        assert!(matches!(
            dcel.check_consistency(),
            Err(ConsistencyError::OrphanFullEdge(_))
        ));

        let mut dcel = Dcel::try_from(&mesh).unwrap();
        let (f, _) = dcel.iter_faces().next().unwrap();
        let h = dcel.at_face(f).halfedge().end();
        dcel[h].face = None;
        assert!(!dcel.is_consistent());
    }
}
