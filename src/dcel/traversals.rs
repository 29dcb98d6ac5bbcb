// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

pub trait Location {}

impl Location for VertexId {}
impl Location for HalfEdgeId {}
impl Location for FullEdgeId {}
impl Location for FaceId {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TraversalError {
    NoSuchVertex(VertexId),
    NoSuchHalfEdge(HalfEdgeId),
    NoSuchFullEdge(FullEdgeId),
    NoSuchFace(FaceId),
    VertexHasNoHalfedge(VertexId),
    FaceHasNoHalfedge(FaceId),
    FullEdgeHasNoHalfedge(FullEdgeId),
    HalfEdgeHasNoNext(HalfEdgeId),
    HalfEdgeHasNoPrev(HalfEdgeId),
    HalfEdgeHasNoTwin(HalfEdgeId),
    HalfEdgeHasNoVertex(HalfEdgeId),
    HalfEdgeHasNoFullEdge(HalfEdgeId),
    HalfEdgeHasNoFace(HalfEdgeId),
    NoHalfedgeTo(VertexId),
    HalfedgeBadLoop(HalfEdgeId),
}
impl std::fmt::Display for TraversalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{self:?}"))
    }
}
impl std::error::Error for TraversalError {}

#[derive(Clone, Copy)]
pub struct ValidTraversal<'a, L>
where
    L: Location,
{
    inner: &'a Dcel,
    location: L,
}

pub type Traversal<'a, L> = Result<ValidTraversal<'a, L>, TraversalError>;

impl Dcel {
    fn try_vertex(&self, id: VertexId) -> Result<&Vertex, TraversalError> {
        self.vertex(id).ok_or(TraversalError::NoSuchVertex(id))
    }

    fn try_halfedge(&self, id: HalfEdgeId) -> Result<&HalfEdge, TraversalError> {
        self.halfedge(id).ok_or(TraversalError::NoSuchHalfEdge(id))
    }

    fn try_fulledge(&self, id: FullEdgeId) -> Result<&FullEdge, TraversalError> {
        self.fulledge(id).ok_or(TraversalError::NoSuchFullEdge(id))
    }

    fn try_face(&self, id: FaceId) -> Result<&Face, TraversalError> {
        self.face(id).ok_or(TraversalError::NoSuchFace(id))
    }
}

/* ===================== */
/* Traversal on vertices */
/* ===================== */

pub trait VertexTraversal<'a> {
    fn halfedge(&'a self) -> Traversal<'a, HalfEdgeId>;
}

impl<'a> VertexTraversal<'a> for Traversal<'a, VertexId> {
    fn halfedge(&'a self) -> Traversal<'a, HalfEdgeId> {
        self.and_then(|valid| {
            Ok(ValidTraversal {
                inner: valid.inner,
                location: valid
                    .inner
                    .try_vertex(valid.location)?
                    .halfedge
                    .ok_or(TraversalError::VertexHasNoHalfedge(valid.location))?,
            })
        })
    }
}

/* ================== */
/* Traversal on faces */
/* ================== */

pub trait FaceTraversal<'a> {
    fn halfedge(&'a self) -> Traversal<'a, HalfEdgeId>;
}
impl<'a> FaceTraversal<'a> for Traversal<'a, FaceId> {
    fn halfedge(&'a self) -> Traversal<'a, HalfEdgeId> {
        self.and_then(|valid| {
            Ok(ValidTraversal {
                inner: valid.inner,
                location: valid
                    .inner
                    .try_face(valid.location)?
                    .halfedge
                    .ok_or(TraversalError::FaceHasNoHalfedge(valid.location))?,
            })
        })
    }
}

/* ======================= */
/* Traversal on full-edges */
/* ======================= */

pub trait FullEdgeTraversal<'a> {
    fn halfedge(&'a self) -> Traversal<'a, HalfEdgeId>;
}
impl<'a> FullEdgeTraversal<'a> for Traversal<'a, FullEdgeId> {
    fn halfedge(&'a self) -> Traversal<'a, HalfEdgeId> {
        self.and_then(|valid| {
            Ok(ValidTraversal {
                inner: valid.inner,
                location: valid
                    .inner
                    .try_fulledge(valid.location)?
                    .halfedge
                    .ok_or(TraversalError::FullEdgeHasNoHalfedge(valid.location))?,
            })
        })
    }
}

/* ====================== */
/* Traversal on halfedges */
/* ====================== */

pub trait HalfEdgeTraversal<'a> {
    fn twin(&'a self) -> Traversal<'a, HalfEdgeId>;
    fn next(&'a self) -> Traversal<'a, HalfEdgeId>;
    fn prev(&'a self) -> Traversal<'a, HalfEdgeId>;
    fn face(&'a self) -> Traversal<'a, FaceId>;
    fn vertex(&'a self) -> Traversal<'a, VertexId>;
    fn fulledge(&'a self) -> Traversal<'a, FullEdgeId>;
    fn face_or_boundary(&'a self) -> Result<Option<FaceId>, TraversalError>;
}

macro_rules! halfedge_step {
    ($lt:lifetime, $name:ident, $field:ident, $loc:ty, $err:ident) => {
        fn $name(&$lt self) -> Traversal<$lt, $loc> {
            self.and_then(|valid| {
                Ok(ValidTraversal {
                    inner: valid.inner,
                    location: valid
                        .inner
                        .try_halfedge(valid.location)?
                        .$field
                        .ok_or(TraversalError::$err(valid.location))?,
                })
            })
        }
    };
}

impl<'a> HalfEdgeTraversal<'a> for Traversal<'a, HalfEdgeId> {
    halfedge_step!('a, twin, twin, HalfEdgeId, HalfEdgeHasNoTwin);
    halfedge_step!('a, next, next, HalfEdgeId, HalfEdgeHasNoNext);
    halfedge_step!('a, prev, prev, HalfEdgeId, HalfEdgeHasNoPrev);
    halfedge_step!('a, face, face, FaceId, HalfEdgeHasNoFace);
    halfedge_step!('a, vertex, vertex, VertexId, HalfEdgeHasNoVertex);
    halfedge_step!('a, fulledge, fulledge, FullEdgeId, HalfEdgeHasNoFullEdge);

    fn face_or_boundary(&'a self) -> Result<Option<FaceId>, TraversalError> {
        self.and_then(|valid| Ok(valid.inner.try_halfedge(valid.location)?.face))
    }
}

/* =================== */
/*  Generic traversal  */
/* =================== */

pub trait AnyTraversal<'a, L> {
    fn end(&'a self) -> L;
    fn try_end(&'a self) -> Result<L, TraversalError>;
}
impl<'a, L> AnyTraversal<'a, L> for Traversal<'a, L>
where
    L: Location + Copy,
{
    fn end(&'a self) -> L {
        self.map(|valid| valid.location)
            .unwrap_or_else(|err| panic!("Error during traversal: {err:?}"))
    }

    fn try_end(&'a self) -> Result<L, TraversalError> {
        self.map(|valid| valid.location)
    }
}

/* ============ */
/*  Initiators  */
/* ============ */

impl Dcel {
    pub fn at_halfedge(&self, halfedge_id: HalfEdgeId) -> Traversal<'_, HalfEdgeId> {
        Ok(ValidTraversal {
            inner: self,
            location: halfedge_id,
        })
    }

    pub fn at_fulledge(&self, fulledge_id: FullEdgeId) -> Traversal<'_, FullEdgeId> {
        Ok(ValidTraversal {
            inner: self,
            location: fulledge_id,
        })
    }

    pub fn at_face(&self, face_id: FaceId) -> Traversal<'_, FaceId> {
        Ok(ValidTraversal {
            inner: self,
            location: face_id,
        })
    }

    pub fn at_vertex(&self, vertex_id: VertexId) -> Traversal<'_, VertexId> {
        Ok(ValidTraversal {
            inner: self,
            location: vertex_id,
        })
    }
}

/* ================ */
/*  Vertex Helpers  */
/* ================ */

pub trait VertexTraversalHelpers<'a> {
    fn outgoing_halfedges(&'a self) -> Result<SVecN<HalfEdgeId, 8>, TraversalError>;
    fn incoming_halfedges(&'a self) -> Result<SVecN<HalfEdgeId, 8>, TraversalError>;
    fn halfedge_to(&self, other: VertexId) -> Traversal<HalfEdgeId>;
    fn adjacent_faces(&self) -> Result<SVecN<FaceId, 8>, TraversalError>;
    fn neighbors(&self) -> Result<SVecN<VertexId, 8>, TraversalError>;
    fn valence(&self) -> Result<usize, TraversalError>;
}

impl<'a> VertexTraversalHelpers<'a> for Traversal<'a, VertexId> {
    fn outgoing_halfedges(&'a self) -> Result<SVecN<HalfEdgeId, 8>, TraversalError> {
        self.and_then(|valid| {
            let mut halfedges = SVecN::new();
            // Could be a disconnected vertex. Return an empty list in that case.
            if let Some(h0) = valid.inner.try_vertex(valid.location)?.halfedge {
                let mut h = h0;
                loop {
                    if halfedges.len() > MAX_LOOP_ITERATIONS {
                        return Err(TraversalError::HalfedgeBadLoop(h0));
                    }
                    halfedges.push(h);
                    h = valid.inner.at_halfedge(h).cycle_around_fan().try_end()?;
                    if h == h0 {
                        break;
                    }
                }
            }
            Ok(halfedges)
        })
    }

    fn incoming_halfedges(&'a self) -> Result<SVecN<HalfEdgeId, 8>, TraversalError> {
        self.and_then(|valid| {
            self.outgoing_halfedges()?
                .iter()
                .map(|h| valid.inner.at_halfedge(*h).twin().try_end())
                .collect()
        })
    }

    /// Returns the halfedge that goes from the current vertex to `other`,
    /// if any.
    fn halfedge_to(&self, other: VertexId) -> Traversal<HalfEdgeId> {
        self.and_then(|valid| {
            let h_to = self
                .outgoing_halfedges()?
                .into_iter()
                .find(|&h| {
                    valid
                        .inner
                        .at_halfedge(h)
                        .dst_vertex()
                        .try_end()
                        .map(|v| v == other)
                        .unwrap_or(false)
                })
                .ok_or(TraversalError::NoHalfedgeTo(other))?;
            Ok(ValidTraversal {
                inner: valid.inner,
                location: h_to,
            })
        })
    }

    /// Returns the triangle fan around this vertex.
    fn adjacent_faces(&self) -> Result<SVecN<FaceId, 8>, TraversalError> {
        self.and_then(|valid| {
            Ok(self
                .outgoing_halfedges()?
                .into_iter()
                // NOTE: Skip halfedges without a face. This is not an error,
                // just halfedges that lie on the border.
                .filter_map(|h| valid.inner.at_halfedge(h).face().try_end().ok())
                .collect())
        })
    }

    /// The vertices one edge away, in fan order.
    fn neighbors(&self) -> Result<SVecN<VertexId, 8>, TraversalError> {
        self.and_then(|valid| {
            self.outgoing_halfedges()?
                .into_iter()
                .map(|h| valid.inner.at_halfedge(h).dst_vertex().try_end())
                .collect()
        })
    }

    fn valence(&self) -> Result<usize, TraversalError> {
        Ok(self.outgoing_halfedges()?.len())
    }
}

/* ============== */
/*  Face Helpers  */
/* ============== */

pub trait FaceTraversalHelpers<'a> {
    fn halfedges(&'a self) -> Result<SVec<HalfEdgeId>, TraversalError>;
    fn vertices(&'a self) -> Result<SVec<VertexId>, TraversalError>;
}

impl<'a> FaceTraversalHelpers<'a> for Traversal<'a, FaceId> {
    fn halfedges(&'a self) -> Result<SVec<HalfEdgeId>, TraversalError> {
        self.and_then(|valid| {
            let h0 = self.halfedge().try_end()?;
            valid.inner.halfedge_loop(h0)
        })
    }

    fn vertices(&'a self) -> Result<SVec<VertexId>, TraversalError> {
        self.and_then(|valid| {
            self.halfedges()?
                .iter()
                .map(|h| valid.inner.at_halfedge(*h).vertex().try_end())
                .collect::<Result<SVec<_>, TraversalError>>()
        })
    }
}

/* =================== */
/*  FullEdge Helpers   */
/* =================== */

pub trait FullEdgeTraversalHelpers<'a> {
    fn halfedges(&'a self) -> Result<[HalfEdgeId; 2], TraversalError>;
    fn vertices(&'a self) -> Result<[VertexId; 2], TraversalError>;
    fn faces(&'a self) -> Result<SVecN<FaceId, 2>, TraversalError>;
}

impl<'a> FullEdgeTraversalHelpers<'a> for Traversal<'a, FullEdgeId> {
    /// The representative half-edge and its twin.
    fn halfedges(&'a self) -> Result<[HalfEdgeId; 2], TraversalError> {
        let h = self.halfedge().try_end()?;
        let t = self.halfedge().twin().try_end()?;
        Ok([h, t])
    }

    fn vertices(&'a self) -> Result<[VertexId; 2], TraversalError> {
        let (a, b) = self.halfedge().src_dst_pair()?;
        Ok([a, b])
    }

    /// The faces on either side. Border sides are skipped.
    fn faces(&'a self) -> Result<SVecN<FaceId, 2>, TraversalError> {
        self.and_then(|valid| {
            let mut faces = SVecN::new();
            for h in self.halfedges()? {
                if let Some(f) = valid.inner.at_halfedge(h).face_or_boundary()? {
                    faces.push(f);
                }
            }
            Ok(faces)
        })
    }
}

/* ================== */
/*  Halfedge Helpers  */
/* ================== */

pub trait HalfedgeTraversalHelpers<'a> {
    fn cycle_around_fan(&'a self) -> Traversal<HalfEdgeId>;
    fn src_vertex(&'a self) -> Traversal<VertexId>;
    fn dst_vertex(&'a self) -> Traversal<VertexId>;
    fn src_dst_pair(&'a self) -> Result<(VertexId, VertexId), TraversalError>;
    fn is_boundary(&'a self) -> Result<bool, TraversalError>;
}
impl<'a> HalfedgeTraversalHelpers<'a> for Traversal<'a, HalfEdgeId> {
    fn cycle_around_fan(&'a self) -> Traversal<HalfEdgeId> {
        self.and_then(|valid| {
            Ok(ValidTraversal {
                inner: valid.inner,
                location: self.twin().next().try_end()?,
            })
        })
    }

    fn src_vertex(&'a self) -> Traversal<VertexId> {
        self.vertex()
    }

    fn dst_vertex(&'a self) -> Traversal<VertexId> {
        self.and_then(|valid| {
            Ok(ValidTraversal {
                inner: valid.inner,
                location: self.next().vertex().try_end()?,
            })
        })
    }

    fn src_dst_pair(&'a self) -> Result<(VertexId, VertexId), TraversalError> {
        Ok((self.src_vertex().try_end()?, self.dst_vertex().try_end()?))
    }

    fn is_boundary(&'a self) -> Result<bool, TraversalError> {
        Ok(self.face_or_boundary()?.is_none())
    }
}
