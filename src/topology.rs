// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;

/// Global structural checks over a whole [`Dcel`].
pub mod consistency;
pub use consistency::ConsistencyError;

/// Conversion between [`Dcel`] and [`TriangleMesh`].
pub mod convert;
pub use convert::BorderPolicy;

/// Extraction of the local triangle neighborhood of an element.
pub mod extract;

/// Curvature derived target edge lengths.
pub mod sizing;

/// Structural operations every element kind supports.
///
/// - `bind` writes the back-references of the element's neighbors so they
///   agree with the element's own links.
/// - `unbind` clears the back-references that point at the element. It is
///   meant to be called right before the element is removed.
/// - `is_valid` holds when the element exists and its mandatory links are
///   set.
/// - `is_border` holds when the element touches a face-less half-edge.
pub trait Topology: Copy {
    fn bind(self, dcel: &mut Dcel) -> Result<(), TraversalError>;
    fn unbind(self, dcel: &mut Dcel);
    fn is_valid(self, dcel: &Dcel) -> bool;
    fn is_border(self, dcel: &Dcel) -> bool;
}

impl Dcel {
    pub fn bind<T: Topology>(&mut self, element: T) -> Result<(), TraversalError> {
        element.bind(self)
    }

    pub fn unbind<T: Topology>(&mut self, element: T) {
        element.unbind(self)
    }

    pub fn is_valid<T: Topology>(&self, element: T) -> bool {
        element.is_valid(self)
    }

    pub fn is_border<T: Topology>(&self, element: T) -> bool {
        element.is_border(self)
    }
}

impl Topology for VertexId {
    /// Sets the origin of every half-edge in the fan to this vertex.
    fn bind(self, dcel: &mut Dcel) -> Result<(), TraversalError> {
        let outgoing = dcel.at_vertex(self).outgoing_halfedges()?;
        for h in outgoing {
            dcel[h].vertex = Some(self);
        }
        Ok(())
    }

    fn unbind(self, dcel: &mut Dcel) {
        let Ok(outgoing) = dcel.at_vertex(self).outgoing_halfedges() else {
            return;
        };
        for h in outgoing {
            if let Some(halfedge) = dcel.halfedge_mut(h) {
                if halfedge.vertex == Some(self) {
                    halfedge.vertex = None;
                }
            }
        }
    }

    fn is_valid(self, dcel: &Dcel) -> bool {
        dcel.vertex(self)
            .and_then(|v| v.halfedge)
            .map(|h| dcel.contains(h))
            .unwrap_or(false)
    }

    fn is_border(self, dcel: &Dcel) -> bool {
        dcel.at_vertex(self)
            .outgoing_halfedges()
            .map(|outgoing| {
                outgoing.iter().any(|&h| {
                    h.is_border(dcel)
                        || dcel
                            .at_halfedge(h)
                            .twin()
                            .try_end()
                            .map(|t| t.is_border(dcel))
                            .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }
}

impl Topology for HalfEdgeId {
    /// Points `next.prev`, `prev.next` and `twin.twin` back at this
    /// half-edge.
    fn bind(self, dcel: &mut Dcel) -> Result<(), TraversalError> {
        let next = dcel.at_halfedge(self).next().try_end()?;
        let prev = dcel.at_halfedge(self).prev().try_end()?;
        let twin = dcel.at_halfedge(self).twin().try_end()?;
        for h in [next, prev, twin] {
            if !dcel.contains(h) {
                return Err(TraversalError::NoSuchHalfEdge(h));
            }
        }
        dcel[next].prev = Some(self);
        dcel[prev].next = Some(self);
        dcel[twin].twin = Some(self);
        Ok(())
    }

    fn unbind(self, dcel: &mut Dcel) {
        let Some(halfedge) = dcel.halfedge(self).cloned() else {
            return;
        };
        if let Some(next) = halfedge.next.and_then(|h| dcel.halfedge_mut(h)) {
            if next.prev == Some(self) {
                next.prev = None;
            }
        }
        if let Some(prev) = halfedge.prev.and_then(|h| dcel.halfedge_mut(h)) {
            if prev.next == Some(self) {
                prev.next = None;
            }
        }
        if let Some(twin) = halfedge.twin.and_then(|h| dcel.halfedge_mut(h)) {
            if twin.twin == Some(self) {
                twin.twin = None;
            }
        }
        if let Some(vertex) = halfedge.vertex.and_then(|v| dcel.vertex_mut(v)) {
            if vertex.halfedge == Some(self) {
                vertex.halfedge = None;
            }
        }
        if let Some(face) = halfedge.face.and_then(|f| dcel.face_mut(f)) {
            if face.halfedge == Some(self) {
                face.halfedge = None;
            }
        }
        if let Some(fulledge) = halfedge.fulledge.and_then(|e| dcel.fulledge_mut(e)) {
            if fulledge.halfedge == Some(self) {
                fulledge.halfedge = None;
            }
        }
    }

    fn is_valid(self, dcel: &Dcel) -> bool {
        dcel.halfedge(self)
            .map(|h| {
                h.vertex.is_some()
                    && h.next.is_some()
                    && h.prev.is_some()
                    && h.twin.is_some()
                    && h.fulledge.is_some()
            })
            .unwrap_or(false)
    }

    fn is_border(self, dcel: &Dcel) -> bool {
        dcel.halfedge(self).map(|h| h.face.is_none()).unwrap_or(false)
    }
}

impl Topology for FullEdgeId {
    /// Points both halves at this full-edge.
    fn bind(self, dcel: &mut Dcel) -> Result<(), TraversalError> {
        let h = dcel.at_fulledge(self).halfedge().try_end()?;
        let t = dcel.at_halfedge(h).twin().try_end()?;
        if !dcel.contains(t) {
            return Err(TraversalError::NoSuchHalfEdge(t));
        }
        dcel[h].fulledge = Some(self);
        dcel[t].fulledge = Some(self);
        Ok(())
    }

    fn unbind(self, dcel: &mut Dcel) {
        let Some(h) = dcel.fulledge(self).and_then(|e| e.halfedge) else {
            return;
        };
        let twin = dcel.halfedge(h).and_then(|h| h.twin);
        for h in std::iter::once(h).chain(twin) {
            if let Some(halfedge) = dcel.halfedge_mut(h) {
                if halfedge.fulledge == Some(self) {
                    halfedge.fulledge = None;
                }
            }
        }
    }

    fn is_valid(self, dcel: &Dcel) -> bool {
        dcel.at_fulledge(self)
            .halfedge()
            .twin()
            .try_end()
            .map(|t| dcel.contains(t))
            .unwrap_or(false)
    }

    fn is_border(self, dcel: &Dcel) -> bool {
        let Ok(h) = dcel.at_fulledge(self).halfedge().try_end() else {
            return false;
        };
        h.is_border(dcel)
            || dcel
                .at_halfedge(h)
                .twin()
                .try_end()
                .map(|t| t.is_border(dcel))
                .unwrap_or(false)
    }
}

impl Topology for FaceId {
    /// Sets the face of every half-edge in the loop to this face.
    fn bind(self, dcel: &mut Dcel) -> Result<(), TraversalError> {
        let halfedges = dcel.at_face(self).halfedges()?;
        for h in halfedges {
            dcel[h].face = Some(self);
        }
        Ok(())
    }

    fn unbind(self, dcel: &mut Dcel) {
        let Some(h0) = dcel.face(self).and_then(|f| f.halfedge) else {
            return;
        };
        let mut h = h0;
        for _ in 0..MAX_LOOP_ITERATIONS {
            let Some(halfedge) = dcel.halfedge_mut(h) else {
                return;
            };
            if halfedge.face == Some(self) {
                halfedge.face = None;
            }
            match halfedge.next {
                Some(next) if next != h0 => h = next,
                _ => return,
            }
        }
    }

    fn is_valid(self, dcel: &Dcel) -> bool {
        dcel.at_face(self)
            .halfedge()
            .try_end()
            .map(|h| dcel.contains(h))
            .unwrap_or(false)
    }

    fn is_border(self, dcel: &Dcel) -> bool {
        dcel.at_face(self)
            .halfedges()
            .map(|halfedges| {
                halfedges.iter().any(|&h| {
                    dcel.at_halfedge(h)
                        .twin()
                        .try_end()
                        .map(|t| t.is_border(dcel))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }
}
