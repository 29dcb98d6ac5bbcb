// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;

use slotmap::SlotMap;

/// Implements indexing traits so the container can be used to access vertex,
/// half-edge, full-edge or face information using ids as indices.
pub mod dcel_index_impls;

/// Type-safe wrappers over the internal allocator indices used as pointers
pub mod id_types;
pub use id_types::*;

/// An API to represent type-safe and error-handled graph traversals over a
/// mesh
pub mod traversals;
pub use traversals::*;

/// Dense index mappings for the sparse element arenas
pub mod mappings;

/// The half-edge structure is a linked list. Some algorithms could not
/// terminate on a malformed mesh, so every loop walk gives up with an error
/// after this many steps.
pub const MAX_LOOP_ITERATIONS: usize = 8196;

#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub(crate) halfedge: Option<HalfEdgeId>,
}

/// A directed edge. `vertex` is the origin, the destination is the origin of
/// `next`. Border half-edges have no face.
#[derive(Debug, Default, Clone)]
pub struct HalfEdge {
    pub(crate) vertex: Option<VertexId>,
    pub(crate) next: Option<HalfEdgeId>,
    pub(crate) prev: Option<HalfEdgeId>,
    pub(crate) twin: Option<HalfEdgeId>,
    pub(crate) fulledge: Option<FullEdgeId>,
    pub(crate) face: Option<FaceId>,
}

/// The undirected edge owning a pair of twin half-edges.
#[derive(Debug, Default, Clone)]
pub struct FullEdge {
    pub(crate) halfedge: Option<HalfEdgeId>,
}

#[derive(Debug, Default, Clone)]
pub struct Face {
    pub(crate) halfedge: Option<HalfEdgeId>,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            halfedge: None,
        }
    }

    /// One outgoing half-edge.
    pub fn halfedge(&self) -> Option<HalfEdgeId> {
        self.halfedge
    }
}

impl HalfEdge {
    pub fn vertex(&self) -> Option<VertexId> {
        self.vertex
    }
    pub fn next(&self) -> Option<HalfEdgeId> {
        self.next
    }
    pub fn prev(&self) -> Option<HalfEdgeId> {
        self.prev
    }
    pub fn twin(&self) -> Option<HalfEdgeId> {
        self.twin
    }
    pub fn fulledge(&self) -> Option<FullEdgeId> {
        self.fulledge
    }
    pub fn face(&self) -> Option<FaceId> {
        self.face
    }
}

impl FullEdge {
    /// The representative half-edge. Its twin is the other half.
    pub fn halfedge(&self) -> Option<HalfEdgeId> {
        self.halfedge
    }
}

impl Face {
    pub fn halfedge(&self) -> Option<HalfEdgeId> {
        self.halfedge
    }
}

/// The mesh container. Elements live in four generational arenas, so an id
/// of a removed element never aliases a newer one.
#[derive(Debug, Clone, Default)]
pub struct Dcel {
    vertices: SlotMap<VertexId, Vertex>,
    halfedges: SlotMap<HalfEdgeId, HalfEdge>,
    fulledges: SlotMap<FullEdgeId, FullEdge>,
    faces: SlotMap<FaceId, Face>,
    revision: u64,
}

/// An element kind stored in its own arena inside a [`Dcel`].
pub trait DcelElement: Sized + 'static {
    type Id: slotmap::Key;

    fn arena(dcel: &Dcel) -> &SlotMap<Self::Id, Self>;
    fn arena_mut(dcel: &mut Dcel) -> &mut SlotMap<Self::Id, Self>;
}

/// The reverse link from an id type to the element kind it indexes.
pub trait ElementId: slotmap::Key + 'static {
    type Element: DcelElement<Id = Self>;
}

macro_rules! impl_dcel_element {
    ($element:ty, $id_type:ty, $arena:ident) => {
        impl DcelElement for $element {
            type Id = $id_type;

            fn arena(dcel: &Dcel) -> &SlotMap<Self::Id, Self> {
                &dcel.$arena
            }

            fn arena_mut(dcel: &mut Dcel) -> &mut SlotMap<Self::Id, Self> {
                &mut dcel.$arena
            }
        }

        impl ElementId for $id_type {
            type Element = $element;
        }
    };
}

impl_dcel_element!(Vertex, VertexId, vertices);
impl_dcel_element!(HalfEdge, HalfEdgeId, halfedges);
impl_dcel_element!(FullEdge, FullEdgeId, fulledges);
impl_dcel_element!(Face, FaceId, faces);

impl Dcel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `element` and returns its freshly minted id.
    pub fn insert<E: DcelElement>(&mut self, element: E) -> E::Id {
        self.revision += 1;
        E::arena_mut(self).insert(element)
    }

    /// Removes the element. Returns `None` if the id was not present. This
    /// does not attempt to preserve connectivity; callers unbind first.
    pub fn remove<K: ElementId>(&mut self, id: K) -> Option<K::Element> {
        let removed = K::Element::arena_mut(self).remove(id);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    pub fn access<K: ElementId>(&self, id: K) -> Option<&K::Element> {
        K::Element::arena(self).get(id)
    }

    pub fn access_mut<K: ElementId>(&mut self, id: K) -> Option<&mut K::Element> {
        K::Element::arena_mut(self).get_mut(id)
    }

    pub fn contains<K: ElementId>(&self, id: K) -> bool {
        K::Element::arena(self).contains_key(id)
    }

    /// Number of stored elements of kind `E`.
    pub fn size<E: DcelElement>(&self) -> usize {
        E::arena(self).len()
    }

    /// Bumped on every insertion and removal.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.halfedges.is_empty() && self.faces.is_empty()
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    pub fn num_fulledges(&self) -> usize {
        self.fulledges.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn iter_vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices.iter()
    }

    pub fn iter_halfedges(&self) -> impl Iterator<Item = (HalfEdgeId, &HalfEdge)> {
        self.halfedges.iter()
    }

    pub fn iter_fulledges(&self) -> impl Iterator<Item = (FullEdgeId, &FullEdge)> {
        self.fulledges.iter()
    }

    pub fn iter_faces(&self) -> impl Iterator<Item = (FaceId, &Face)> {
        self.faces.iter()
    }

    /// Adds a new vertex, disconnected from everything else. Returns its
    /// handle.
    pub(crate) fn alloc_vertex(&mut self, position: Vec3, normal: Vec3) -> VertexId {
        self.insert(Vertex::new(position, normal))
    }

    pub(crate) fn alloc_halfedge(&mut self, halfedge: HalfEdge) -> HalfEdgeId {
        self.insert(halfedge)
    }

    pub(crate) fn alloc_fulledge(&mut self, halfedge: Option<HalfEdgeId>) -> FullEdgeId {
        self.insert(FullEdge { halfedge })
    }

    pub(crate) fn alloc_face(&mut self, halfedge: Option<HalfEdgeId>) -> FaceId {
        self.insert(Face { halfedge })
    }

    /// Sets `a.next = b` and `b.prev = a`.
    pub(crate) fn link(&mut self, a: HalfEdgeId, b: HalfEdgeId) {
        self[a].next = Some(b);
        self[b].prev = Some(a);
    }

    /// Makes `a` and `b` twins owned by `fulledge`, with `a` as the
    /// representative.
    pub(crate) fn link_twins(&mut self, a: HalfEdgeId, b: HalfEdgeId, fulledge: FullEdgeId) {
        self[a].twin = Some(b);
        self[b].twin = Some(a);
        self[a].fulledge = Some(fulledge);
        self[b].fulledge = Some(fulledge);
        self[fulledge].halfedge = Some(a);
    }

    /// Follows `next` pointers starting at `h0` until the loop closes.
    pub fn halfedge_loop(&self, h0: HalfEdgeId) -> Result<SVec<HalfEdgeId>, TraversalError> {
        let mut ret: SVec<HalfEdgeId> = smallvec::smallvec![h0];
        let mut h = h0;
        loop {
            if ret.len() > MAX_LOOP_ITERATIONS {
                return Err(TraversalError::HalfedgeBadLoop(h0));
            }
            h = self.at_halfedge(h).next().try_end()?;
            if h == h0 {
                break;
            }
            ret.push(h);
        }
        Ok(ret)
    }

    /// Returns the half-edges of a face, starting at its anchor.
    pub fn face_edges(&self, face: FaceId) -> Result<SVec<HalfEdgeId>, TraversalError> {
        self.at_face(face).halfedges()
    }

    pub fn face_vertices(&self, face: FaceId) -> Result<SVec<VertexId>, TraversalError> {
        self.at_face(face).vertices()
    }

    pub fn face_positions(&self, face: FaceId) -> Result<SVec<Vec3>, TraversalError> {
        Ok(self
            .face_vertices(face)?
            .iter()
            .map(|v| self[*v].position)
            .collect())
    }

    /// Returns the unit normal of the face, computed from its first three
    /// vertices. `None` for degenerate faces.
    pub fn face_normal(&self, face: FaceId) -> Option<Vec3> {
        let positions = self.face_positions(face).ok()?;
        if positions.len() < 3 {
            return None;
        }
        let n = dcel_commons::math::triangle_normal(positions[0], positions[1], positions[2]);
        (n.length_squared() > 0.0).then(|| n.normalize())
    }

    /// The origin and destination vertices of the representative half-edge.
    pub fn edge_endpoints(&self, edge: FullEdgeId) -> Result<(VertexId, VertexId), TraversalError> {
        self.at_fulledge(edge).halfedge().src_dst_pair()
    }

    pub fn edge_length_squared(&self, edge: FullEdgeId) -> Result<f32, TraversalError> {
        let (a, b) = self.edge_endpoints(edge)?;
        Ok(self[a].position.distance_squared(self[b].position))
    }

    pub fn edge_length(&self, edge: FullEdgeId) -> Result<f32, TraversalError> {
        Ok(self.edge_length_squared(edge)?.sqrt())
    }

    /// Average length over all full-edges. `None` for a mesh without edges.
    pub fn mean_edge_length(&self) -> Option<f32> {
        let (sum, count) = self
            .fulledges
            .keys()
            .filter_map(|e| self.edge_length(e).ok())
            .fold((0.0, 0usize), |(s, c), l| (s + l, c + 1));
        (count > 0).then(|| sum / count as f32)
    }

    pub fn vertex_mapping(&self) -> mappings::MeshMapping<VertexId> {
        mappings::MeshMapping::new(&self.vertices)
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    pub fn test_generic_element_access() {
        let mut dcel = Dcel::new();
        let rev0 = dcel.revision();
        let v = dcel.insert(Vertex::new(Vec3::X, Vec3::Z));
        let f = dcel.insert(Face::default());
        assert!(dcel.contains(v));
        assert!(dcel.contains(f));
        assert_eq!(dcel.size::<Vertex>(), 1);
        assert_eq!(dcel.size::<HalfEdge>(), 0);
        assert_eq!(dcel.access(v).map(|v| v.position), Some(Vec3::X));
        assert!(dcel.revision() > rev0);

        assert!(dcel.remove(v).is_some());
        assert!(dcel.remove(v).is_none());
        assert!(!dcel.contains(v));
        assert!(dcel.access(v).is_none());

        // Generational ids never alias a newer element in the same slot.
        let v2 = dcel.insert(Vertex::new(Vec3::Y, Vec3::Z));
        assert_ne!(v, v2);
        assert!(!dcel.contains(v));
    }

    #[test]
    pub fn test_edge_measures() {
        let mesh = crate::test_meshes::tetrahedron();
        let dcel = Dcel::try_from(&mesh).unwrap();
        assert_eq!(dcel.num_fulledges(), 6);
        for (e, _) in dcel.iter_fulledges() {
            let l = dcel.edge_length(e).unwrap();
            assert!((l * l - dcel.edge_length_squared(e).unwrap()).abs() < 1e-5);
        }
        let mean = dcel.mean_edge_length().unwrap();
        assert!(mean > 0.0);
        for (f, _) in dcel.iter_faces() {
            assert_eq!(dcel.face_edges(f).unwrap().len(), 3);
            let n = dcel.face_normal(f).unwrap();
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
        assert!(Dcel::new().mean_edge_length().is_none());
    }
}
