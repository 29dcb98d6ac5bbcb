// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::prelude::*;

/// Elements that have a local triangle neighborhood.
pub trait Extract: Copy {
    /// The element's own vertices. They come first in the extracted mesh.
    fn anchor_vertices(self, dcel: &Dcel) -> Result<SVec<VertexId>>;
    /// The faces making up the neighborhood.
    fn local_faces(self, dcel: &Dcel) -> Result<SVecN<FaceId, 16>>;
}

impl Extract for VertexId {
    fn anchor_vertices(self, _dcel: &Dcel) -> Result<SVec<VertexId>> {
        Ok(smallvec::smallvec![self])
    }

    /// The one-ring.
    fn local_faces(self, dcel: &Dcel) -> Result<SVecN<FaceId, 16>> {
        Ok(dcel.at_vertex(self).adjacent_faces()?.into_iter().collect())
    }
}

impl Extract for FullEdgeId {
    fn anchor_vertices(self, dcel: &Dcel) -> Result<SVec<VertexId>> {
        let (a, b) = dcel.edge_endpoints(self)?;
        Ok(smallvec::smallvec![a, b])
    }

    /// The one or two faces on either side.
    fn local_faces(self, dcel: &Dcel) -> Result<SVecN<FaceId, 16>> {
        let h = dcel.at_fulledge(self).halfedge().try_end()?;
        let t = dcel.at_halfedge(h).twin().try_end()?;
        Ok([h, t]
            .iter()
            .filter_map(|&h| dcel.at_halfedge(h).face_or_boundary().ok().flatten())
            .collect())
    }
}

impl Extract for FaceId {
    fn anchor_vertices(self, dcel: &Dcel) -> Result<SVec<VertexId>> {
        Ok(dcel.face_vertices(self)?)
    }

    /// The face itself and the faces sharing one of its edges.
    fn local_faces(self, dcel: &Dcel) -> Result<SVecN<FaceId, 16>> {
        let mut faces: SVecN<FaceId, 16> = smallvec::smallvec![self];
        for h in dcel.face_edges(self)? {
            if let Some(f) = dcel.at_halfedge(h).twin().face_or_boundary()? {
                if !faces.contains(&f) {
                    faces.push(f);
                }
            }
        }
        Ok(faces)
    }
}

impl Dcel {
    /// Copies the local neighborhood of `element` into a standalone triangle
    /// mesh. The second value maps local vertex indices back to ids; the
    /// element's own vertices take the first indices.
    pub fn extract<T: Extract>(&self, element: T) -> Result<(TriangleMesh, Vec<VertexId>)> {
        let mut vertices = element.anchor_vertices(self)?.into_vec();
        let mut local_index: HashMap<VertexId, u32> = vertices
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, i as u32))
            .collect();

        let mut triangles = vec![];
        for f in element.local_faces(self)? {
            let face_vertices = self.face_vertices(f)?;
            if face_vertices.len() != 3 {
                bail!("Face {f:?} is not a triangle");
            }
            let mut tri = [0u32; 3];
            for (slot, v) in tri.iter_mut().zip(face_vertices) {
                *slot = *local_index.entry(v).or_insert_with(|| {
                    vertices.push(v);
                    (vertices.len() - 1) as u32
                });
            }
            triangles.push(tri);
        }

        let positions = vertices.iter().map(|&v| self[v].position).collect();
        let normals = vertices.iter().map(|&v| self[v].normal).collect();
        Ok((
            TriangleMesh::with_normals(positions, normals, triangles),
            vertices,
        ))
    }
}
