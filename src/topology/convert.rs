// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::dcel::mappings::MeshMapping;
use crate::prelude::*;

use dcel_commons::geometry;

/// What to do with edges used by a single triangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BorderPolicy {
    /// Only closed meshes are accepted. An unmatched edge is an error.
    Reject,
    /// Unmatched edges get face-less twins, linked in loops around each hole.
    Close,
}

impl Dcel {
    /// Builds the container from a list of vertices and a list of triangles
    /// referencing them.
    ///
    /// - Generic over Index: use as much precision as you need.
    /// - When `normals` does not have one entry per position, vertex normals
    ///   are computed from the faces.
    ///
    /// Every position must be used by a triangle, the surface must be
    /// manifold and consistently oriented.
    #[profiling::function]
    pub fn build_from_triangles<Index>(
        positions: &[Vec3],
        normals: &[Vec3],
        triangles: &[[Index; 3]],
        border: BorderPolicy,
    ) -> Result<Self>
    where
        Index: num_traits::AsPrimitive<usize>,
    {
        let triangles: Vec<[usize; 3]> = triangles
            .iter()
            .map(|t| [t[0].as_(), t[1].as_(), t[2].as_()])
            .collect();

        // Some sanity checks
        let mut vertex_degree = vec![0u32; positions.len()];
        for tri in &triangles {
            if tri.iter().duplicates().next().is_some() {
                bail!("Cannot build meshes where a triangle has duplicate vertices: {tri:?}")
            }
            for &index in tri {
                *vertex_degree.get_mut(index).ok_or_else(|| {
                    anyhow!("Out-of-bounds index in the triangle array {index}")
                })? += 1;
            }
        }
        if let Some(index) = vertex_degree.iter().position(|&d| d == 0) {
            bail!("Vertex {index} is disconnected from any triangle");
        }

        let normals = if normals.len() == positions.len() {
            normals.to_vec()
        } else {
            let as_u32 = triangles
                .iter()
                .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
                .collect_vec();
            geometry::uniform_normals(positions, &as_u32)
        };

        let mut dcel = Dcel::new();

        // Vertices are allocated in index order, so iterating the arena of a
        // freshly built mesh yields the input order.
        let index_to_vertex = positions
            .iter()
            .zip(normals.iter())
            .map(|(&p, &n)| dcel.alloc_vertex(p, n))
            .collect_vec();

        // Unordered vertex pair to the half-edges running along it
        let mut pair_to_halfedges = HashMap::<(usize, usize), SVecN<HalfEdgeId, 2>>::new();

        for tri in &triangles {
            let face = dcel.alloc_face(None);
            let mut halfedges: SVecN<HalfEdgeId, 3> = SVecN::new();

            for (&a, &b) in tri.iter().circular_tuple_windows() {
                let v_a = index_to_vertex[a];
                let h = dcel.alloc_halfedge(HalfEdge {
                    vertex: Some(v_a),
                    face: Some(face),
                    ..Default::default()
                });
                dcel[v_a].halfedge = Some(h);
                halfedges.push(h);
                pair_to_halfedges
                    .entry((a.min(b), a.max(b)))
                    .or_default()
                    .push(h);
            }

            for (&h1, &h2) in halfedges.iter().circular_tuple_windows() {
                dcel.link(h1, h2);
            }
            dcel[face].halfedge = Some(halfedges[0]);
        }

        let mut unmatched = 0;
        for ((a, b), halfedges) in pair_to_halfedges.iter() {
            match halfedges.as_slice() {
                &[_] => unmatched += 1,
                &[h1, h2] => {
                    if dcel[h1].vertex == dcel[h2].vertex {
                        bail!(
                            "Edge ({a}, {b}) is used twice in the same direction. \
                             Faces are not oriented consistently"
                        )
                    }
                    let e = dcel.alloc_fulledge(None);
                    dcel.link_twins(h1, h2, e);
                }
                _ => bail!("Edge ({a}, {b}) is shared by more than two triangles"),
            }
        }

        if unmatched > 0 {
            match border {
                BorderPolicy::Reject => bail!(
                    "Found {unmatched} edges used by a single triangle. The mesh is not closed"
                ),
                BorderPolicy::Close => dcel.add_border_halfedges()?,
            }
        }

        // Check that the number of faces around every vertex equals the
        // number of triangles using it. Otherwise the vertex is not a single
        // triangle fan but some other nonmanifold structure.
        for (i, &v) in index_to_vertex.iter().enumerate() {
            let fan = dcel
                .at_vertex(v)
                .adjacent_faces()
                .with_context(|| format!("Vertex {i} is not manifold"))?;
            if fan.len() != vertex_degree[i] as usize {
                bail!("Vertex {i} is not a triangle fan, but some other nonmanifold structure");
            }
        }

        Ok(dcel)
    }

    /// Given a container where some half-edges have no twin because they lie
    /// on a hole, adds face-less twins forming a loop around every hole.
    fn add_border_halfedges(&mut self) -> Result<()> {
        let halfedges = self.iter_halfedges().map(|(h, _)| h).collect_vec();

        for &h0 in halfedges.iter() {
            if self[h0].twin.is_some() {
                continue;
            }
            let mut border_halfedges = Vec::<HalfEdgeId>::new();
            let mut h_it = h0;
            loop {
                if border_halfedges.len() > MAX_LOOP_ITERATIONS {
                    bail!("Border loop starting at {h0:?} does not close");
                }
                let dst = self.at_halfedge(h_it).next().vertex().try_end()?;
                let t = self.alloc_halfedge(HalfEdge {
                    vertex: Some(dst),
                    ..Default::default()
                });
                let e = self.alloc_fulledge(None);
                self.link_twins(h_it, t, e);
                border_halfedges.push(t);

                // Look for the next outgoing half-edge around the destination
                // that has no twin yet
                h_it = self.at_halfedge(h_it).next().try_end()?;
                let mut steps = 0;
                while h_it != h0 && self[h_it].twin.is_some() {
                    steps += 1;
                    if steps > MAX_LOOP_ITERATIONS {
                        bail!("Could not walk around the fan of {dst:?}");
                    }
                    // Twin-next cycles around the outgoing half-edges of a vertex
                    h_it = self
                        .at_halfedge(h_it)
                        .cycle_around_fan()
                        .try_end()
                        .with_context(|| format!("Vertex {dst:?} has more than one border"))?;
                }

                if h_it == h0 {
                    break;
                }
            }

            // The border loop runs against the interior half-edges
            for (&b_h, &b_h_next) in border_halfedges.iter().rev().circular_tuple_windows() {
                self.link(b_h, b_h_next);
            }
        }
        Ok(())
    }

    /// Builds from a closed mesh. Open meshes go through
    /// [`Dcel::from_triangle_mesh_with_border`].
    pub fn from_triangle_mesh(mesh: &TriangleMesh) -> Result<Self> {
        Self::build_from_triangles(
            &mesh.positions,
            &mesh.normals,
            &mesh.triangles,
            BorderPolicy::Reject,
        )
    }

    /// Builds from a mesh that may have holes.
    pub fn from_triangle_mesh_with_border(mesh: &TriangleMesh) -> Result<Self> {
        Self::build_from_triangles(
            &mesh.positions,
            &mesh.normals,
            &mesh.triangles,
            BorderPolicy::Close,
        )
    }

    /// Exports the mesh. Vertices are numbered in arena order; the returned
    /// mapping gives the index of every vertex id. Faces with a broken loop
    /// are skipped, faces with more than three sides are fanned.
    #[profiling::function]
    pub fn to_triangle_mesh_with_mapping(&self) -> (TriangleMesh, MeshMapping<VertexId>) {
        let mapping = self.vertex_mapping();
        let positions = mapping.ids.iter().map(|&v| self[v].position).collect();
        let normals = mapping.ids.iter().map(|&v| self[v].normal).collect();
        let mut triangles = Vec::with_capacity(self.num_faces());
        for (f, _) in self.iter_faces() {
            match self.face_vertices(f) {
                Ok(vertices) => {
                    let indices = mapping.map_seq(&vertices);
                    for k in 1..indices.len().saturating_sub(1) {
                        triangles.push([indices[0], indices[k], indices[k + 1]]);
                    }
                }
                Err(err) => log::warn!("Skipping face {f:?} on export: {err}"),
            }
        }
        (
            TriangleMesh::with_normals(positions, normals, triangles),
            mapping,
        )
    }
}

impl TryFrom<&TriangleMesh> for Dcel {
    type Error = anyhow::Error;

    fn try_from(mesh: &TriangleMesh) -> Result<Self> {
        Dcel::from_triangle_mesh(mesh)
    }
}

impl From<&Dcel> for TriangleMesh {
    fn from(dcel: &Dcel) -> Self {
        dcel.to_triangle_mesh_with_mapping().0
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::test_meshes;

    #[test]
    pub fn test_round_trip() {
        for mesh in [
            test_meshes::tetrahedron(),
            test_meshes::icosphere(1),
            test_meshes::cube(),
        ] {
            let dcel = Dcel::try_from(&mesh).unwrap();
            assert_eq!(dcel.num_vertices(), mesh.num_vertices());
            assert_eq!(dcel.num_faces(), mesh.num_triangles());
            assert_eq!(dcel.num_fulledges(), mesh.edges().len());
            assert_eq!(dcel.num_halfedges(), 3 * mesh.num_triangles());

            let back = TriangleMesh::from(&dcel);
            assert_eq!(back.positions, mesh.positions);
            assert_eq!(back.canonical_triangles(), mesh.canonical_triangles());
        }
    }

    #[test]
    pub fn test_open_mesh_needs_border_policy() {
        let grid = test_meshes::grid(3);
        assert!(Dcel::try_from(&grid).is_err());

        let dcel = Dcel::from_triangle_mesh_with_border(&grid).unwrap();
        assert_eq!(dcel.num_vertices(), 16);
        assert_eq!(dcel.num_faces(), 18);
        assert_eq!(dcel.num_fulledges(), grid.edges().len());
        // 12 border edges add one face-less half-edge each
        assert_eq!(dcel.num_halfedges(), 3 * 18 + 12);
        assert!(dcel.is_consistent());

        let back = TriangleMesh::from(&dcel);
        assert_eq!(back.canonical_triangles(), grid.canonical_triangles());
    }

    #[test]
    pub fn test_generic_indices_and_normals() {
        let mesh = test_meshes::octahedron();
        let small: Vec<[u8; 3]> = mesh
            .triangles
            .iter()
            .map(|t| [t[0] as u8, t[1] as u8, t[2] as u8])
            .collect();
        let dcel =
            Dcel::build_from_triangles(&mesh.positions, &[], &small, BorderPolicy::Reject).unwrap();
        for (v, vertex) in dcel.iter_vertices() {
            // Octahedron normals point along the vertex position
            assert!(vertex.normal.dot(vertex.position) > 0.99, "{v:?}");
        }
    }

    #[test]
    pub fn test_rejects_malformed_input() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        // Out of bounds
        assert!(
            Dcel::build_from_triangles(&positions, &[], &[[0u32, 1, 9]], BorderPolicy::Close)
                .is_err()
        );
        // Repeated corner
        assert!(
            Dcel::build_from_triangles(&positions, &[], &[[0u32, 1, 1]], BorderPolicy::Close)
                .is_err()
        );
        // Unused vertex
        assert!(
            Dcel::build_from_triangles(&positions, &[], &[[0u32, 1, 2]], BorderPolicy::Close)
                .is_err()
        );
        // Flipped neighbor
        assert!(Dcel::build_from_triangles(
            &positions,
            &[],
            &[[0u32, 1, 2], [0, 1, 3]],
            BorderPolicy::Close
        )
        .is_err());
        // Three triangles on one edge
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z, Vec3::NEG_Y];
        assert!(Dcel::build_from_triangles(
            &positions,
            &[],
            &[[0u32, 1, 2], [1, 0, 3], [1, 0, 4]],
            BorderPolicy::Close
        )
        .is_err());
    }
}
