// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Small closed and open meshes shared by the unit tests. All of them are
//! counter clockwise when seen from the outside.

use crate::prelude::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Regular tetrahedron, every vertex has valence 3.
pub fn tetrahedron() -> TriangleMesh {
    TriangleMesh::new(
        vec![
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        ],
        vec![[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]],
    )
}

/// Regular octahedron inscribed in the unit sphere, every vertex has valence 4.
pub fn octahedron() -> TriangleMesh {
    TriangleMesh::new(
        vec![
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
        ],
        vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ],
    )
}

/// Regular icosahedron inscribed in the unit sphere.
pub fn icosahedron() -> TriangleMesh {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    let positions = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
    .collect();
    let triangles = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    TriangleMesh::new(positions, triangles)
}

/// The icosahedron with every triangle split in four `levels` times, with
/// new vertices pushed back onto the unit sphere.
pub fn icosphere(levels: usize) -> TriangleMesh {
    let mut mesh = icosahedron();
    for _ in 0..levels {
        let mut midpoints = HashMap::<(u32, u32), u32>::new();
        let mut positions = mesh.positions.clone();
        let mut midpoint = |a: u32, b: u32| -> u32 {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                let p = (positions[a as usize] + positions[b as usize]).normalize();
                positions.push(p);
                (positions.len() - 1) as u32
            })
        };
        let mut triangles = Vec::with_capacity(mesh.triangles.len() * 4);
        for &[a, b, c] in &mesh.triangles {
            let ab = midpoint(a, b);
            let bc = midpoint(b, c);
            let ca = midpoint(c, a);
            triangles.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        mesh = TriangleMesh::new(positions, triangles);
    }
    mesh
}

/// A flat `n` x `n` grid of unit squares on the z = 0 plane, each square cut
/// along its (i, j) - (i + 1, j + 1) diagonal. The mesh is open.
pub fn grid(n: u32) -> TriangleMesh {
    let row = n + 1;
    let positions = (0..row)
        .cartesian_product(0..row)
        .map(|(j, i)| Vec3::new(i as f32, j as f32, 0.0))
        .collect();
    let mut triangles = vec![];
    for j in 0..n {
        for i in 0..n {
            let v00 = i + j * row;
            let v10 = v00 + 1;
            let v01 = v00 + row;
            let v11 = v01 + 1;
            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
        }
    }
    TriangleMesh::new(positions, triangles)
}

/// A unit cube with its faces cut by hand picked diagonals. The bottom
/// diagonal (0, 2) has three common neighbors: 1, 3 and 5.
pub fn cube() -> TriangleMesh {
    TriangleMesh::new(
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ],
        vec![
            // bottom
            [0, 3, 2],
            [0, 2, 1],
            // top
            [4, 5, 6],
            [4, 6, 7],
            // front
            [0, 1, 5],
            [0, 5, 4],
            // right
            [1, 2, 5],
            [2, 6, 5],
            // back
            [2, 3, 7],
            [2, 7, 6],
            // left
            [0, 4, 7],
            [0, 7, 3],
        ],
    )
}
