// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use super::{EdgeHandles, EdgeOperation, EdgeStatus};
use crate::prelude::*;

use dcel_commons::math::{min_angle, triangle_area, triangle_normal};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FlipStatus {
    #[default]
    Success,
    Edge(EdgeStatus),
    BorderFullEdge,
    FaceInversion,
    DihedralAngleTooLarge,
    WorseQuality,
    NotManifold,
    DegenerateFace,
    InvalidParameter,
}
crate::impl_status_error!(FlipStatus);

impl ExitStatus for FlipStatus {
    fn code(&self) -> u32 {
        match self {
            FlipStatus::Success => 0,
            FlipStatus::Edge(status) => status.code(),
            FlipStatus::BorderFullEdge => 10,
            FlipStatus::FaceInversion => 12,
            FlipStatus::DihedralAngleTooLarge => 13,
            FlipStatus::WorseQuality => 14,
            FlipStatus::NotManifold => 15,
            FlipStatus::DegenerateFace => 16,
            FlipStatus::InvalidParameter => 17,
        }
    }
}

impl From<EdgeStatus> for FlipStatus {
    fn from(status: EdgeStatus) -> Self {
        FlipStatus::Edge(status)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipParameter {
    /// New faces with a smaller area are degenerate.
    pub min_face_area: f32,
    /// Largest angle, in radians, allowed between the normals of the two new
    /// faces.
    pub max_dihedral_angle: f32,
    /// Reject flips that make the smallest interior angle of the quad worse.
    pub check_quality: bool,
}

impl Default for FlipParameter {
    fn default() -> Self {
        Self {
            min_face_area: 1e-12,
            max_dihedral_angle: std::f32::consts::FRAC_PI_4,
            check_quality: false,
        }
    }
}

impl FlipParameter {
    pub fn with_min_face_area(mut self, area: f32) -> Self {
        self.min_face_area = area;
        self
    }

    pub fn with_max_dihedral_angle(mut self, angle: f32) -> Self {
        self.max_dihedral_angle = angle;
        self
    }

    pub fn with_check_quality(mut self, check: bool) -> Self {
        self.check_quality = check;
        self
    }
}

/// Replaces the diagonal `v0 - v1` of the quad formed by the two adjacent
/// triangles with the other diagonal `x - y`. The full-edge and its two
/// half-edges are reused, so no element is created or removed.
///
/// ```text
///         x                     x
///        / \                   /|\
///     b /   \ a             b / | \ a
///      /  h  \               /  |  \
///    v0 ----> v1    ==>    v0  h|t  v1
///      \  t  /               \  |  /
///     c \   / d             c \ | / d
///        \ /                   \|/
///         y                     y
/// ```
pub struct EdgeFlipper<'a> {
    dcel: &'a mut Dcel,
    fulledge: FullEdgeId,
    parameter: FlipParameter,
    flipped: bool,
}

impl<'a> EdgeFlipper<'a> {
    pub fn new(dcel: &'a mut Dcel, fulledge: FullEdgeId, parameter: FlipParameter) -> Self {
        Self {
            dcel,
            fulledge,
            parameter,
            flipped: false,
        }
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// The full-edge now joining the two opposite corners.
    pub fn flipped_fulledge(&self) -> Option<FullEdgeId> {
        self.flipped.then_some(self.fulledge)
    }

    /// Each endpoint loses one edge. Interior vertices need three edges left,
    /// border vertices two.
    fn check_valence(&self, v: VertexId) -> Result<(), FlipStatus> {
        let valence = self
            .dcel
            .at_vertex(v)
            .valence()
            .map_err(|_| FlipStatus::Edge(EdgeStatus::InvalidVertex))?;
        let min_valence = if self.dcel.is_border(v) { 2 } else { 3 };
        if valence <= min_valence {
            return Err(FlipStatus::NotManifold);
        }
        Ok(())
    }
}

impl<'a> EdgeOperation for EdgeFlipper<'a> {
    type Status = FlipStatus;

    fn dcel(&self) -> &Dcel {
        self.dcel
    }

    fn fulledge(&self) -> FullEdgeId {
        self.fulledge
    }

    fn is_processable(&self, e: &EdgeHandles) -> Result<(), FlipStatus> {
        let (Some(x), Some(y), Some(f0), Some(f1)) = (e.x, e.y, e.f0, e.f1) else {
            return Err(FlipStatus::BorderFullEdge);
        };
        let dcel = &*self.dcel;

        if x == y || dcel.at_vertex(x).halfedge_to(y).try_end().is_ok() {
            return Err(FlipStatus::NotManifold);
        }
        self.check_valence(e.v0)?;
        self.check_valence(e.v1)?;

        let (p0, p1) = (dcel[e.v0].position, dcel[e.v1].position);
        let (px, py) = (dcel[x].position, dcel[y].position);
        // The two triangles after the flip, see the diagram above
        let (new0, new1) = ([py, px, p0], [px, py, p1]);

        let min_area = self.parameter.min_face_area;
        if triangle_area(new0[0], new0[1], new0[2]) < min_area
            || triangle_area(new1[0], new1[1], new1[2]) < min_area
        {
            return Err(FlipStatus::DegenerateFace);
        }

        let n0 = triangle_normal(new0[0], new0[1], new0[2]).normalize();
        let n1 = triangle_normal(new1[0], new1[1], new1[2]).normalize();
        if n0.dot(n1).clamp(-1.0, 1.0).acos() > self.parameter.max_dihedral_angle {
            return Err(FlipStatus::DihedralAngleTooLarge);
        }

        let old_normal = dcel.face_normal(f0).unwrap_or(Vec3::ZERO)
            + dcel.face_normal(f1).unwrap_or(Vec3::ZERO);
        if n0.dot(old_normal) <= 0.0 || n1.dot(old_normal) <= 0.0 {
            return Err(FlipStatus::FaceInversion);
        }

        if self.parameter.check_quality {
            let before = min_angle(p0, p1, px).min(min_angle(p1, p0, py));
            let after = min_angle(new0[0], new0[1], new0[2]).min(min_angle(new1[0], new1[1], new1[2]));
            if after < before {
                return Err(FlipStatus::WorseQuality);
            }
        }
        Ok(())
    }

    fn apply(&mut self, e: &EdgeHandles) -> Result<(), FlipStatus> {
        let (Some(x), Some(y), Some(f0), Some(f1)) = (e.x, e.y, e.f0, e.f1) else {
            return Err(FlipStatus::BorderFullEdge);
        };
        let invalid = |_| FlipStatus::Edge(EdgeStatus::InvalidHalfEdge);
        let a = self.dcel.at_halfedge(e.h).next().try_end().map_err(invalid)?;
        let b = self.dcel.at_halfedge(a).next().try_end().map_err(invalid)?;
        let c = self.dcel.at_halfedge(e.t).next().try_end().map_err(invalid)?;
        let d = self.dcel.at_halfedge(c).next().try_end().map_err(invalid)?;

        let dcel = &mut *self.dcel;
        if dcel[e.v0].halfedge == Some(e.h) {
            dcel[e.v0].halfedge = Some(c);
        }
        if dcel[e.v1].halfedge == Some(e.t) {
            dcel[e.v1].halfedge = Some(a);
        }

        dcel[e.h].vertex = Some(y);
        dcel[e.t].vertex = Some(x);
        dcel.link(e.h, b);
        dcel.link(b, c);
        dcel.link(c, e.h);
        dcel.link(e.t, d);
        dcel.link(d, a);
        dcel.link(a, e.t);

        dcel[a].face = Some(f1);
        dcel[c].face = Some(f0);
        dcel[f0].halfedge = Some(e.h);
        dcel[f1].halfedge = Some(e.t);

        self.flipped = true;
        Ok(())
    }
}

impl<'a> AlgorithmStages for EdgeFlipper<'a> {
    type ExitStatus = FlipStatus;
    const NAME: &'static str = "EdgeFlipper";

    fn config_check(&mut self) -> Result<(), FlipStatus> {
        let p = &self.parameter;
        if !(p.min_face_area.is_finite() && p.min_face_area >= 0.0)
            || !(p.max_dihedral_angle > 0.0 && p.max_dihedral_angle <= std::f32::consts::PI)
        {
            return Err(FlipStatus::InvalidParameter);
        }
        self.check_index()
    }

    fn preprocessing(&mut self) -> Result<(), FlipStatus> {
        self.check_present()
    }

    fn processing(&mut self) -> Result<FlipStatus, FlipStatus> {
        self.process_edge()
    }

    fn postprocessing(&mut self) -> Result<(), FlipStatus> {
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::edge_ops::flip_edge;
    use crate::test_meshes;

    fn diagonal(dcel: &Dcel) -> FullEdgeId {
        dcel.iter_fulledges()
            .map(|(e, _)| e)
            .find(|&e| !dcel.is_border(e))
            .unwrap()
    }

    #[test]
    pub fn test_flip_and_reflip_square() {
        test_meshes::init_logging();
        let mut dcel = Dcel::from_triangle_mesh_with_border(&test_meshes::grid(1)).unwrap();
        let original = TriangleMesh::from(&dcel).canonical_triangles();
        let counts = (dcel.num_halfedges(), dcel.num_fulledges(), dcel.num_faces());
        let e = diagonal(&dcel);

        let mut alg = Algorithm::new(EdgeFlipper::new(&mut dcel, e, FlipParameter::default()));
        assert_eq!(alg.run(), 0);
        assert_eq!(alg.stages().flipped_fulledge(), Some(e));

        assert!(dcel.is_consistent());
        assert_eq!(
            (dcel.num_halfedges(), dcel.num_fulledges(), dcel.num_faces()),
            counts
        );
        let flipped = TriangleMesh::from(&dcel).canonical_triangles();
        assert_eq!(flipped, vec![[0, 1, 2], [1, 3, 2]]);

        assert!(flip_edge(&mut dcel, e, FlipParameter::default()).unwrap());
        assert!(dcel.is_consistent());
        assert_eq!(TriangleMesh::from(&dcel).canonical_triangles(), original);
    }

    #[test]
    pub fn test_illegal_flips() {
        let mut dcel = Dcel::from_triangle_mesh_with_border(&test_meshes::grid(1)).unwrap();
        let border = dcel
            .iter_fulledges()
            .map(|(e, _)| e)
            .find(|&e| dcel.is_border(e))
            .unwrap();
        let mut alg = Algorithm::new(EdgeFlipper::new(&mut dcel, border, FlipParameter::default()));
        alg.run();
        assert!(alg.is_completed());
        assert_eq!(alg.exit_status(), FlipStatus::BorderFullEdge);

        // The opposite corners of every tetrahedron edge are already joined
        let mut dcel = Dcel::try_from(&test_meshes::tetrahedron()).unwrap();
        let (e, _) = dcel.iter_fulledges().next().unwrap();
        let mut alg = Algorithm::new(EdgeFlipper::new(&mut dcel, e, FlipParameter::default()));
        alg.run();
        assert_eq!(alg.exit_status(), FlipStatus::NotManifold);
        assert!(dcel.is_consistent());
    }

    #[test]
    pub fn test_dihedral_angle_limit() {
        let mut mesh = test_meshes::grid(1);
        mesh.positions[3] = Vec3::new(1.0, 1.0, 2.0);
        let mut dcel = Dcel::from_triangle_mesh_with_border(&mesh).unwrap();
        let e = diagonal(&dcel);
        let mut alg = Algorithm::new(EdgeFlipper::new(&mut dcel, e, FlipParameter::default()));
        alg.run();
        assert_eq!(alg.exit_status(), FlipStatus::DihedralAngleTooLarge);

        let relaxed = FlipParameter::default().with_max_dihedral_angle(std::f32::consts::FRAC_PI_2);
        assert!(flip_edge(&mut dcel, e, relaxed).unwrap());
    }

    #[test]
    pub fn test_quality_check() {
        // A kite with a long diagonal (0, 3): the short diagonal gives
        // better angles, and flipping back makes them worse again.
        let mut mesh = test_meshes::grid(1);
        mesh.positions[3] = Vec3::new(3.0, 3.0, 0.0);
        let mut dcel = Dcel::from_triangle_mesh_with_border(&mesh).unwrap();
        let e = diagonal(&dcel);
        let parameter = FlipParameter::default().with_check_quality(true);

        assert!(flip_edge(&mut dcel, e, parameter).unwrap());
        let mut alg = Algorithm::new(EdgeFlipper::new(&mut dcel, e, parameter));
        alg.run();
        assert_eq!(alg.exit_status(), FlipStatus::WorseQuality);
        assert!(!alg.stages().is_flipped());
    }

    #[test]
    pub fn test_parameter_from_partial_ron() {
        let parameter: FlipParameter = ron::from_str("(check_quality: true)").unwrap();
        assert!(parameter.check_quality);
        assert_eq!(parameter.max_dihedral_angle, std::f32::consts::FRAC_PI_4);
    }
}
