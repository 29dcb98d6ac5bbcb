// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Isotropic remeshing towards a single target edge length, after Botsch and
//! Kobbelt, "A remeshing approach to multiresolution modeling" (2004).

use serde::{Deserialize, Serialize};

use super::{
    check_input, log_iteration, remesh_iteration, valid_scales, PassSettings, RemeshStats, RemeshStatus,
    TargetLength,
};
use crate::prelude::*;
use crate::relaxation::{RelaxationMode, RelaxationParameter};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bk2004Parameter {
    pub algorithm_iterations: u32,
    /// Relaxation iterations run at the end of every remeshing iteration.
    pub smoothing_iterations: u32,
    pub long_scale: f32,
    pub short_scale: f32,
    /// Tangential relaxation damping, in `(0, 1]`.
    pub lambda: f32,
    /// Defaults to the mean edge length of the input mesh.
    pub target_length: Option<f32>,
    /// Verify the mesh after every pass.
    pub check_consistency: bool,
}

impl Default for Bk2004Parameter {
    fn default() -> Self {
        Self {
            algorithm_iterations: 5,
            smoothing_iterations: 5,
            long_scale: 4.0 / 3.0,
            short_scale: 4.0 / 5.0,
            lambda: 0.5,
            target_length: None,
            check_consistency: cfg!(debug_assertions),
        }
    }
}

impl Bk2004Parameter {
    pub fn with_algorithm_iterations(mut self, iterations: u32) -> Self {
        self.algorithm_iterations = iterations;
        self
    }

    pub fn with_smoothing_iterations(mut self, iterations: u32) -> Self {
        self.smoothing_iterations = iterations;
        self
    }

    pub fn with_scales(mut self, long_scale: f32, short_scale: f32) -> Self {
        self.long_scale = long_scale;
        self.short_scale = short_scale;
        self
    }

    pub fn with_lambda(mut self, lambda: f32) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_target_length(mut self, length: f32) -> Self {
        self.target_length = Some(length);
        self
    }

    pub fn with_check_consistency(mut self, check: bool) -> Self {
        self.check_consistency = check;
        self
    }

    fn is_valid(&self) -> bool {
        let target_ok = match self.target_length {
            Some(l) => l.is_finite() && l > 0.0,
            None => true,
        };
        valid_scales(self.long_scale, self.short_scale)
            && self.lambda > 0.0
            && self.lambda <= 1.0
            && target_ok
    }

    fn pass_settings(&self) -> PassSettings {
        PassSettings {
            long_scale: self.long_scale,
            short_scale: self.short_scale,
            relaxation: RelaxationParameter::default()
                .with_iterations(self.smoothing_iterations)
                .with_mode(RelaxationMode::Tangential { lambda: self.lambda }),
            check_consistency: self.check_consistency,
        }
    }
}

pub struct Bk2004<'a> {
    dcel: &'a mut Dcel,
    parameter: Bk2004Parameter,
    target_length: f32,
    stats: RemeshStats,
}

impl<'a> Bk2004<'a> {
    pub fn new(dcel: &'a mut Dcel, parameter: Bk2004Parameter) -> Self {
        Self {
            dcel,
            parameter,
            target_length: 0.0,
            stats: RemeshStats::default(),
        }
    }

    pub fn parameter(&self) -> &Bk2004Parameter {
        &self.parameter
    }

    /// The target edge length, known once preprocessing has run.
    pub fn target_length(&self) -> f32 {
        self.target_length
    }

    pub fn stats(&self) -> &RemeshStats {
        &self.stats
    }
}

impl<'a> AlgorithmStages for Bk2004<'a> {
    type ExitStatus = RemeshStatus;
    const NAME: &'static str = "BK2004";

    fn config_check(&mut self) -> Result<(), RemeshStatus> {
        if !self.parameter.is_valid() {
            return Err(RemeshStatus::InvalidParameter);
        }
        Ok(())
    }

    fn preprocessing(&mut self) -> Result<(), RemeshStatus> {
        check_input(self.dcel, self.parameter.check_consistency)?;
        self.target_length = match self.parameter.target_length {
            Some(length) => length,
            None => self
                .dcel
                .mean_edge_length()
                .filter(|l| l.is_finite() && *l > 0.0)
                .ok_or(RemeshStatus::InvalidMesh)?,
        };
        log::debug!("{} target edge length {}", Self::NAME, self.target_length);
        Ok(())
    }

    fn processing(&mut self) -> Result<RemeshStatus, RemeshStatus> {
        let settings = self.parameter.pass_settings();
        let target = TargetLength::Uniform(self.target_length);
        for i in 0..self.parameter.algorithm_iterations {
            let counts = remesh_iteration(self.dcel, target, &settings)?;
            log_iteration(Self::NAME, i, &counts, self.dcel);
            self.stats.iterations.push(counts);
        }
        Ok(RemeshStatus::Success)
    }

    fn postprocessing(&mut self) -> Result<(), RemeshStatus> {
        let total = self.stats.total();
        log::info!(
            "{} done: {} splits, {} collapses, {} flips in {} iterations",
            Self::NAME,
            total.splits,
            total.collapses,
            total.flips,
            self.stats.iterations.len()
        );
        Ok(())
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::remesh::PassCounts;
    use crate::test_meshes;

    fn remesh(dcel: &mut Dcel, parameter: Bk2004Parameter) -> (AlgorithmState, RemeshStatus, RemeshStats) {
        let mut alg = Algorithm::new(Bk2004::new(dcel, parameter));
        alg.run();
        (alg.state(), alg.exit_status(), alg.into_inner().stats)
    }

    #[test]
    pub fn test_evens_out_edge_lengths() {
        test_meshes::init_logging();
        let mut mesh = test_meshes::icosphere(2);
        // Pull one vertex out into a spike, its edges over ten times the
        // mean edge length
        mesh.positions[0] *= 5.0;
        mesh.recompute_normals();
        let before = mesh.edge_length_stats().unwrap();
        assert!(before.max > 10.0 * before.mean, "{before:?}");

        let mut dcel = Dcel::try_from(&mesh).unwrap();
        let parameter = Bk2004Parameter::default().with_check_consistency(true);
        let (state, status, stats) = remesh(&mut dcel, parameter);
        assert_eq!(state, AlgorithmState::Completed, "{status:?}");
        assert_eq!(status, RemeshStatus::Success);
        assert_eq!(stats.iterations.len(), 5);
        assert!(stats.total().splits > 0);
        assert!(dcel.is_consistent());

        let after = TriangleMesh::from(&dcel).edge_length_stats().unwrap();
        assert!(after.max < before.max, "{after:?}");
        assert!(after.max / after.min < before.max / before.min, "{before:?} {after:?}");
        assert!(after.max / after.mean < before.max / before.mean, "{before:?} {after:?}");
    }

    #[test]
    pub fn test_regular_mesh_is_left_alone() {
        let mut dcel = Dcel::try_from(&test_meshes::icosahedron()).unwrap();
        let mean = dcel.mean_edge_length().unwrap();

        let mut alg = Algorithm::new(Bk2004::new(&mut dcel, Bk2004Parameter::default()));
        alg.run();
        assert!(alg.is_completed());
        assert!((alg.stages().target_length() - mean).abs() < 1e-6);
        // Every vertex has valence 5. Flips keep the valence error at 4 but
        // would leave thinner triangles behind
        assert_eq!(alg.stages().stats().total(), PassCounts::default());
        drop(alg);

        assert_eq!(dcel.num_vertices(), 12);
        assert!(dcel.is_consistent());
    }

    #[test]
    pub fn test_rejects_bad_configuration() {
        let bad = [
            Bk2004Parameter::default().with_scales(0.8, 0.8),
            Bk2004Parameter::default().with_scales(f32::NAN, 0.8),
            Bk2004Parameter::default().with_lambda(1.5),
            Bk2004Parameter::default().with_target_length(-1.0),
        ];
        for parameter in bad {
            let mut dcel = Dcel::try_from(&test_meshes::octahedron()).unwrap();
            let (state, status, _) = remesh(&mut dcel, parameter);
            assert_eq!(state, AlgorithmState::NotConfigured);
            assert_eq!(status, RemeshStatus::InvalidParameter);
        }
    }

    #[test]
    pub fn test_rejects_empty_mesh() {
        let mut dcel = Dcel::new();
        let (state, status, _) = remesh(&mut dcel, Bk2004Parameter::default());
        assert_eq!(state, AlgorithmState::PreprocessingFailed);
        assert_eq!(status, RemeshStatus::InvalidMesh);
    }

    #[test]
    pub fn test_parameter_from_ron() {
        let parameter: Bk2004Parameter =
            ron::from_str("(algorithm_iterations: 2, target_length: Some(0.5), lambda: 0.25)").unwrap();
        assert_eq!(parameter.algorithm_iterations, 2);
        assert_eq!(parameter.target_length, Some(0.5));
        assert_eq!(parameter.lambda, 0.25);
        assert_eq!(parameter.smoothing_iterations, 5);
        assert_eq!(parameter.long_scale, 4.0 / 3.0);
    }
}
