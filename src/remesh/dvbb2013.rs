// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curvature adaptive remeshing, after Dunyach, Vanderhaeghe, Barthe and
//! Botsch, "Adaptive remeshing for real-time mesh deformation" (2013).
//! Every edge aims for the smaller sizing value of its two endpoints, so
//! curved regions get denser.

use serde::{Deserialize, Serialize};

use super::{
    check_input, log_iteration, remesh_iteration, valid_scales, PassSettings, RemeshStats, RemeshStatus,
    TargetLength,
};
use crate::prelude::*;
use crate::relaxation::{RelaxationMode, RelaxationParameter};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dvbb2013Parameter {
    pub algorithm_iterations: u32,
    pub smoothing_iterations: u32,
    pub long_scale: f32,
    pub short_scale: f32,
    /// Maximum distance between an edge and the surface it approximates.
    pub eps: f32,
    pub check_consistency: bool,
}

impl Default for Dvbb2013Parameter {
    fn default() -> Self {
        Self {
            algorithm_iterations: 5,
            smoothing_iterations: 5,
            long_scale: 4.0 / 3.0,
            short_scale: 4.0 / 5.0,
            eps: 0.01,
            check_consistency: cfg!(debug_assertions),
        }
    }
}

impl Dvbb2013Parameter {
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

    pub fn with_eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_check_consistency(mut self, check: bool) -> Self {
        self.check_consistency = check;
        self
    }

    fn is_valid(&self) -> bool {
        valid_scales(self.long_scale, self.short_scale) && self.eps.is_finite() && self.eps > 0.0
    }

    fn pass_settings(&self) -> PassSettings {
        PassSettings {
            long_scale: self.long_scale,
            short_scale: self.short_scale,
            relaxation: RelaxationParameter::default()
                .with_iterations(self.smoothing_iterations)
                .with_mode(RelaxationMode::Adaptive { eps: self.eps }),
            check_consistency: self.check_consistency,
        }
    }
}

pub struct Dvbb2013<'a> {
    dcel: &'a mut Dcel,
    parameter: Dvbb2013Parameter,
    stats: RemeshStats,
}

impl<'a> Dvbb2013<'a> {
    pub fn new(dcel: &'a mut Dcel, parameter: Dvbb2013Parameter) -> Self {
        Self {
            dcel,
            parameter,
            stats: RemeshStats::default(),
        }
    }

    pub fn parameter(&self) -> &Dvbb2013Parameter {
        &self.parameter
    }

    pub fn stats(&self) -> &RemeshStats {
        &self.stats
    }
}

impl<'a> AlgorithmStages for Dvbb2013<'a> {
    type ExitStatus = RemeshStatus;
    const NAME: &'static str = "DVBB2013";

    fn config_check(&mut self) -> Result<(), RemeshStatus> {
        if !self.parameter.is_valid() {
            return Err(RemeshStatus::InvalidParameter);
        }
        Ok(())
    }

    fn preprocessing(&mut self) -> Result<(), RemeshStatus> {
        check_input(self.dcel, self.parameter.check_consistency)
    }

    fn processing(&mut self) -> Result<RemeshStatus, RemeshStatus> {
        let settings = self.parameter.pass_settings();
        let target = TargetLength::Adaptive {
            eps: self.parameter.eps,
        };
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
    use crate::test_meshes;

    #[test]
    pub fn test_refines_sphere() {
        test_meshes::init_logging();
        let mesh = test_meshes::icosphere(1);
        let mut dcel = Dcel::try_from(&mesh).unwrap();

        // At eps = 0.01 the unit sphere wants edges of about 0.24, well below
        // the 0.5 to 0.6 of a once subdivided icosahedron
        let parameter = Dvbb2013Parameter::default()
            .with_algorithm_iterations(1)
            .with_check_consistency(true);
        let mut alg = Algorithm::new(Dvbb2013::new(&mut dcel, parameter));
        alg.run();
        assert!(alg.is_completed(), "{:?}", alg.exit_status());
        assert_eq!(alg.exit_status(), RemeshStatus::Success);
        let stats = alg.into_inner().stats;
        assert_eq!(stats.iterations.len(), 1);
        assert!(stats.total().splits > 0);

        assert!(dcel.num_vertices() > mesh.num_vertices());
        assert!(dcel.is_consistent());
        for (_, v) in dcel.iter_vertices() {
            assert!(v.position.is_finite());
            assert!((v.position.length() - 1.0).abs() < 0.2, "{}", v.position);
        }
    }

    #[test]
    pub fn test_too_curved_surface_fails() {
        let mut mesh = test_meshes::icosphere(1);
        mesh.positions.iter_mut().for_each(|p| *p *= 1e-3);
        let mut dcel = Dcel::try_from(&mesh).unwrap();

        let mut alg = Algorithm::new(Dvbb2013::new(&mut dcel, Dvbb2013Parameter::default()));
        alg.run();
        assert_eq!(alg.state(), AlgorithmState::ProcessingFailed);
        assert_eq!(alg.exit_status(), RemeshStatus::InvalidSizingValue);
        assert!(alg.stages().stats().iterations.is_empty());
    }

    #[test]
    pub fn test_rejects_bad_configuration() {
        for parameter in [
            Dvbb2013Parameter::default().with_eps(0.0),
            Dvbb2013Parameter::default().with_eps(f32::INFINITY),
            Dvbb2013Parameter::default().with_scales(0.5, 0.8),
        ] {
            let mut dcel = Dcel::try_from(&test_meshes::octahedron()).unwrap();
            let mut alg = Algorithm::new(Dvbb2013::new(&mut dcel, parameter));
            alg.run();
            assert_eq!(alg.state(), AlgorithmState::NotConfigured);
            assert_eq!(alg.exit_code(), RemeshStatus::InvalidParameter as u32);
        }
    }

    #[test]
    pub fn test_parameter_from_ron() {
        let parameter: Dvbb2013Parameter = ron::from_str("(eps: 0.002, short_scale: 0.5)").unwrap();
        assert_eq!(parameter.eps, 0.002);
        assert_eq!(parameter.short_scale, 0.5);
        assert_eq!(parameter.algorithm_iterations, 5);
        assert_eq!(parameter, Dvbb2013Parameter::default().with_eps(0.002).with_scales(4.0 / 3.0, 0.5));
    }
}
