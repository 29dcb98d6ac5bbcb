// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub use anyhow::{anyhow, bail, Context, Result};

pub use glam::{Vec2, Vec3};
pub use itertools::Itertools;
pub use std::collections::{HashMap, HashSet};

pub use dcel_commons::math::ToOrd;
pub use dcel_commons::utils::{IteratorUtils, SVec, SVecN, SliceUtils};

pub use crate::algorithm::{Algorithm, AlgorithmStages, AlgorithmState, ExitStatus};
pub use crate::dcel::*;
pub use crate::topology::Topology;
pub use crate::triangle_mesh::TriangleMesh;
