// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Small vector aliases and iterator helpers
pub mod utils;

/// Float ordering helpers and small vector math used by the mesh predicates
pub mod math;

/// Pure geometry functions over flat vertex / triangle arrays: normals,
/// per-vertex areas, the cotangent Laplacian and discrete curvatures.
pub mod geometry;
