// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A half-edge (doubly connected edge list) triangle mesh engine with local
//! edge operators and two remeshing drivers built on top of them.

/// Some useful re-exports
pub mod prelude;

/// The doubly connected edge list: arenas, typed ids, traversals.
pub mod dcel;

/// Plain indexed triangle meshes, used for input / output.
pub mod triangle_mesh;

/// Topological predicates, repair helpers, conversion, local extraction and
/// sizing values over a [`dcel::Dcel`].
pub mod topology;

/// A four stage algorithm framework with a uniform lifecycle.
pub mod algorithm;

/// Local edge operators: split, collapse and flip.
pub mod edge_ops;

/// Tangential and adaptive vertex relaxation over triangle meshes.
pub mod relaxation;

/// Isotropic and curvature adaptive remeshing drivers.
pub mod remesh;

#[cfg(test)]
pub mod test_meshes;
