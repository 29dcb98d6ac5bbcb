// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::atomic::Ordering;

use atomic_float::AtomicF32;
use float_ord::FloatOrd;
use glam::{Vec2, Vec3};

/// Wraps a length (or any other float key) so it can be used with the
/// standard sorting functions.
pub trait ToOrd {
    fn to_ord(&self) -> FloatOrd<f32>;
}

impl ToOrd for f32 {
    fn to_ord(&self) -> FloatOrd<f32> {
        FloatOrd(*self)
    }
}

/// The non-normalized normal of triangle (a, b, c). Its length is twice the
/// triangle area.
pub fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a)
}

pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    0.5 * triangle_normal(a, b, c).length()
}

/// Interior angle at `at` in the triangle (at, b, c).
pub fn corner_angle(at: Vec3, b: Vec3, c: Vec3) -> f32 {
    let ab = (b - at).normalize_or_zero();
    let ac = (c - at).normalize_or_zero();
    ab.dot(ac).clamp(-1.0, 1.0).acos()
}

/// Cotangent of the interior angle at `at` in the triangle (at, b, c). Zero
/// for degenerate corners.
pub fn cotangent(at: Vec3, b: Vec3, c: Vec3) -> f32 {
    let ab = b - at;
    let ac = c - at;
    let cross = ab.cross(ac).length();
    if cross < 1e-12 {
        0.0
    } else {
        ab.dot(ac) / cross
    }
}

/// Smallest interior angle of triangle (a, b, c).
pub fn min_angle(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    corner_angle(a, b, c)
        .min(corner_angle(b, c, a))
        .min(corner_angle(c, a, b))
}

/// Returns two unit vectors spanning the plane orthogonal to `n`. `n` is
/// expected to be normalized.
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let helper = if n.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    let u = n.cross(helper).normalize();
    let v = n.cross(u);
    (u, v)
}

/// Twice the signed area of the 2d triangle (a, b, c). Positive for counter
/// clockwise winding.
pub fn signed_area_2d(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// A counterpart to `glam::Vec3` with atomics in its `x`, `y`, `z` fields.
#[repr(C)]
pub struct AtomicVec3 {
    pub x: AtomicF32,
    pub y: AtomicF32,
    pub z: AtomicF32,
}

impl AtomicVec3 {
    /// Calls `fetch_add` on each of the inner atomic values internally. Note
    /// that there is one atomic operation per dimension.
    pub fn fetch_add(&self, v: Vec3, order: Ordering) {
        self.x.fetch_add(v.x, order);
        self.y.fetch_add(v.y, order);
        self.z.fetch_add(v.z, order);
    }

    pub fn load(&self, order: Ordering) -> Vec3 {
        Vec3::new(self.x.load(order), self.y.load(order), self.z.load(order))
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    pub fn test_right_triangle() {
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!((triangle_area(a, b, c) - 0.5).abs() < 1e-6);
        assert!((corner_angle(a, b, c) - FRAC_PI_2).abs() < 1e-6);
        assert!((min_angle(a, b, c) - FRAC_PI_4).abs() < 1e-6);
        assert!(cotangent(a, b, c).abs() < 1e-6);
        assert!((cotangent(b, c, a) - 1.0).abs() < 1e-6);
        assert_eq!(triangle_normal(a, b, c).normalize(), Vec3::Z);
    }

    #[test]
    pub fn test_basis_is_orthonormal() {
        for n in [Vec3::X, Vec3::Y, Vec3::new(1.0, 2.0, 3.0).normalize()] {
            let (u, v) = orthonormal_basis(n);
            assert!(u.dot(n).abs() < 1e-6);
            assert!(v.dot(n).abs() < 1e-6);
            assert!(u.dot(v).abs() < 1e-6);
            assert!((u.length() - 1.0).abs() < 1e-5);
            assert!((v.length() - 1.0).abs() < 1e-5);
        }
        assert!(signed_area_2d(Vec2::ZERO, Vec2::X, Vec2::Y) > 0.0);
        assert!(signed_area_2d(Vec2::ZERO, Vec2::Y, Vec2::X) < 0.0);
    }
}
