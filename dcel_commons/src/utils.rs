// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use smallvec::SmallVec;

pub type SVec<T> = SmallVec<[T; 4]>;
pub type SVecN<T, const N: usize> = SmallVec<[T; N]>;

pub trait IteratorUtils: Iterator {
    fn collect_svec(self) -> SVec<Self::Item>
    where
        Self: Sized,
    {
        self.collect()
    }
}

impl<T: ?Sized> IteratorUtils for T where T: Iterator {}

pub trait SliceUtils<T> {
    /// Same as .iter().copied(), but doesn't trigger rustfmt line breaks
    fn iter_cpy(&self) -> std::iter::Copied<std::slice::Iter<'_, T>>;
}

impl<T: Copy> SliceUtils<T> for [T] {
    fn iter_cpy(&self) -> std::iter::Copied<std::slice::Iter<'_, T>> {
        self.iter().copied()
    }
}

/// Transmutes a vector of `T`s into a vector of `U`s.
///
/// # Safety
/// This is only safe when `T` and `U` have the same size, plus all the
/// additional safety considerations required when calling `transmute::<T,U>`
pub unsafe fn transmute_vec<T, U>(v: Vec<T>) -> Vec<U> {
    let mut v = std::mem::ManuallyDrop::new(v);
    let ptr = v.as_mut_ptr();
    let len = v.len();
    let cap = v.capacity();

    Vec::from_raw_parts(ptr as *mut U, len, cap)
}

#[test]
pub fn test() {
    use itertools::Itertools;

    let v = [3, 1, 2];
    assert_eq!(v.iter_cpy().sorted().collect_svec().as_slice(), &[1, 2, 3]);

    // SAFETY: u32 and f32 have the same size
    let bits = unsafe { transmute_vec::<f32, u32>(vec![1.0, 2.0]) };
    assert_eq!(bits, vec![1.0f32.to_bits(), 2.0f32.to_bits()]);
}
