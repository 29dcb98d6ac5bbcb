// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::ops::Index;

use slotmap::{SecondaryMap, SlotMap};

/// Assigns each live id of an arena a dense index, in iteration order.
pub struct MeshMapping<K: slotmap::Key> {
    pub indices: SecondaryMap<K, u32>,
    pub ids: Vec<K>,
}

impl<K: slotmap::Key> Index<K> for MeshMapping<K> {
    type Output = u32;
    fn index(&self, index: K) -> &Self::Output {
        &self.indices[index]
    }
}

impl<K: slotmap::Key> MeshMapping<K> {
    pub fn new<V>(arena: &SlotMap<K, V>) -> Self {
        let mut indices = SecondaryMap::new();
        let mut ids = Vec::with_capacity(arena.len());
        for (i, k) in arena.keys().enumerate() {
            indices.insert(k, i as u32);
            ids.push(k);
        }
        Self { indices, ids }
    }

    pub fn get(&self, id: K) -> Option<u32> {
        self.indices.get(id).copied()
    }

    /// The id that was assigned dense index `index`.
    pub fn id(&self, index: u32) -> Option<K> {
        self.ids.get(index as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn map_seq(&self, seq: &[K]) -> Vec<u32> {
        seq.iter().map(|x| self[*x]).collect()
    }
}
