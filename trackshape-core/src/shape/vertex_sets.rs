/// Partition of a sub-object's vertex arena into contiguous vertex sets
use crate::shape::TrilistRecord;

/// `vertex_set ( vtx_state start count )`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexSet {
    pub vtx_state: usize,
    pub start: usize,
    pub count: usize,
}

impl VertexSet {
    pub fn new(vtx_state: usize, start: usize, count: usize) -> Self {
        Self {
            vtx_state,
            start,
            count,
        }
    }

    pub fn end(&self) -> usize {
        self.start + self.count
    }

    pub fn contains(&self, vertex_idx: usize) -> bool {
        self.start <= vertex_idx && vertex_idx < self.end()
    }
}

/// Set a trilist's new vertices belong to: the set holding its first
/// referenced vertex, else the first set with the prim_state's vtx_state,
/// else the last set
pub(crate) fn binding_set(
    sets: &[VertexSet],
    trilist: &TrilistRecord,
    vtx_state: Option<usize>,
) -> Option<usize> {
    let by_reference = trilist
        .vertex_idxs
        .first()
        .and_then(|&first| sets.iter().position(|set| set.contains(first)));
    by_reference
        .or_else(|| vtx_state.and_then(|state| sets.iter().position(|set| set.vtx_state == state)))
        .or_else(|| sets.len().checked_sub(1))
}

/// Grow set `bound` by one vertex at its end, moving later sets along.
/// Returns the arena slot the new vertex takes.
pub(crate) fn grow(sets: &mut [VertexSet], bound: usize) -> usize {
    let slot = sets[bound].end();
    for (idx, set) in sets.iter_mut().enumerate() {
        if idx == bound {
            set.count += 1;
        } else if set.start >= slot {
            set.start += 1;
        }
    }
    slot
}

/// Renumber every vertex index at or past `slot` after an insertion there
pub(crate) fn shift_indices<'a>(
    trilists: impl Iterator<Item = &'a mut TrilistRecord>,
    slot: usize,
) -> usize {
    let mut shifted = 0;
    for trilist in trilists {
        for idx in trilist.vertex_idxs.iter_mut().filter(|idx| **idx >= slot) {
            *idx += 1;
            shifted += 1;
        }
    }
    shifted
}
