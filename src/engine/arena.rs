//! Tensor arena and the static memory planner.
//!
//! All activation tensors live in one fixed-size byte region allocated at
//! startup.  Constant tensors (weights, biases) stay in the model artifact.
//! The planner assigns every activation an aligned offset such that two
//! tensors whose lifetimes overlap never share bytes; tensors with disjoint
//! lifetimes may reuse the same region.
//!
//! Placement is greedy: largest tensors first, each at the lowest offset
//! that clears every already-placed, lifetime-overlapping tensor.

use core::ops::Range;

use heapless::Vec;

use super::model::ModelArtifact;
use crate::error::AllocationError;

/// Alignment of every tensor offset inside the arena.
pub const TENSOR_ALIGNMENT: usize = 16;

/// Upper bound on tensors a plan can track.
pub const MAX_TENSORS: usize = 64;

/// Fixed-capacity byte region backing all activations.
pub struct TensorArena<const N: usize> {
    bytes: Box<[u8]>,
}

impl<const N: usize> TensorArena<N> {
    /// Allocate the arena once.  Built through `vec!` so the region never
    /// exists as a stack temporary.
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; N].into_boxed_slice(),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl<const N: usize> Default for TensorArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Where one activation tensor lives and when it is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub offset: usize,
    pub len: usize,
    /// First operator index that touches the tensor.
    pub first: usize,
    /// Last operator index that touches the tensor (inclusive).
    pub last: usize,
}

impl Placement {
    fn lifetime_overlaps(&self, other: &Self) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Result of planning: one optional placement per tensor.
#[derive(Debug, Clone, Default)]
pub struct ArenaPlan {
    placements: Vec<Option<Placement>, MAX_TENSORS>,
    used: usize,
}

impl ArenaPlan {
    /// Byte range of `tensor` inside the arena, `None` for constants and
    /// tensors no operator touches.
    pub fn range(&self, tensor: usize) -> Option<Range<usize>> {
        self.placements.get(tensor).copied().flatten().map(|p| p.range())
    }

    pub fn placement(&self, tensor: usize) -> Option<Placement> {
        self.placements.get(tensor).copied().flatten()
    }

    /// High-water mark of the plan in bytes.
    pub fn used(&self) -> usize {
        self.used
    }
}

fn touch(spans: &mut [Option<(usize, usize)>], tensor: usize, at: usize) {
    if let Some(slot) = spans.get_mut(tensor) {
        *slot = Some(match *slot {
            Some((first, last)) => (first.min(at), last.max(at)),
            None => (at, at),
        });
    }
}

const fn align_up(n: usize) -> usize {
    n.div_ceil(TENSOR_ALIGNMENT) * TENSOR_ALIGNMENT
}

/// Bytes an activation tensor occupies.
pub fn tensor_bytes(model: &ModelArtifact<'_>, index: usize) -> Result<usize, AllocationError> {
    let tensor = model
        .tensor(index)
        .ok_or(AllocationError::InvalidShape(index))?;
    let ty = tensor.type_();
    let elem = ty
        .element_size()
        .ok_or(AllocationError::UnsupportedType(ty.0))?;
    let mut count = 1usize;
    if let Some(shape) = tensor.shape() {
        for dim in shape.iter() {
            let dim = usize::try_from(dim).map_err(|_| AllocationError::InvalidShape(index))?;
            count = count
                .checked_mul(dim)
                .ok_or(AllocationError::InvalidShape(index))?;
        }
    }
    count
        .checked_mul(elem)
        .ok_or(AllocationError::InvalidShape(index))
}

/// Plan activation placement for `model` inside `capacity` bytes.
pub fn plan(model: &ModelArtifact<'_>, capacity: usize) -> Result<ArenaPlan, AllocationError> {
    let count = model.tensor_count();
    if count > MAX_TENSORS {
        return Err(AllocationError::TooManyTensors(count));
    }

    // ── Lifetimes ───────────────────────────────────────────────
    let mut spans: Vec<Option<(usize, usize)>, MAX_TENSORS> = Vec::new();
    spans
        .resize(count, None)
        .map_err(|_| AllocationError::TooManyTensors(count))?;

    let last_op = model.operator_count().saturating_sub(1);
    for (i, op) in model.operators().enumerate() {
        for list in [op.inputs(), op.outputs()].into_iter().flatten() {
            for idx in list.iter().filter_map(|v| usize::try_from(v).ok()) {
                touch(&mut spans, idx, i);
            }
        }
    }
    // Graph I/O stays valid across the whole invoke so the caller can fill
    // the input before and read the output after.
    for io in [model.input_index(), model.output_index()] {
        touch(&mut spans, io, 0);
        touch(&mut spans, io, last_op);
    }

    // ── Sizes, constants skipped ────────────────────────────────
    let mut pending: Vec<(usize, usize, usize, usize), MAX_TENSORS> = Vec::new();
    for (index, span) in spans.iter().enumerate() {
        let Some((first, last)) = *span else { continue };
        let tensor = model
            .tensor(index)
            .ok_or(AllocationError::InvalidShape(index))?;
        if model.constant_data(&tensor).is_some() {
            continue;
        }
        let len = tensor_bytes(model, index)?;
        if len > capacity {
            return Err(AllocationError::ArenaExhausted {
                required: len,
                available: capacity,
            });
        }
        pending
            .push((index, len, first, last))
            .map_err(|_| AllocationError::TooManyTensors(count))?;
    }
    pending.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    // ── Greedy placement ────────────────────────────────────────
    let mut result = ArenaPlan::default();
    result
        .placements
        .resize(count, None)
        .map_err(|_| AllocationError::TooManyTensors(count))?;

    let mut placed: Vec<Placement, MAX_TENSORS> = Vec::new();
    for &(index, len, first, last) in &pending {
        let mut candidate = Placement {
            offset: 0,
            len,
            first,
            last,
        };
        loop {
            let clash = placed.iter().find(|p| {
                p.lifetime_overlaps(&candidate)
                    && candidate.offset < p.offset + p.len
                    && p.offset < candidate.offset + candidate.len.max(1)
            });
            match clash {
                Some(p) => candidate.offset = align_up(p.offset + p.len),
                None => break,
            }
        }
        result.used = result.used.max(candidate.offset + len);
        result.placements[index] = Some(candidate);
        placed
            .push(candidate)
            .map_err(|_| AllocationError::TooManyTensors(count))?;
    }

    if result.used > capacity {
        return Err(AllocationError::ArenaExhausted {
            required: result.used,
            available: capacity,
        });
    }
    Ok(result)
}

/// Borrow two disjoint arena ranges, one shared and one exclusive.
pub fn split_disjoint(
    bytes: &mut [u8],
    src: Range<usize>,
    dst: Range<usize>,
) -> Option<(&[u8], &mut [u8])> {
    if src.end > bytes.len() || dst.end > bytes.len() {
        return None;
    }
    if src.start < dst.end && dst.start < src.end {
        return None;
    }
    if src.end <= dst.start {
        let (head, tail) = bytes.split_at_mut(dst.start);
        Some((&head[src], &mut tail[..dst.end - dst.start]))
    } else {
        let (head, tail) = bytes.split_at_mut(src.start);
        Some((&tail[..src.end - src.start], &mut head[dst]))
    }
}
