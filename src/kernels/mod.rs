//! Compute kernels for each operand-type pair and capability tier
//!
//! Kernels receive a type-erased [`GemmArgs`] record and are invoked through
//! plain `unsafe fn` pointers held by the dispatch table. Each architecture
//! contributes its own tiers from an arch-gated submodule, all wrapping the
//! shared compute bodies in [`generic`] under the instruction-set features
//! the tier requires.
//!
//! # Output convention
//!
//! Both operands are stored row-major over the reduction dimension:
//!
//! ```text
//! C[j*ldc + i] = sum_l A[i*lda + l] * B[j*ldb + l]    i < m, j < n
//! ```
//!
//! Strides (`lda`, `ldb`) count *addressable units*: elements for scalar
//! operand types, blocks for quantized ones. `ldc` counts f32 elements.
//!
//! # Thread partitioning
//!
//! Worker `ith` of `nth` computes exactly the output rows `i` with
//! `i % nth == ith`. Workers touch disjoint output cells, so any number of
//! them may run concurrently over the same argument record.

pub(crate) mod generic;

#[cfg(target_arch = "aarch64")]
pub(crate) mod aarch64;
#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_64;

/// Phase discriminator for multi-phase compute
///
/// Forwarded opaquely by the selector. Kernels in this crate complete
/// [`Task::Init`] as a no-op success; the packing work that phase represents
/// in the calling harness happens outside these kernels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Task {
    /// Preparation phase (packing, quantization) owned by the caller
    Init,
    /// Accumulation phase: compute this worker's share of the output
    Compute,
}

/// Type-erased argument record forwarded unchanged to the selected kernel
///
/// The dispatcher never dereferences the pointers; only the kernel selected
/// for a concrete `(Atype, Btype)` pair casts them back to their element or
/// block types.
#[derive(Copy, Clone, Debug)]
pub struct GemmArgs {
    /// Rows of A / rows of the output
    pub m: usize,
    /// Rows of B / columns of the output
    pub n: usize,
    /// Shared reduction dimension, counted in logical elements
    pub k: usize,
    /// Operand A, `m` rows of `k` elements
    pub a: *const u8,
    /// Lead stride of A in addressable units
    pub lda: usize,
    /// Operand B, `n` rows of `k` elements
    pub b: *const u8,
    /// Lead stride of B in addressable units
    pub ldb: usize,
    /// Output, written as `C[j*ldc + i]`
    pub c: *mut f32,
    /// Lead stride of C in f32 elements
    pub ldc: usize,
    /// This worker's index
    pub ith: usize,
    /// Total worker count
    pub nth: usize,
    /// Compute phase
    pub task: Task,
}

/// A concrete compute routine tied to one operand-type pair and tier
///
/// # Safety
///
/// Callers must guarantee the pointers in the argument record address
/// buffers laid out per the `(Atype, Btype)` pair the kernel was registered
/// for, large enough for the given dimensions and strides.
pub type Kernel = unsafe fn(&GemmArgs) -> bool;
