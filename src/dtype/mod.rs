//! Element types for GEMM operands
//!
//! This module provides the `DType` enum representing all supported operand
//! element types, along with the fixed-layout quantized block structures.
//!
//! Scalar types (`F32`, `F16`) are addressed one element at a time. Quantized
//! types are addressed one *block* at a time: a block bundles a shared scale
//! with 32 packed sub-byte/byte values, so the reduction dimension of any
//! kernel consuming them must be a multiple of [`QK`](blocks::QK).

mod blocks;

pub use blocks::{BlockQ4_0, BlockQ4_1, BlockQ8_0, BlockQ8_1, QK};

use std::fmt;

/// Element types supported by qgemm operands
///
/// This enum is closed: the dispatcher's type-compatibility matrix is defined
/// over exactly these types, and pairs outside the matrix have no kernels.
///
/// # Discriminant Values (Serialization Stability)
///
/// The discriminant values are **stable**: floats 0-9 (F32=0, F16=1),
/// quantized blocks 10-19. New types will use reserved ranges; existing
/// values are never changed.
#[allow(non_camel_case_types)] // GGML-lineage type names (Q4_0, Q8_1, ...)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DType {
    /// 32-bit floating point (the only accepted output type)
    F32 = 0,
    /// 16-bit floating point (IEEE 754)
    F16 = 1,

    /// 4-bit symmetric quantization, 32 elements per block
    Q4_0 = 10,
    /// 4-bit affine quantization (scale + minimum), 32 elements per block
    Q4_1 = 11,
    /// 8-bit symmetric quantization, 32 elements per block
    Q8_0 = 12,
    /// 8-bit quantization with precomputed block sum, 32 elements per block
    Q8_1 = 13,
}

impl DType {
    /// Number of elements covered by one addressable unit of this type
    ///
    /// 1 for scalar types; [`QK`](blocks::QK) for quantized block types. A
    /// kernel consuming a quantized operand requires the reduction dimension
    /// to be divisible by this constant.
    #[inline]
    pub const fn block_size(self) -> usize {
        match self {
            Self::F32 | Self::F16 => 1,
            Self::Q4_0 | Self::Q4_1 | Self::Q8_0 | Self::Q8_1 => QK,
        }
    }

    /// Size in bytes of one addressable unit (element or block)
    #[inline]
    pub const fn type_size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F16 => 2,
            Self::Q4_0 => std::mem::size_of::<BlockQ4_0>(),
            Self::Q4_1 => std::mem::size_of::<BlockQ4_1>(),
            Self::Q8_0 => std::mem::size_of::<BlockQ8_0>(),
            Self::Q8_1 => std::mem::size_of::<BlockQ8_1>(),
        }
    }

    /// Returns true if this is a quantized block type
    #[inline]
    pub const fn is_quantized(self) -> bool {
        self.block_size() != 1
    }

    /// Number of addressable units (elements or blocks) in a row of `k`
    /// logical elements
    ///
    /// For quantized types a partial trailing block still occupies a full
    /// block, hence the rounding up.
    #[inline]
    pub const fn row_units(self, k: usize) -> usize {
        k.div_ceil(self.block_size())
    }

    /// Returns the name of this type as a string
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F16 => "f16",
            Self::Q4_0 => "q4_0",
            Self::Q4_1 => "q4_1",
            Self::Q8_0 => "q8_0",
            Self::Q8_1 => "q8_1",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
