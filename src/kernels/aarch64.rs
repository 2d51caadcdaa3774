//! AArch64 kernel tiers
//!
//! NEON is mandatory on AArch64, so the float tiers are always eligible;
//! the quantized tiers additionally require the SDOT/UDOT dot-product
//! extension.

use super::{generic, GemmArgs};

/// NEON f32 tier
#[target_feature(enable = "neon")]
pub(crate) unsafe fn gemm_f32_neon(args: &GemmArgs) -> bool {
    generic::gemm_f32(args)
}

/// NEON + FP16 f16 tier (native half-precision arithmetic)
#[target_feature(enable = "neon,fp16")]
pub(crate) unsafe fn gemm_f16_neon_fp16(args: &GemmArgs) -> bool {
    generic::gemm_f16(args)
}

/// NEON f16 tier (software half conversion)
#[target_feature(enable = "neon")]
pub(crate) unsafe fn gemm_f16_neon(args: &GemmArgs) -> bool {
    generic::gemm_f16(args)
}

/// NEON + DOTPROD q8_0 tier
#[target_feature(enable = "neon,dotprod")]
pub(crate) unsafe fn gemm_q8_0_neon_dotprod(args: &GemmArgs) -> bool {
    generic::gemm_q8_0_q8_0(args)
}

/// NEON q8_0 tier
#[target_feature(enable = "neon")]
pub(crate) unsafe fn gemm_q8_0_neon(args: &GemmArgs) -> bool {
    generic::gemm_q8_0_q8_0(args)
}

/// NEON + DOTPROD q4_0 tier
#[target_feature(enable = "neon,dotprod")]
pub(crate) unsafe fn gemm_q4_0_neon_dotprod(args: &GemmArgs) -> bool {
    generic::gemm_q4_0_q8_0(args)
}

/// NEON q4_0 tier
#[target_feature(enable = "neon")]
pub(crate) unsafe fn gemm_q4_0_neon(args: &GemmArgs) -> bool {
    generic::gemm_q4_0_q8_0(args)
}

/// NEON + DOTPROD q4_1 tier
#[target_feature(enable = "neon,dotprod")]
pub(crate) unsafe fn gemm_q4_1_neon_dotprod(args: &GemmArgs) -> bool {
    generic::gemm_q4_1_q8_1(args)
}

/// NEON q4_1 tier
#[target_feature(enable = "neon")]
pub(crate) unsafe fn gemm_q4_1_neon(args: &GemmArgs) -> bool {
    generic::gemm_q4_1_q8_1(args)
}
