//! x86-64 kernel tiers
//!
//! One wrapper per capability tier, compiling the shared body under the
//! tier's `#[target_feature]` set so the compiler vectorizes it for that
//! instruction set. The divisibility constraint each tier imposes on the
//! reduction dimension lives in the dispatch table, not here.

use super::{generic, GemmArgs};

// f32 x f32

/// AVX-512F tier
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn gemm_f32_avx512f(args: &GemmArgs) -> bool {
    generic::gemm_f32(args)
}

/// AVX + FMA tier
#[target_feature(enable = "avx,fma")]
pub(crate) unsafe fn gemm_f32_fma(args: &GemmArgs) -> bool {
    generic::gemm_f32(args)
}

/// Baseline AVX tier
#[target_feature(enable = "avx")]
pub(crate) unsafe fn gemm_f32_avx(args: &GemmArgs) -> bool {
    generic::gemm_f32(args)
}

// f16 x f32

/// AVX-512F tier
#[target_feature(enable = "avx512f")]
pub(crate) unsafe fn gemm_f16_avx512f(args: &GemmArgs) -> bool {
    generic::gemm_f16(args)
}

/// F16C + FMA tier (hardware half conversion)
#[target_feature(enable = "avx,fma,f16c")]
pub(crate) unsafe fn gemm_f16_f16c(args: &GemmArgs) -> bool {
    generic::gemm_f16(args)
}

// q8_0 x q8_0

/// AVX-512VL + AVX-512VNNI tier (native int8 dot product)
#[target_feature(enable = "avx512f,avx512vl,avx512vnni")]
pub(crate) unsafe fn gemm_q8_0_avx512vnni(args: &GemmArgs) -> bool {
    generic::gemm_q8_0_q8_0(args)
}

/// AVX-VNNI tier (256-bit int8 dot product)
#[target_feature(enable = "avx2,fma,avxvnni")]
pub(crate) unsafe fn gemm_q8_0_avxvnni(args: &GemmArgs) -> bool {
    generic::gemm_q8_0_q8_0(args)
}

/// AVX2 + FMA tier
#[target_feature(enable = "avx2,fma")]
pub(crate) unsafe fn gemm_q8_0_avx2(args: &GemmArgs) -> bool {
    generic::gemm_q8_0_q8_0(args)
}

// q4_0 x q8_0

/// AVX-512VL + AVX-512VNNI tier
#[target_feature(enable = "avx512f,avx512vl,avx512vnni")]
pub(crate) unsafe fn gemm_q4_0_avx512vnni(args: &GemmArgs) -> bool {
    generic::gemm_q4_0_q8_0(args)
}

/// AVX-VNNI tier
#[target_feature(enable = "avx2,fma,avxvnni")]
pub(crate) unsafe fn gemm_q4_0_avxvnni(args: &GemmArgs) -> bool {
    generic::gemm_q4_0_q8_0(args)
}

/// AVX2 + FMA tier
#[target_feature(enable = "avx2,fma")]
pub(crate) unsafe fn gemm_q4_0_avx2(args: &GemmArgs) -> bool {
    generic::gemm_q4_0_q8_0(args)
}

// q4_1 x q8_1

/// AVX-512VL + AVX-512VNNI tier
#[target_feature(enable = "avx512f,avx512vl,avx512vnni")]
pub(crate) unsafe fn gemm_q4_1_avx512vnni(args: &GemmArgs) -> bool {
    generic::gemm_q4_1_q8_1(args)
}

/// AVX-VNNI tier
#[target_feature(enable = "avx2,fma,avxvnni")]
pub(crate) unsafe fn gemm_q4_1_avxvnni(args: &GemmArgs) -> bool {
    generic::gemm_q4_1_q8_1(args)
}

/// AVX2 + FMA tier
#[target_feature(enable = "avx2,fma")]
pub(crate) unsafe fn gemm_q4_1_avx2(args: &GemmArgs) -> bool {
    generic::gemm_q4_1_q8_1(args)
}
