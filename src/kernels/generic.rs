//! Shared compute bodies for all kernel tiers
//!
//! Each architecture module compiles these bodies under its own
//! `#[target_feature]` set, so one implementation serves every tier while
//! still vectorizing for the instruction set the tier was selected for.

use super::{GemmArgs, Task};
use crate::dtype::{BlockQ4_0, BlockQ4_1, BlockQ8_0, BlockQ8_1, QK};

/// Row-partitioned GEMM driver
///
/// Computes `C[j*ldc + i] = dot(A row i, B row j)` for every output row `i`
/// owned by worker `ith` of `nth` (`i % nth == ith`).
#[inline(always)]
unsafe fn gemm<TA, TB>(args: &GemmArgs, dot: impl Fn(*const TA, *const TB) -> f32) -> bool {
    if args.task == Task::Init {
        return true;
    }

    let a = args.a.cast::<TA>();
    let b = args.b.cast::<TB>();
    let nth = args.nth.max(1);

    let mut i = args.ith;
    while i < args.m {
        for j in 0..args.n {
            let sum = dot(a.add(i * args.lda), b.add(j * args.ldb));
            *args.c.add(j * args.ldc + i) = sum;
        }
        i += nth;
    }
    true
}

#[inline(always)]
unsafe fn dot_f32(a: *const f32, b: *const f32, k: usize) -> f32 {
    let mut sum = 0.0f32;
    for l in 0..k {
        sum += *a.add(l) * *b.add(l);
    }
    sum
}

#[inline(always)]
unsafe fn dot_f16_f32(a: *const half::f16, b: *const f32, k: usize) -> f32 {
    let mut sum = 0.0f32;
    for l in 0..k {
        sum += (*a.add(l)).to_f32() * *b.add(l);
    }
    sum
}

#[inline(always)]
unsafe fn dot_q8_0_q8_0(a: *const BlockQ8_0, b: *const BlockQ8_0, kb: usize) -> f32 {
    let mut sum = 0.0f32;
    for bi in 0..kb {
        let ab = &*a.add(bi);
        let bb = &*b.add(bi);
        let mut isum = 0i32;
        for l in 0..QK {
            isum += ab.qs[l] as i32 * bb.qs[l] as i32;
        }
        sum += ab.d.to_f32() * bb.d.to_f32() * isum as f32;
    }
    sum
}

#[inline(always)]
unsafe fn dot_q4_0_q8_0(a: *const BlockQ4_0, b: *const BlockQ8_0, kb: usize) -> f32 {
    let mut sum = 0.0f32;
    for bi in 0..kb {
        let ab = &*a.add(bi);
        let bb = &*b.add(bi);
        let mut isum = 0i32;
        for l in 0..QK / 2 {
            let lo = (ab.qs[l] & 0x0F) as i32 - 8;
            let hi = (ab.qs[l] >> 4) as i32 - 8;
            isum += lo * bb.qs[l] as i32 + hi * bb.qs[l + QK / 2] as i32;
        }
        sum += ab.d.to_f32() * bb.d.to_f32() * isum as f32;
    }
    sum
}

#[inline(always)]
unsafe fn dot_q4_1_q8_1(a: *const BlockQ4_1, b: *const BlockQ8_1, kb: usize) -> f32 {
    let mut sum = 0.0f32;
    for bi in 0..kb {
        let ab = &*a.add(bi);
        let bb = &*b.add(bi);
        let mut isum = 0i32;
        for l in 0..QK / 2 {
            let lo = (ab.qs[l] & 0x0F) as i32;
            let hi = (ab.qs[l] >> 4) as i32;
            isum += lo * bb.qs[l] as i32 + hi * bb.qs[l + QK / 2] as i32;
        }
        // value = q*d + m, so the minimum folds into the precomputed block sum
        sum += ab.d.to_f32() * bb.d.to_f32() * isum as f32 + ab.m.to_f32() * bb.s.to_f32();
    }
    sum
}

/// f32 x f32 -> f32
#[inline(always)]
pub(crate) unsafe fn gemm_f32(args: &GemmArgs) -> bool {
    let k = args.k;
    gemm::<f32, f32>(args, |ra, rb| unsafe { dot_f32(ra, rb, k) })
}

/// f16 x f32 -> f32
#[inline(always)]
pub(crate) unsafe fn gemm_f16(args: &GemmArgs) -> bool {
    let k = args.k;
    gemm::<half::f16, f32>(args, |ra, rb| unsafe { dot_f16_f32(ra, rb, k) })
}

/// q8_0 x q8_0 -> f32
#[inline(always)]
pub(crate) unsafe fn gemm_q8_0_q8_0(args: &GemmArgs) -> bool {
    let kb = args.k / QK;
    gemm::<BlockQ8_0, BlockQ8_0>(args, |ra, rb| unsafe { dot_q8_0_q8_0(ra, rb, kb) })
}

/// q4_0 x q8_0 -> f32
#[inline(always)]
pub(crate) unsafe fn gemm_q4_0_q8_0(args: &GemmArgs) -> bool {
    let kb = args.k / QK;
    gemm::<BlockQ4_0, BlockQ8_0>(args, |ra, rb| unsafe { dot_q4_0_q8_0(ra, rb, kb) })
}

/// q4_1 x q8_1 -> f32
#[inline(always)]
pub(crate) unsafe fn gemm_q4_1_q8_1(args: &GemmArgs) -> bool {
    let kb = args.k / QK;
    gemm::<BlockQ4_1, BlockQ8_1>(args, |ra, rb| unsafe { dot_q4_1_q8_1(ra, rb, kb) })
}
