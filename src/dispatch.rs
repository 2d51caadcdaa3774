//! Kernel selection: type-compatibility matrix and dispatcher
//!
//! The dispatcher is a pure function of its inputs plus the immutable
//! capability snapshot. Selection walks a static, priority-ordered variant
//! table for the requested operand-type pair and picks the first variant
//! whose required capability subset is present and whose divisibility
//! requirement on the reduction dimension holds. Exactly one kernel is then
//! invoked, or none.
//!
//! # Priority ordering
//!
//! Each table is ordered from most to least preferred by expected
//! throughput: wider vectors and native low-precision dot-product
//! instructions first, the architecturally oldest tier last. The ordering is
//! an invariant carried over from the system this crate descends from, not
//! re-derived here.
//!
//! ```text
//! Priority  Tier                 Requirement                  k multiple
//! --------  -------------------  ---------------------------  ----------
//! 1         AVX-512 (VNNI)       avx512f [+avx512vl+vnni]     16 / 32
//! 2         AVX-VNNI             avx2+fma+avxvnni             32
//! 3         AVX2 / FMA           avx[2]+fma                   8 / 32
//! 4         AVX baseline         avx                          8
//! ```
//!
//! On AArch64 the DOTPROD tiers sort before plain NEON. Adding a tier or an
//! operand-type pair is a table edit, not a new branch.

use std::fmt;

use crate::dtype::DType;
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
use crate::dtype::QK;
use crate::kernels::{GemmArgs, Kernel, Task};
use crate::simd::{detect_features, CpuFeatures};

#[cfg(target_arch = "aarch64")]
use crate::kernels::aarch64;
#[cfg(target_arch = "x86_64")]
use crate::kernels::x86_64;

/// One selectable kernel variant
///
/// Statically defined at build time and never mutated: a required capability
/// subset, a divisibility requirement on the reduction dimension, and the
/// compute routine itself.
#[derive(Copy, Clone)]
pub struct KernelVariant {
    /// Kernel identifier, stable for logging and tests
    pub name: &'static str,
    /// Capability subset that must be present in the snapshot
    pub required: CpuFeatures,
    /// The reduction dimension must be a multiple of this (1 = no constraint)
    pub k_multiple: usize,
    /// The compute routine invoked on selection
    pub kernel: Kernel,
}

impl KernelVariant {
    /// Create a kernel variant
    ///
    /// `k_multiple` must be non-zero; use 1 for unconstrained kernels.
    pub const fn new(
        name: &'static str,
        required: CpuFeatures,
        k_multiple: usize,
        kernel: Kernel,
    ) -> Self {
        assert!(k_multiple > 0, "k_multiple must be non-zero");
        Self {
            name,
            required,
            k_multiple,
            kernel,
        }
    }

    /// Returns true if this variant is eligible under `features` for a
    /// reduction dimension of `k`
    #[inline]
    pub fn eligible(&self, features: CpuFeatures, k: usize) -> bool {
        features.contains(self.required) && k % self.k_multiple == 0
    }
}

impl fmt::Debug for KernelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelVariant")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("k_multiple", &self.k_multiple)
            .finish()
    }
}

// ============================================================================
// Type-compatibility matrix
// ============================================================================

#[cfg(target_arch = "x86_64")]
static F32_F32: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_f32_avx512f",
        CpuFeatures::AVX.with(CpuFeatures::AVX512F),
        16,
        x86_64::gemm_f32_avx512f,
    ),
    KernelVariant::new(
        "gemm_f32_fma",
        CpuFeatures::AVX.with(CpuFeatures::FMA),
        8,
        x86_64::gemm_f32_fma,
    ),
    KernelVariant::new("gemm_f32_avx", CpuFeatures::AVX, 8, x86_64::gemm_f32_avx),
];

#[cfg(target_arch = "x86_64")]
static F16_F32: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_f16_avx512f",
        CpuFeatures::AVX.with(CpuFeatures::AVX512F),
        16,
        x86_64::gemm_f16_avx512f,
    ),
    KernelVariant::new(
        "gemm_f16_f16c",
        CpuFeatures::AVX.with(CpuFeatures::FMA).with(CpuFeatures::F16C),
        8,
        x86_64::gemm_f16_f16c,
    ),
];

#[cfg(target_arch = "x86_64")]
static Q8_0_Q8_0: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_q8_0_avx512vnni",
        CpuFeatures::AVX
            .with(CpuFeatures::AVX512F)
            .with(CpuFeatures::AVX512VL)
            .with(CpuFeatures::AVX512VNNI),
        QK,
        x86_64::gemm_q8_0_avx512vnni,
    ),
    KernelVariant::new(
        "gemm_q8_0_avxvnni",
        CpuFeatures::AVX
            .with(CpuFeatures::AVX2)
            .with(CpuFeatures::FMA)
            .with(CpuFeatures::AVXVNNI),
        QK,
        x86_64::gemm_q8_0_avxvnni,
    ),
    KernelVariant::new(
        "gemm_q8_0_avx2",
        CpuFeatures::AVX.with(CpuFeatures::AVX2).with(CpuFeatures::FMA),
        QK,
        x86_64::gemm_q8_0_avx2,
    ),
];

#[cfg(target_arch = "x86_64")]
static Q4_0_Q8_0: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_q4_0_avx512vnni",
        CpuFeatures::AVX
            .with(CpuFeatures::AVX512F)
            .with(CpuFeatures::AVX512VL)
            .with(CpuFeatures::AVX512VNNI),
        QK,
        x86_64::gemm_q4_0_avx512vnni,
    ),
    KernelVariant::new(
        "gemm_q4_0_avxvnni",
        CpuFeatures::AVX
            .with(CpuFeatures::AVX2)
            .with(CpuFeatures::FMA)
            .with(CpuFeatures::AVXVNNI),
        QK,
        x86_64::gemm_q4_0_avxvnni,
    ),
    KernelVariant::new(
        "gemm_q4_0_avx2",
        CpuFeatures::AVX.with(CpuFeatures::AVX2).with(CpuFeatures::FMA),
        QK,
        x86_64::gemm_q4_0_avx2,
    ),
];

#[cfg(target_arch = "x86_64")]
static Q4_1_Q8_1: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_q4_1_avx512vnni",
        CpuFeatures::AVX
            .with(CpuFeatures::AVX512F)
            .with(CpuFeatures::AVX512VL)
            .with(CpuFeatures::AVX512VNNI),
        QK,
        x86_64::gemm_q4_1_avx512vnni,
    ),
    KernelVariant::new(
        "gemm_q4_1_avxvnni",
        CpuFeatures::AVX
            .with(CpuFeatures::AVX2)
            .with(CpuFeatures::FMA)
            .with(CpuFeatures::AVXVNNI),
        QK,
        x86_64::gemm_q4_1_avxvnni,
    ),
    KernelVariant::new(
        "gemm_q4_1_avx2",
        CpuFeatures::AVX.with(CpuFeatures::AVX2).with(CpuFeatures::FMA),
        QK,
        x86_64::gemm_q4_1_avx2,
    ),
];

#[cfg(target_arch = "aarch64")]
static F32_F32: &[KernelVariant] = &[KernelVariant::new(
    "gemm_f32_neon",
    CpuFeatures::NEON,
    4,
    aarch64::gemm_f32_neon,
)];

#[cfg(target_arch = "aarch64")]
static F16_F32: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_f16_neon_fp16",
        CpuFeatures::NEON.with(CpuFeatures::NEON_FP16),
        8,
        aarch64::gemm_f16_neon_fp16,
    ),
    KernelVariant::new("gemm_f16_neon", CpuFeatures::NEON, 4, aarch64::gemm_f16_neon),
];

#[cfg(target_arch = "aarch64")]
static Q8_0_Q8_0: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_q8_0_neon_dotprod",
        CpuFeatures::NEON.with(CpuFeatures::NEON_DOTPROD),
        QK,
        aarch64::gemm_q8_0_neon_dotprod,
    ),
    KernelVariant::new("gemm_q8_0_neon", CpuFeatures::NEON, QK, aarch64::gemm_q8_0_neon),
];

#[cfg(target_arch = "aarch64")]
static Q4_0_Q8_0: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_q4_0_neon_dotprod",
        CpuFeatures::NEON.with(CpuFeatures::NEON_DOTPROD),
        QK,
        aarch64::gemm_q4_0_neon_dotprod,
    ),
    KernelVariant::new("gemm_q4_0_neon", CpuFeatures::NEON, QK, aarch64::gemm_q4_0_neon),
];

#[cfg(target_arch = "aarch64")]
static Q4_1_Q8_1: &[KernelVariant] = &[
    KernelVariant::new(
        "gemm_q4_1_neon_dotprod",
        CpuFeatures::NEON.with(CpuFeatures::NEON_DOTPROD),
        QK,
        aarch64::gemm_q4_1_neon_dotprod,
    ),
    KernelVariant::new("gemm_q4_1_neon", CpuFeatures::NEON, QK, aarch64::gemm_q4_1_neon),
];

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
static F32_F32: &[KernelVariant] = &[];
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
static F16_F32: &[KernelVariant] = &[];
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
static Q8_0_Q8_0: &[KernelVariant] = &[];
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
static Q4_0_Q8_0: &[KernelVariant] = &[];
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
static Q4_1_Q8_1: &[KernelVariant] = &[];

/// Ordered kernel variants for an operand-type pair
///
/// Pairs absent from the matrix have an empty list; the quantized pairs are
/// fixed (a 4-bit type only pairs with its matching 8-bit activation type).
pub fn variants_for(atype: DType, btype: DType) -> &'static [KernelVariant] {
    match (atype, btype) {
        (DType::F32, DType::F32) => F32_F32,
        (DType::F16, DType::F32) => F16_F32,
        (DType::Q8_0, DType::Q8_0) => Q8_0_Q8_0,
        (DType::Q4_0, DType::Q8_0) => Q4_0_Q8_0,
        (DType::Q4_1, DType::Q8_1) => Q4_1_Q8_1,
        _ => &[],
    }
}

// ============================================================================
// Selector
// ============================================================================

/// First eligible variant in a priority-ordered list
///
/// Pure scan over `variants`: the first entry whose required capability
/// subset is contained in `features` and whose `k_multiple` divides `k`
/// wins. `k == 0` satisfies every divisibility requirement.
#[inline]
pub fn scan<'a>(
    variants: &'a [KernelVariant],
    features: CpuFeatures,
    k: usize,
) -> Option<&'a KernelVariant> {
    variants.iter().find(|v| v.eligible(features, k))
}

/// Select the kernel variant for a full type triple under `features`
///
/// Returns `None` without consulting the capability snapshot when the output
/// type is not `f32` or the `(atype, btype)` pair has no variants. Pure:
/// calling it never invokes a kernel and never touches memory.
pub fn select(
    features: CpuFeatures,
    atype: DType,
    btype: DType,
    ctype: DType,
    k: usize,
) -> Option<&'static KernelVariant> {
    if ctype != DType::F32 {
        return None;
    }
    scan(variants_for(atype, btype), features, k)
}

/// Name of the kernel that [`dispatch`] would run for this call shape
///
/// `None` means dispatch would decline. Useful for logging and for verifying
/// tier selection on a given machine without running a multiplication.
pub fn selected_kernel_name(atype: DType, btype: DType, ctype: DType, k: usize) -> Option<&'static str> {
    select(detect_features(), atype, btype, ctype, k).map(|v| v.name)
}

/// Select and invoke the fastest eligible kernel for one GEMM call
///
/// Returns `true` iff a kernel variant was found and executed; this worker's
/// partition of the output is then populated. Returns `false` iff no
/// eligible variant exists — the output is untouched and the caller must
/// apply its own capability-independent fallback. Unsupported combinations
/// are a normal `false`, never a panic.
///
/// Dimensions are logical element counts; `lda`/`ldb` count elements for
/// scalar operand types and blocks for quantized ones (see
/// [`GemmArgs`]). Worker `ith` of `nth` computes the output rows `i` with
/// `i % nth == ith`.
///
/// # Safety
///
/// `a`, `b`, and `c` must address buffers laid out per `atype`/`btype`/f32
/// respectively, valid for the given dimensions and strides. `c` must not
/// alias `a` or `b`, and concurrent callers must hold distinct `ith` values
/// under the same `nth`.
#[allow(clippy::too_many_arguments)]
pub unsafe fn dispatch(
    m: usize,
    n: usize,
    k: usize,
    a: *const u8,
    lda: usize,
    b: *const u8,
    ldb: usize,
    c: *mut f32,
    ldc: usize,
    ith: usize,
    nth: usize,
    task: Task,
    atype: DType,
    btype: DType,
    ctype: DType,
) -> bool {
    let Some(variant) = select(detect_features(), atype, btype, ctype, k) else {
        return false;
    };

    let args = GemmArgs {
        m,
        n,
        k,
        a,
        lda,
        b,
        ldb,
        c,
        ldc,
        ith,
        nth,
        task,
    };
    (variant.kernel)(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn all_features() -> CpuFeatures {
        CpuFeatures::all()
    }

    #[test]
    fn test_output_type_gate() {
        // Any Ctype other than f32 fails before the table is consulted
        for ctype in [DType::F16, DType::Q8_0, DType::Q4_1] {
            assert!(select(all_features(), DType::F32, DType::F32, ctype, 256).is_none());
        }
    }

    #[test]
    fn test_unknown_pairs_have_no_variants() {
        assert!(variants_for(DType::F32, DType::F16).is_empty());
        assert!(variants_for(DType::F16, DType::F16).is_empty());
        assert!(variants_for(DType::Q8_0, DType::F32).is_empty());
        // Mismatched quantized pairing: q4_0 requires q8_0 activations
        assert!(variants_for(DType::Q4_0, DType::Q4_0).is_empty());
        assert!(variants_for(DType::Q4_1, DType::Q8_0).is_empty());
    }

    #[test]
    fn test_mismatched_quantized_pair_declines_without_capability_check() {
        // Even an all-capable snapshot cannot rescue a pair outside the matrix
        assert!(select(all_features(), DType::Q4_0, DType::Q4_0, DType::F32, 256).is_none());
        // And the empty snapshot declines identically
        assert!(select(CpuFeatures::NONE, DType::Q4_0, DType::Q4_0, DType::F32, 256).is_none());
    }

    #[test]
    fn test_full_snapshot_selects_first_variant() {
        for (atype, btype) in [
            (DType::F32, DType::F32),
            (DType::F16, DType::F32),
            (DType::Q8_0, DType::Q8_0),
            (DType::Q4_0, DType::Q8_0),
            (DType::Q4_1, DType::Q8_1),
        ] {
            let table = variants_for(atype, btype);
            if table.is_empty() {
                continue; // arch without kernels for this pair
            }
            // k = lcm of all table constraints: 32*16 covers every tier
            let chosen = select(all_features(), atype, btype, DType::F32, 512)
                .expect("full snapshot must select");
            assert_eq!(chosen.name, table[0].name, "{atype}x{btype}");
        }
    }

    #[test]
    fn test_empty_snapshot_selects_nothing() {
        for (atype, btype) in [
            (DType::F32, DType::F32),
            (DType::F16, DType::F32),
            (DType::Q8_0, DType::Q8_0),
        ] {
            assert!(select(CpuFeatures::NONE, atype, btype, DType::F32, 512).is_none());
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_portable_tier_only_under_minimal_snapshot() {
        // AVX alone reaches only the baseline f32 tier
        let chosen = select(CpuFeatures::AVX, DType::F32, DType::F32, DType::F32, 64)
            .expect("baseline tier must be eligible");
        assert_eq!(chosen.name, "gemm_f32_avx");

        // ...and if its divisibility fails too, selection declines entirely
        assert!(select(CpuFeatures::AVX, DType::F32, DType::F32, DType::F32, 7).is_none());
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_divisibility_steers_tier_choice() {
        let features = CpuFeatures::AVX | CpuFeatures::FMA | CpuFeatures::AVX512F;
        // k % 16 != 0 skips the AVX-512 tier but k % 8 == 0 reaches FMA
        let chosen = select(features, DType::F32, DType::F32, DType::F32, 24).unwrap();
        assert_eq!(chosen.name, "gemm_f32_fma");
        // fully divisible k restores the preferred tier
        let chosen = select(features, DType::F32, DType::F32, DType::F32, 32).unwrap();
        assert_eq!(chosen.name, "gemm_f32_avx512f");
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_vnni_tiers_sort_before_avx2() {
        let avx2 = CpuFeatures::AVX | CpuFeatures::AVX2 | CpuFeatures::FMA;
        let chosen = select(avx2, DType::Q8_0, DType::Q8_0, DType::F32, 64).unwrap();
        assert_eq!(chosen.name, "gemm_q8_0_avx2");

        let avxvnni = avx2 | CpuFeatures::AVXVNNI;
        let chosen = select(avxvnni, DType::Q8_0, DType::Q8_0, DType::F32, 64).unwrap();
        assert_eq!(chosen.name, "gemm_q8_0_avxvnni");

        let avx512vnni =
            avx2 | CpuFeatures::AVX512F | CpuFeatures::AVX512VL | CpuFeatures::AVX512VNNI;
        let chosen = select(avx512vnni, DType::Q8_0, DType::Q8_0, DType::F32, 64).unwrap();
        assert_eq!(chosen.name, "gemm_q8_0_avx512vnni");
    }

    #[cfg(target_arch = "aarch64")]
    #[test]
    fn test_fp16_tier_sorts_before_plain_neon() {
        let neon = CpuFeatures::NEON;
        let chosen = select(neon, DType::F16, DType::F32, DType::F32, 32).unwrap();
        assert_eq!(chosen.name, "gemm_f16_neon");

        let fp16 = neon | CpuFeatures::NEON_FP16;
        let chosen = select(fp16, DType::F16, DType::F32, DType::F32, 32).unwrap();
        assert_eq!(chosen.name, "gemm_f16_neon_fp16");

        // k % 8 != 0 skips the fp16 tier but k % 4 == 0 reaches plain NEON
        let chosen = select(fp16, DType::F16, DType::F32, DType::F32, 12).unwrap();
        assert_eq!(chosen.name, "gemm_f16_neon");
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn test_quantized_divisibility_constraint() {
        let features = all_features();
        // k not a multiple of the 32-element block declines every tier
        for k in [1, 31, 33, 48] {
            assert!(select(features, DType::Q8_0, DType::Q8_0, DType::F32, k).is_none());
            assert!(select(features, DType::Q4_0, DType::Q8_0, DType::F32, k).is_none());
        }
        assert!(select(features, DType::Q8_0, DType::Q8_0, DType::F32, 32).is_some());
    }

    #[test]
    fn test_k_zero_satisfies_every_constraint() {
        for (atype, btype) in [
            (DType::F32, DType::F32),
            (DType::Q8_0, DType::Q8_0),
            (DType::Q4_1, DType::Q8_1),
        ] {
            let table = variants_for(atype, btype);
            if table.is_empty() {
                continue;
            }
            let chosen = select(all_features(), atype, btype, DType::F32, 0)
                .expect("k = 0 must select the preferred tier");
            assert_eq!(chosen.name, table[0].name);
        }
    }

    #[test]
    fn test_selection_is_idempotent() {
        let features = detect_features();
        let first = select(features, DType::F32, DType::F32, DType::F32, 256).map(|v| v.name);
        for _ in 0..10 {
            let again = select(features, DType::F32, DType::F32, DType::F32, 256).map(|v| v.name);
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_scan_invokes_recorded_mock_in_priority_order() {
        static HITS: AtomicUsize = AtomicUsize::new(0);

        unsafe fn hit_first(_args: &GemmArgs) -> bool {
            HITS.fetch_or(0b01, Ordering::SeqCst);
            true
        }
        unsafe fn hit_second(_args: &GemmArgs) -> bool {
            HITS.fetch_or(0b10, Ordering::SeqCst);
            true
        }

        let fast = CpuFeatures::AVX512F;
        let slow = CpuFeatures::AVX;
        let table = [
            KernelVariant::new("mock_fast", fast, 16, hit_first),
            KernelVariant::new("mock_slow", slow, 8, hit_second),
        ];

        let args = GemmArgs {
            m: 0,
            n: 0,
            k: 16,
            a: std::ptr::null(),
            lda: 0,
            b: std::ptr::null(),
            ldb: 0,
            c: std::ptr::null_mut(),
            ldc: 0,
            ith: 0,
            nth: 1,
            task: Task::Compute,
        };

        // Both eligible: the first entry must win
        let chosen = scan(&table, fast | slow, 16).unwrap();
        assert!(unsafe { (chosen.kernel)(&args) });
        assert_eq!(HITS.load(Ordering::SeqCst), 0b01);

        // Only the portable tier eligible
        HITS.store(0, Ordering::SeqCst);
        let chosen = scan(&table, slow, 16).unwrap();
        assert!(unsafe { (chosen.kernel)(&args) });
        assert_eq!(HITS.load(Ordering::SeqCst), 0b10);

        // Divisibility failure on the fast tier falls through to the slow one
        let chosen = scan(&table, fast | slow, 8).unwrap();
        assert_eq!(chosen.name, "mock_slow");

        // Nothing eligible
        assert!(scan(&table, CpuFeatures::NONE, 16).is_none());
        assert!(scan(&table, slow, 7).is_none());
    }

    #[test]
    fn test_dispatch_declines_cleanly_and_leaves_output_untouched() {
        let mut c = vec![7.0f32; 4];
        let ok = unsafe {
            dispatch(
                2,
                2,
                32,
                std::ptr::null(),
                1,
                std::ptr::null(),
                1,
                c.as_mut_ptr(),
                2,
                0,
                1,
                Task::Compute,
                DType::Q4_0,
                DType::Q4_0, // mismatched quantized pair
                DType::F32,
            )
        };
        assert!(!ok);
        assert!(c.iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_table_ordering_invariant() {
        // Within a table, a later variant never requires a superset of an
        // earlier variant's capabilities (the scan would otherwise shadow it).
        for (atype, btype) in [
            (DType::F32, DType::F32),
            (DType::F16, DType::F32),
            (DType::Q8_0, DType::Q8_0),
            (DType::Q4_0, DType::Q8_0),
            (DType::Q4_1, DType::Q8_1),
        ] {
            let table = variants_for(atype, btype);
            for (idx, later) in table.iter().enumerate().skip(1) {
                for earlier in &table[..idx] {
                    assert!(
                        !later.required.contains(earlier.required)
                            || later.k_multiple < earlier.k_multiple
                            || earlier.k_multiple % later.k_multiple != 0,
                        "{} is unreachable behind {}",
                        later.name,
                        earlier.name
                    );
                }
            }
        }
    }
}
