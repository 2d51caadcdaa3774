//! Runtime CPU feature detection
//!
//! This module provides the process-wide capability snapshot consumed by the
//! kernel selector. Detection runs once, is cached in a `OnceLock`, and the
//! resulting [`CpuFeatures`] value is read concurrently by any number of
//! dispatch calls without synchronization.
//!
//! # Architecture Support
//!
//! | Architecture | Flags |
//! |--------------|-------|
//! | x86-64       | AVX, AVX2, FMA, F16C, AVX-512F, AVX-512VL, AVX-512VNNI, AVX-VNNI |
//! | ARM64        | NEON, NEON+FP16, NEON+DOTPROD |
//!
//! A flag that the current architecture does not define is simply absent from
//! the snapshot; kernels requiring it are skipped during selection, never an
//! error.

use std::fmt;
use std::ops::BitOr;
use std::sync::OnceLock;

/// A set of named boolean CPU instruction-set feature flags
///
/// Implemented as a bitmask so a kernel's required capability subset can be
/// tested with a single [`contains`](Self::contains) call. Sets are built by
/// OR-ing the named constants:
///
/// ```
/// use qgemm::simd::CpuFeatures;
///
/// let snapshot = CpuFeatures::AVX | CpuFeatures::FMA;
/// assert!(snapshot.contains(CpuFeatures::AVX));
/// assert!(!snapshot.contains(CpuFeatures::AVX | CpuFeatures::AVX512F));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CpuFeatures(u32);

impl CpuFeatures {
    /// The empty set (no capabilities)
    pub const NONE: Self = Self(0);

    // x86-64 flags
    /// AVX (256-bit vectors)
    pub const AVX: Self = Self(1 << 0);
    /// AVX2 (256-bit integer vectors)
    pub const AVX2: Self = Self(1 << 1);
    /// Fused multiply-add
    pub const FMA: Self = Self(1 << 2);
    /// Hardware f16 <-> f32 conversion
    pub const F16C: Self = Self(1 << 3);
    /// AVX-512 foundation (512-bit vectors)
    pub const AVX512F: Self = Self(1 << 4);
    /// AVX-512 vector-length extension (512-bit ops on 128/256-bit vectors)
    pub const AVX512VL: Self = Self(1 << 5);
    /// AVX-512 vector neural network instructions (native int8 dot product)
    pub const AVX512VNNI: Self = Self(1 << 6);
    /// AVX-VNNI (256-bit int8 dot product without AVX-512)
    pub const AVXVNNI: Self = Self(1 << 7);

    // ARM64 flags
    /// NEON (128-bit vectors, baseline on AArch64)
    pub const NEON: Self = Self(1 << 8);
    /// NEON with native FP16 arithmetic
    pub const NEON_FP16: Self = Self(1 << 9);
    /// NEON with SDOT/UDOT int8 dot-product instructions
    pub const NEON_DOTPROD: Self = Self(1 << 10);

    const NAMES: [(Self, &'static str); 11] = [
        (Self::AVX, "avx"),
        (Self::AVX2, "avx2"),
        (Self::FMA, "fma"),
        (Self::F16C, "f16c"),
        (Self::AVX512F, "avx512f"),
        (Self::AVX512VL, "avx512vl"),
        (Self::AVX512VNNI, "avx512vnni"),
        (Self::AVXVNNI, "avxvnni"),
        (Self::NEON, "neon"),
        (Self::NEON_FP16, "neon_fp16"),
        (Self::NEON_DOTPROD, "neon_dotprod"),
    ];

    /// The set of every flag this crate defines (useful in tests)
    #[inline]
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < Self::NAMES.len() {
            bits |= Self::NAMES[i].0 .0;
            i += 1;
        }
        Self(bits)
    }

    /// Returns true if every flag in `required` is present in `self`
    #[inline]
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Returns the union of `self` and `other` (const-context `|`)
    #[inline]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns true if no flags are set
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CpuFeatures {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl fmt::Display for CpuFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Cached capability snapshot
static CPU_FEATURES: OnceLock<CpuFeatures> = OnceLock::new();

/// Detect the capability snapshot for the current CPU
///
/// The first call performs detection; subsequent calls return the cached,
/// immutable result. Safe to call from any number of threads.
#[inline]
pub fn detect_features() -> CpuFeatures {
    *CPU_FEATURES.get_or_init(detect_features_uncached)
}

/// Perform actual CPU feature detection (called once)
#[cold]
fn detect_features_uncached() -> CpuFeatures {
    #[allow(unused_mut)]
    let mut features = CpuFeatures::NONE;

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx") {
            features = features | CpuFeatures::AVX;
        }
        if is_x86_feature_detected!("avx2") {
            features = features | CpuFeatures::AVX2;
        }
        if is_x86_feature_detected!("fma") {
            features = features | CpuFeatures::FMA;
        }
        if is_x86_feature_detected!("f16c") {
            features = features | CpuFeatures::F16C;
        }
        if is_x86_feature_detected!("avx512f") {
            features = features | CpuFeatures::AVX512F;
        }
        if is_x86_feature_detected!("avx512vl") {
            features = features | CpuFeatures::AVX512VL;
        }
        if is_x86_feature_detected!("avx512vnni") {
            features = features | CpuFeatures::AVX512VNNI;
        }
        if is_x86_feature_detected!("avxvnni") {
            features = features | CpuFeatures::AVXVNNI;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // NEON is mandatory on AArch64
        features = features | CpuFeatures::NEON;
        if std::arch::is_aarch64_feature_detected!("fp16") {
            features = features | CpuFeatures::NEON_FP16;
        }
        if std::arch::is_aarch64_feature_detected!("dotprod") {
            features = features | CpuFeatures::NEON_DOTPROD;
        }
    }

    features
}
