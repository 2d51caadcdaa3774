//! # qgemm
//!
//! **Runtime kernel dispatch for mixed-precision matrix multiplication.**
//!
//! qgemm selects the fastest matrix-multiplication kernel eligible on the
//! running CPU for a given operand-type pair, covering f32, f16, and the
//! 32-element quantized block formats (q4_0, q4_1, q8_0, q8_1).
//!
//! ## How it works
//!
//! - **Capability snapshot**: CPU features are detected once per process and
//!   cached; selection is a pure function of that snapshot.
//! - **Type-compatibility matrix**: each supported `(Atype, Btype)` pair has
//!   a static, priority-ordered table of kernel variants.
//! - **Eligibility**: a variant runs only if its required features are all
//!   present and the reduction dimension `k` meets its divisibility
//!   requirement.
//! - **Deterministic fallback**: when no variant is eligible the call
//!   returns `false` and leaves the output untouched, so the caller's own
//!   generic path takes over. Unsupported shapes never panic.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qgemm::prelude::*;
//!
//! let mut c = vec![0.0f32; m * n];
//! let ran = sgemm(
//!     m, n, k,
//!     Operand::F32(&a), k,
//!     Operand::F32(&b), k,
//!     &mut c, m,
//!     0, 1, Task::Compute,
//! )?;
//! if !ran {
//!     // no eligible kernel on this machine: run your fallback GEMM
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): [`sgemm_parallel`](gemm::sgemm_parallel) spreads the
//!   row partition over the rayon thread pool

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod dtype;
pub mod error;
pub mod gemm;
pub mod kernels;
pub mod simd;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dispatch::{select, selected_kernel_name, KernelVariant};
    pub use crate::dtype::{BlockQ4_0, BlockQ4_1, BlockQ8_0, BlockQ8_1, DType, QK};
    pub use crate::error::{Error, Result};
    pub use crate::gemm::{sgemm, Operand};
    pub use crate::kernels::Task;
    pub use crate::simd::{detect_features, CpuFeatures};

    #[cfg(feature = "rayon")]
    pub use crate::gemm::sgemm_parallel;
}
