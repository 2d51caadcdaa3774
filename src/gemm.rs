//! Safe slice-based entry points
//!
//! [`sgemm`] wraps the raw [`dispatch`](crate::dispatch::dispatch) call with
//! typed operand slices and bounds validation, so the unsafe pointer
//! contract is discharged once here instead of at every call site. The
//! semantics are otherwise identical: `Ok(true)` means a kernel ran,
//! `Ok(false)` means no eligible kernel exists and the output is untouched.

use half::f16;

use crate::dispatch::dispatch;
use crate::dtype::{BlockQ4_0, BlockQ4_1, BlockQ8_0, BlockQ8_1, DType};
use crate::error::{Error, Result};
use crate::kernels::Task;

/// A typed view of one input operand
///
/// Carries the element type together with the data, so the operand-type pair
/// given to the dispatcher always matches the buffer layout. Quantized
/// operands are slices of whole blocks; their row stride is counted in
/// blocks.
#[derive(Copy, Clone, Debug)]
pub enum Operand<'a> {
    /// Rows of f32 elements
    F32(&'a [f32]),
    /// Rows of f16 elements
    F16(&'a [f16]),
    /// Rows of 4-bit blocks with a scale
    Q4_0(&'a [BlockQ4_0]),
    /// Rows of 4-bit blocks with a scale and minimum
    Q4_1(&'a [BlockQ4_1]),
    /// Rows of 8-bit blocks with a scale
    Q8_0(&'a [BlockQ8_0]),
    /// Rows of 8-bit blocks with a scale and precomputed sum
    Q8_1(&'a [BlockQ8_1]),
}

impl Operand<'_> {
    /// Element type of this operand
    pub fn dtype(&self) -> DType {
        match self {
            Self::F32(_) => DType::F32,
            Self::F16(_) => DType::F16,
            Self::Q4_0(_) => DType::Q4_0,
            Self::Q4_1(_) => DType::Q4_1,
            Self::Q8_0(_) => DType::Q8_0,
            Self::Q8_1(_) => DType::Q8_1,
        }
    }

    /// Length in addressable units (elements or blocks)
    pub fn len(&self) -> usize {
        match self {
            Self::F32(s) => s.len(),
            Self::F16(s) => s.len(),
            Self::Q4_0(s) => s.len(),
            Self::Q4_1(s) => s.len(),
            Self::Q8_0(s) => s.len(),
            Self::Q8_1(s) => s.len(),
        }
    }

    /// Returns true if the operand holds no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_ptr(&self) -> *const u8 {
        match self {
            Self::F32(s) => s.as_ptr().cast(),
            Self::F16(s) => s.as_ptr().cast(),
            Self::Q4_0(s) => s.as_ptr().cast(),
            Self::Q4_1(s) => s.as_ptr().cast(),
            Self::Q8_0(s) => s.as_ptr().cast(),
            Self::Q8_1(s) => s.as_ptr().cast(),
        }
    }
}

/// Required buffer extent for `rows` rows of `width` units at stride `ld`
///
/// The last row needs `width` units starting at `(rows-1)*ld`. Errors on
/// overflow: a stride large enough to wrap would otherwise pass the length
/// check with an undersized buffer.
fn required_extent(name: &'static str, rows: usize, width: usize, ld: usize) -> Result<usize> {
    (rows - 1)
        .checked_mul(ld)
        .and_then(|last| last.checked_add(width))
        .ok_or_else(|| {
            Error::invalid_argument(
                name,
                format!("extent overflows usize: {rows} rows at stride {ld}"),
            )
        })
}

/// Check one input operand against its dimensions and stride
///
/// A stride below the row width would make rows overlap.
fn validate_operand(name: &'static str, op: &Operand<'_>, rows: usize, k: usize, ld: usize) -> Result<()> {
    let row_units = op.dtype().row_units(k);
    if ld < row_units {
        return Err(Error::invalid_argument(
            name,
            format!("stride {ld} is below the row width of {row_units} units"),
        ));
    }
    if rows == 0 {
        return Ok(());
    }
    let units = if op.dtype().is_quantized() { "blocks" } else { "elements" };
    let needed = required_extent(name, rows, row_units, ld)?;
    if op.len() < needed {
        return Err(Error::buffer_too_small(name, needed, op.len(), units));
    }
    Ok(())
}

/// Check the output buffer against the dimensions and its stride
fn validate_output(c: &[f32], m: usize, n: usize, ldc: usize) -> Result<()> {
    if ldc < m {
        return Err(Error::invalid_argument(
            "ldc",
            format!("output stride {ldc} is below m = {m}"),
        ));
    }
    if n == 0 {
        return Ok(());
    }
    let needed = required_extent("ldc", n, m, ldc)?;
    if c.len() < needed {
        return Err(Error::buffer_too_small("C", needed, c.len(), "elements"));
    }
    Ok(())
}

/// Run one GEMM call through the kernel dispatcher
///
/// Computes `C[j*ldc + i] = dot(A row i, B row j)` for the output rows owned
/// by worker `ith` of `nth`, using the fastest kernel eligible on this
/// machine for the operand-type pair and `k`. Returns `Ok(false)` without
/// touching `c` when no kernel is eligible; the caller then applies its own
/// fallback path.
///
/// Strides count addressable units: elements for `F32`/`F16` operands,
/// 32-element blocks for quantized ones, f32 elements for `c`.
#[allow(clippy::too_many_arguments)]
pub fn sgemm(
    m: usize,
    n: usize,
    k: usize,
    a: Operand<'_>,
    lda: usize,
    b: Operand<'_>,
    ldb: usize,
    c: &mut [f32],
    ldc: usize,
    ith: usize,
    nth: usize,
    task: Task,
) -> Result<bool> {
    if nth == 0 {
        return Err(Error::invalid_argument("nth", "worker count must be non-zero"));
    }
    if ith >= nth {
        return Err(Error::invalid_argument(
            "ith",
            format!("worker index {ith} out of range for {nth} workers"),
        ));
    }
    validate_operand("A", &a, m, k, lda)?;
    validate_operand("B", &b, n, k, ldb)?;
    validate_output(c, m, n, ldc)?;

    // Validation above pins every pointer to its claimed layout and extent.
    let ok = unsafe {
        dispatch(
            m,
            n,
            k,
            a.as_ptr(),
            lda,
            b.as_ptr(),
            ldb,
            c.as_mut_ptr(),
            ldc,
            ith,
            nth,
            task,
            a.dtype(),
            b.dtype(),
            DType::F32,
        )
    };
    Ok(ok)
}

/// Run one GEMM call across the rayon thread pool
///
/// Splits the output rows over `rayon::current_num_threads()` workers, each
/// invoking the same selected kernel on its interleaved share. Selection
/// happens per worker but is deterministic, so every worker runs the same
/// tier.
#[cfg(feature = "rayon")]
#[allow(clippy::too_many_arguments)]
pub fn sgemm_parallel(
    m: usize,
    n: usize,
    k: usize,
    a: Operand<'_>,
    lda: usize,
    b: Operand<'_>,
    ldb: usize,
    c: &mut [f32],
    ldc: usize,
) -> Result<bool> {
    use rayon::prelude::*;

    // Workers write disjoint rows of C; the raw pointer is shared read-write
    // across the pool under that partitioning.
    struct SharedOut(*mut f32);
    unsafe impl Send for SharedOut {}
    unsafe impl Sync for SharedOut {}

    validate_operand("A", &a, m, k, lda)?;
    validate_operand("B", &b, n, k, ldb)?;
    validate_output(c, m, n, ldc)?;

    let nth = rayon::current_num_threads().max(1);
    let out = SharedOut(c.as_mut_ptr());
    let out = &out;

    let results: Vec<bool> = (0..nth)
        .into_par_iter()
        .map(|ith| unsafe {
            dispatch(
                m,
                n,
                k,
                a.as_ptr(),
                lda,
                b.as_ptr(),
                ldb,
                out.0,
                ldc,
                ith,
                nth,
                Task::Compute,
                a.dtype(),
                b.dtype(),
                DType::F32,
            )
        })
        .collect();

    // Selection is a pure function of the snapshot and call shape, so the
    // workers either all ran or all declined.
    Ok(results.into_iter().all(|ok| ok))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_workers() {
        let a = [0.0f32; 8];
        let b = [0.0f32; 8];
        let mut c = [0.0f32; 1];
        let err = sgemm(1, 1, 8, Operand::F32(&a), 8, Operand::F32(&b), 8, &mut c, 1, 0, 0, Task::Compute);
        assert!(matches!(err, Err(Error::InvalidArgument { arg: "nth", .. })));
    }

    #[test]
    fn test_rejects_worker_index_out_of_range() {
        let a = [0.0f32; 8];
        let b = [0.0f32; 8];
        let mut c = [0.0f32; 1];
        let err = sgemm(1, 1, 8, Operand::F32(&a), 8, Operand::F32(&b), 8, &mut c, 1, 2, 2, Task::Compute);
        assert!(matches!(err, Err(Error::InvalidArgument { arg: "ith", .. })));
    }

    #[test]
    fn test_rejects_short_operand_buffer() {
        let a = [0.0f32; 15]; // one element short of 2x8
        let b = [0.0f32; 16];
        let mut c = [0.0f32; 4];
        let err = sgemm(2, 2, 8, Operand::F32(&a), 8, Operand::F32(&b), 8, &mut c, 2, 0, 1, Task::Compute);
        match err {
            Err(Error::BufferTooSmall { operand, needed, got, .. }) => {
                assert_eq!(operand, "A");
                assert_eq!(needed, 16);
                assert_eq!(got, 15);
            }
            other => panic!("expected BufferTooSmall, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_stride_below_row_width() {
        let a = [0.0f32; 16];
        let b = [0.0f32; 16];
        let mut c = [0.0f32; 4];
        let err = sgemm(2, 2, 8, Operand::F32(&a), 4, Operand::F32(&b), 8, &mut c, 2, 0, 1, Task::Compute);
        assert!(matches!(err, Err(Error::InvalidArgument { arg: "A", .. })));
    }

    #[test]
    fn test_rejects_overflowing_operand_stride() {
        // A stride this large wraps (rows-1)*ld past usize::MAX; the wrapped
        // extent would pass the length check and hand the kernel an
        // out-of-bounds pointer.
        let a = [0.0f32; 8];
        let b = [0.0f32; 8];
        let mut c = [0.0f32; 3];
        let res = sgemm(
            3,
            1,
            8,
            Operand::F32(&a),
            1usize << 63,
            Operand::F32(&b),
            8,
            &mut c,
            3,
            0,
            1,
            Task::Compute,
        );
        assert!(matches!(res, Err(Error::InvalidArgument { arg: "A", .. })));
    }

    #[test]
    fn test_rejects_overflowing_output_stride() {
        let a = [0.0f32; 16];
        let b = [0.0f32; 24];
        let mut c = [0.0f32; 6];
        let res = sgemm(
            2,
            3,
            8,
            Operand::F32(&a),
            8,
            Operand::F32(&b),
            8,
            &mut c,
            usize::MAX / 2 + 1,
            0,
            1,
            Task::Compute,
        );
        assert!(matches!(res, Err(Error::InvalidArgument { arg: "ldc", .. })));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_rejects_overflowing_operand_stride() {
        let a = [0.0f32; 8];
        let b = [0.0f32; 8];
        let mut c = [0.0f32; 3];
        let res = sgemm_parallel(3, 1, 8, Operand::F32(&a), 1usize << 63, Operand::F32(&b), 8, &mut c, 3);
        assert!(matches!(res, Err(Error::InvalidArgument { arg: "A", .. })));
    }

    #[test]
    fn test_rejects_short_output_buffer() {
        let a = [0.0f32; 16];
        let b = [0.0f32; 16];
        let mut c = [0.0f32; 3];
        let err = sgemm(2, 2, 8, Operand::F32(&a), 8, Operand::F32(&b), 8, &mut c, 2, 0, 1, Task::Compute);
        assert!(matches!(err, Err(Error::BufferTooSmall { operand: "C", .. })));
    }

    #[test]
    fn test_quantized_strides_count_blocks() {
        use crate::dtype::QK;
        let k = 2 * QK;
        let a_blocks = vec![BlockQ8_0::quantize(&[0.5f32; QK]); 2 * 2]; // 2 rows x 2 blocks
        let b_blocks = vec![BlockQ8_0::quantize(&[0.5f32; QK]); 3 * 2];
        let mut c = vec![0.0f32; 2 * 3];

        // Stride of 2 blocks per row is exactly the row width
        let res = sgemm(
            2,
            3,
            k,
            Operand::Q8_0(&a_blocks),
            2,
            Operand::Q8_0(&b_blocks),
            2,
            &mut c,
            2,
            0,
            1,
            Task::Compute,
        );
        assert!(res.is_ok());

        // A stride of 1 block would alias rows
        let res = sgemm(
            2,
            3,
            k,
            Operand::Q8_0(&a_blocks),
            1,
            Operand::Q8_0(&b_blocks),
            2,
            &mut c,
            2,
            0,
            1,
            Task::Compute,
        );
        assert!(matches!(res, Err(Error::InvalidArgument { arg: "A", .. })));
    }

    #[test]
    fn test_mismatched_pair_is_ok_false_not_error() {
        use crate::dtype::QK;
        let a_blocks = vec![BlockQ4_0::quantize(&[0.5f32; QK]); 1];
        let b_blocks = vec![BlockQ4_0::quantize(&[0.5f32; QK]); 1];
        let mut c = vec![9.0f32; 1];

        let res = sgemm(
            1,
            1,
            QK,
            Operand::Q4_0(&a_blocks),
            1,
            Operand::Q4_0(&b_blocks),
            1,
            &mut c,
            1,
            0,
            1,
            Task::Compute,
        )
        .unwrap();
        assert!(!res);
        assert_eq!(c[0], 9.0, "declined dispatch must not touch C");
    }

    #[test]
    fn test_empty_dimensions_validate() {
        let mut c: Vec<f32> = vec![];
        let res = sgemm(
            0,
            0,
            8,
            Operand::F32(&[]),
            8,
            Operand::F32(&[]),
            8,
            &mut c,
            0,
            0,
            1,
            Task::Compute,
        );
        // m = 0 means ldc = 0 is acceptable and no buffer space is needed
        assert!(res.is_ok());
    }
}
