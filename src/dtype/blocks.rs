//! Fixed-layout quantized block structures
//!
//! Block layouts follow the GGML wire format: a half-precision scale (plus an
//! offset or sum term for the `_1` variants) followed by the packed values.
//! All structs are `#[repr(C)]` with no padding, so operand buffers can be
//! reinterpreted byte-for-byte with `bytemuck`.
//!
//! Nibble packing for the 4-bit types: byte `j` holds element `j` in its low
//! nibble and element `j + 16` in its high nibble.

use bytemuck::{Pod, Zeroable};
use half::f16;

/// Elements per quantized block
///
/// The divisibility constant: kernels consuming quantized operands require
/// the reduction dimension to be a multiple of this.
pub const QK: usize = 32;

/// 4-bit symmetric quantized block: `value = (nibble - 8) * d`
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BlockQ4_0 {
    /// Scale factor
    pub d: f16,
    /// Packed 4-bit values, two per byte
    pub qs: [u8; QK / 2],
}

/// 4-bit affine quantized block: `value = nibble * d + m`
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BlockQ4_1 {
    /// Scale factor
    pub d: f16,
    /// Block minimum
    pub m: f16,
    /// Packed 4-bit values, two per byte
    pub qs: [u8; QK / 2],
}

/// 8-bit symmetric quantized block: `value = q * d`
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BlockQ8_0 {
    /// Scale factor
    pub d: f16,
    /// Quantized values
    pub qs: [i8; QK],
}

/// 8-bit quantized block carrying its scaled element sum
///
/// `s` stores `d * sum(qs)`, which lets the Q4_1 dot product fold the block
/// minimum into a single multiply instead of a per-element add.
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BlockQ8_1 {
    /// Scale factor
    pub d: f16,
    /// Precomputed `d * sum(qs)`
    pub s: f16,
    /// Quantized values
    pub qs: [i8; QK],
}

impl BlockQ4_0 {
    /// Quantize 32 f32 values to Q4_0 format
    ///
    /// The scale is chosen so the largest-magnitude input maps to the edge of
    /// the signed nibble range, preserving its sign.
    #[must_use]
    pub fn quantize(values: &[f32; QK]) -> Self {
        let mut amax = 0.0f32;
        let mut max = 0.0f32;
        for &v in values {
            if v.abs() > amax {
                amax = v.abs();
                max = v;
            }
        }

        let d = max / -8.0;
        let id = if d != 0.0 { 1.0 / d } else { 0.0 };

        let mut qs = [0u8; QK / 2];
        for (j, q) in qs.iter_mut().enumerate() {
            let x0 = values[j] * id;
            let x1 = values[j + QK / 2] * id;
            let q0 = 15u8.min((x0 + 8.5) as u8);
            let q1 = 15u8.min((x1 + 8.5) as u8);
            *q = q0 | (q1 << 4);
        }

        Self {
            d: f16::from_f32(d),
            qs,
        }
    }

    /// Dequantize the block back to f32 values
    #[must_use]
    pub fn dequantize(&self) -> [f32; QK] {
        let d = self.d.to_f32();
        let mut values = [0.0f32; QK];
        for (j, &q) in self.qs.iter().enumerate() {
            values[j] = ((q & 0x0F) as i32 - 8) as f32 * d;
            values[j + QK / 2] = ((q >> 4) as i32 - 8) as f32 * d;
        }
        values
    }
}

impl BlockQ4_1 {
    /// Quantize 32 f32 values to Q4_1 format
    #[must_use]
    pub fn quantize(values: &[f32; QK]) -> Self {
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let d = (max - min) / 15.0;
        let id = if d != 0.0 { 1.0 / d } else { 0.0 };

        let mut qs = [0u8; QK / 2];
        for (j, q) in qs.iter_mut().enumerate() {
            let x0 = (values[j] - min) * id;
            let x1 = (values[j + QK / 2] - min) * id;
            let q0 = 15u8.min((x0 + 0.5) as u8);
            let q1 = 15u8.min((x1 + 0.5) as u8);
            *q = q0 | (q1 << 4);
        }

        Self {
            d: f16::from_f32(d),
            m: f16::from_f32(min),
            qs,
        }
    }

    /// Dequantize the block back to f32 values
    #[must_use]
    pub fn dequantize(&self) -> [f32; QK] {
        let d = self.d.to_f32();
        let m = self.m.to_f32();
        let mut values = [0.0f32; QK];
        for (j, &q) in self.qs.iter().enumerate() {
            values[j] = (q & 0x0F) as f32 * d + m;
            values[j + QK / 2] = (q >> 4) as f32 * d + m;
        }
        values
    }
}

impl BlockQ8_0 {
    /// Quantize 32 f32 values to Q8_0 format
    ///
    /// Symmetric quantization: `scale = max(abs(values)) / 127`.
    #[must_use]
    pub fn quantize(values: &[f32; QK]) -> Self {
        let amax = values.iter().map(|v| v.abs()).fold(0.0f32, f32::max);
        let d = amax / 127.0;
        let id = if d != 0.0 { 1.0 / d } else { 0.0 };

        let mut qs = [0i8; QK];
        for (q, &v) in qs.iter_mut().zip(values.iter()) {
            *q = (v * id).round().clamp(-127.0, 127.0) as i8;
        }

        Self {
            d: f16::from_f32(d),
            qs,
        }
    }

    /// Dequantize the block back to f32 values
    #[must_use]
    pub fn dequantize(&self) -> [f32; QK] {
        let d = self.d.to_f32();
        let mut values = [0.0f32; QK];
        for (v, &q) in values.iter_mut().zip(self.qs.iter()) {
            *v = q as f32 * d;
        }
        values
    }
}

impl BlockQ8_1 {
    /// Quantize 32 f32 values to Q8_1 format
    #[must_use]
    pub fn quantize(values: &[f32; QK]) -> Self {
        let amax = values.iter().map(|v| v.abs()).fold(0.0f32, f32::max);
        let d = amax / 127.0;
        let id = if d != 0.0 { 1.0 / d } else { 0.0 };

        let mut qs = [0i8; QK];
        let mut sum = 0i32;
        for (q, &v) in qs.iter_mut().zip(values.iter()) {
            *q = (v * id).round().clamp(-127.0, 127.0) as i8;
            sum += *q as i32;
        }

        Self {
            d: f16::from_f32(d),
            s: f16::from_f32(d * sum as f32),
            qs,
        }
    }

    /// Dequantize the block back to f32 values
    #[must_use]
    pub fn dequantize(&self) -> [f32; QK] {
        let d = self.d.to_f32();
        let mut values = [0.0f32; QK];
        for (v, &q) in values.iter_mut().zip(self.qs.iter()) {
            *v = q as f32 * d;
        }
        values
    }
}
