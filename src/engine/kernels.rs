//! Reference int8 kernels for the three operators the perception model
//! uses.
//!
//! Layout is NHWC throughout.  Filters are `[out_c, k_h, k_w, in_c]` for
//! convolution and `[units, depth]` for fully-connected.  Weight zero points
//! are taken as 0 (symmetric weight quantisation); per-channel weight
//! scales are honoured when present.  Rescaling uses `f32` rather than the
//! fixed-point multiplier path; results agree with it to within one LSB.
//!
//! Every size a model declares is multiplied with `checked_mul` and every
//! accumulator is an `i64`, so a hostile artifact can only make a kernel
//! return an error.

use core::ops::Range;

use flatbuffers::Vector;

use super::arena::{ArenaPlan, split_disjoint};
use super::model::ModelArtifact;
use super::schema::{ActivationFunctionType, Operator, Padding, Tensor, TensorType};
use crate::error::InvokeError;

/// Signature every registered kernel implements.
pub type KernelFn = fn(&mut OpContext<'_, '_>) -> Result<(), InvokeError>;

/// Everything a kernel may touch while running one operator.
pub struct OpContext<'a, 'm> {
    pub index: usize,
    pub op: Operator<'m>,
    pub model: &'a ModelArtifact<'m>,
    arena: &'a mut [u8],
    plan: &'a ArenaPlan,
}

impl<'a, 'm> OpContext<'a, 'm> {
    pub fn new(
        index: usize,
        op: Operator<'m>,
        model: &'a ModelArtifact<'m>,
        arena: &'a mut [u8],
        plan: &'a ArenaPlan,
    ) -> Self {
        Self {
            index,
            op,
            model,
            arena,
            plan,
        }
    }

    fn operand(list: Option<Vector<'m, i32>>, n: usize) -> Option<usize> {
        let list = list?;
        if n >= list.len() {
            return None;
        }
        usize::try_from(list.get(n)).ok()
    }

    /// Tensor index of input `n`, `None` if absent or omitted (-1).
    pub fn input_index(&self, n: usize) -> Option<usize> {
        Self::operand(self.op.inputs(), n)
    }

    pub fn output_index(&self, n: usize) -> Option<usize> {
        Self::operand(self.op.outputs(), n)
    }

    fn required_input(&self, n: usize) -> Result<usize, InvokeError> {
        self.input_index(n)
            .ok_or(InvokeError::ShapeMismatch { op: self.index })
    }

    fn required_output(&self, n: usize) -> Result<usize, InvokeError> {
        self.output_index(n)
            .ok_or(InvokeError::ShapeMismatch { op: self.index })
    }

    pub fn tensor(&self, index: usize) -> Result<Tensor<'m>, InvokeError> {
        self.model
            .tensor(index)
            .ok_or(InvokeError::ShapeMismatch { op: self.index })
    }

    /// Constant payload of a weight or bias tensor.
    pub fn constant(&self, index: usize) -> Result<&'m [u8], InvokeError> {
        let tensor = self.tensor(index)?;
        self.model
            .constant_data(&tensor)
            .ok_or(InvokeError::MissingData { tensor: index })
    }

    fn range(&self, tensor: usize) -> Result<Range<usize>, InvokeError> {
        self.plan
            .range(tensor)
            .ok_or(InvokeError::MissingData { tensor })
    }

    /// Input activation (shared) and output activation (exclusive).
    pub fn activations(
        &mut self,
        input: usize,
        output: usize,
    ) -> Result<(&[u8], &mut [u8]), InvokeError> {
        let src = self.range(input)?;
        let dst = self.range(output)?;
        split_disjoint(&mut *self.arena, src, dst).ok_or(InvokeError::AliasedTensors { op: self.index })
    }
}

// ───────────────────────────────────────────────────────────────
// Quantisation helpers
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct QuantParams {
    scale: f32,
    zero_point: i32,
}

fn sane_scale(s: f32) -> f32 {
    if s.is_finite() && s > 0.0 { s } else { 1.0 }
}

fn quant(tensor: &Tensor<'_>) -> QuantParams {
    let q = tensor.quantization();
    let scale = q
        .and_then(|q| q.scale())
        .filter(|s| !s.is_empty())
        .map_or(1.0, |s| s.get(0));
    let zero_point = q
        .and_then(|q| q.zero_point())
        .filter(|z| !z.is_empty())
        .map_or(0, |z| z.get(0));
    QuantParams {
        scale: sane_scale(scale),
        zero_point: zero_point.clamp(i64::from(i8::MIN), i64::from(i8::MAX)) as i32,
    }
}

/// Weight scale for output channel `c`.  A single-element scale vector
/// applies to every channel.
fn channel_scale(tensor: &Tensor<'_>, c: usize) -> f32 {
    let scales = tensor.quantization().and_then(|q| q.scale());
    match scales {
        Some(s) if s.len() > c => sane_scale(s.get(c)),
        Some(s) if !s.is_empty() => sane_scale(s.get(0)),
        _ => 1.0,
    }
}

fn activation_range(
    op: usize,
    act: ActivationFunctionType,
    q: QuantParams,
) -> Result<(i32, i32), InvokeError> {
    // Float-to-int casts saturate.
    let quantize = |x: f32| q.zero_point.saturating_add((x / q.scale).round() as i32);
    let (lo, hi) = (i32::from(i8::MIN), i32::from(i8::MAX));
    match act {
        ActivationFunctionType::NONE => Ok((lo, hi)),
        ActivationFunctionType::RELU => Ok((lo.max(q.zero_point), hi)),
        ActivationFunctionType::RELU6 => Ok((lo.max(q.zero_point), hi.min(quantize(6.0)))),
        ActivationFunctionType::RELU_N1_TO_1 => {
            Ok((lo.max(quantize(-1.0)), hi.min(quantize(1.0))))
        }
        _ => Err(InvokeError::UnsupportedActivation { op }),
    }
}

#[inline]
fn requantize(acc: i64, multiplier: f32, zero_point: i32, range: (i32, i32)) -> i8 {
    let scaled = ((acc as f32 * multiplier).round() as i64).saturating_add(i64::from(zero_point));
    scaled.clamp(i64::from(range.0), i64::from(range.1)) as i8
}

#[inline]
fn s8(b: u8) -> i32 {
    i32::from(b as i8)
}

/// One input-times-weight term, offset by the input zero point.
#[inline]
fn term(x: u8, zero_point: i32, k: u8) -> i64 {
    i64::from(s8(x) - zero_point) * i64::from(s8(k))
}

fn bias_at(bias: Option<&[u8]>, c: usize) -> i64 {
    bias.and_then(|b| b.get(c * 4..c * 4 + 4))
        .map_or(0, |w| i64::from(i32::from_le_bytes([w[0], w[1], w[2], w[3]])))
}

// ───────────────────────────────────────────────────────────────
// Shape helpers
// ───────────────────────────────────────────────────────────────

fn expect_int8(op: usize, index: usize, tensor: &Tensor<'_>) -> Result<(), InvokeError> {
    if tensor.type_() == TensorType::INT8 {
        Ok(())
    } else {
        Err(InvokeError::UnsupportedType { op, tensor: index })
    }
}

fn dims<const R: usize>(op: usize, tensor: &Tensor<'_>) -> Result<[usize; R], InvokeError> {
    let shape = tensor.shape().ok_or(InvokeError::ShapeMismatch { op })?;
    if shape.len() != R {
        return Err(InvokeError::ShapeMismatch { op });
    }
    let mut out = [0usize; R];
    for (d, v) in out.iter_mut().zip(shape.iter()) {
        *d = usize::try_from(v).map_err(|_| InvokeError::ShapeMismatch { op })?;
    }
    Ok(out)
}

fn element_count(op: usize, tensor: &Tensor<'_>) -> Result<usize, InvokeError> {
    let shape = tensor.shape().ok_or(InvokeError::ShapeMismatch { op })?;
    shape.iter().try_fold(1usize, |acc, v| {
        usize::try_from(v)
            .ok()
            .and_then(|v| acc.checked_mul(v))
            .ok_or(InvokeError::ShapeMismatch { op })
    })
}

/// Product of `dims`, or `ShapeMismatch` if it does not fit a `usize`.
fn volume(op: usize, dims: &[usize]) -> Result<usize, InvokeError> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(InvokeError::ShapeMismatch { op })
}

fn stride(op: usize, v: i32) -> Result<usize, InvokeError> {
    match usize::try_from(v) {
        Ok(s) if s > 0 => Ok(s),
        _ => Err(InvokeError::ShapeMismatch { op }),
    }
}

/// Leading padding for one spatial axis.
fn padding(kind: Padding, stride: usize, in_size: usize, filter: usize, out_size: usize) -> usize {
    if kind == Padding::VALID {
        return 0;
    }
    out_size
        .saturating_sub(1)
        .saturating_mul(stride)
        .saturating_add(filter)
        .saturating_sub(in_size)
        / 2
}

/// Input coordinate for output position `o`, kernel tap `k`.  `None` when it
/// falls into the padding.
#[inline]
fn source(o: usize, k: usize, stride: usize, pad: usize, size: usize) -> Option<usize> {
    o.checked_mul(stride)?
        .checked_add(k)?
        .checked_sub(pad)
        .filter(|&i| i < size)
}

// ───────────────────────────────────────────────────────────────
// CONV_2D
// ───────────────────────────────────────────────────────────────

pub fn conv_2d(ctx: &mut OpContext<'_, '_>) -> Result<(), InvokeError> {
    let op = ctx.index;
    let opts = ctx
        .op
        .builtin_options_as_conv_2d_options()
        .ok_or(InvokeError::MissingOptions { op })?;

    let input_idx = ctx.required_input(0)?;
    let filter_idx = ctx.required_input(1)?;
    let bias_idx = ctx.input_index(2);
    let output_idx = ctx.required_output(0)?;

    let input_t = ctx.tensor(input_idx)?;
    let filter_t = ctx.tensor(filter_idx)?;
    let output_t = ctx.tensor(output_idx)?;
    expect_int8(op, input_idx, &input_t)?;
    expect_int8(op, filter_idx, &filter_t)?;
    expect_int8(op, output_idx, &output_t)?;

    let [batches, in_h, in_w, in_c] = dims::<4>(op, &input_t)?;
    let [out_c, k_h, k_w, f_c] = dims::<4>(op, &filter_t)?;
    let [out_b, out_h, out_w, out_d] = dims::<4>(op, &output_t)?;
    if f_c != in_c || out_b != batches || out_d != out_c {
        return Err(InvokeError::ShapeMismatch { op });
    }

    let stride_h = stride(op, opts.stride_h())?;
    let stride_w = stride(op, opts.stride_w())?;
    let pad_h = padding(opts.padding(), stride_h, in_h, k_h, out_h);
    let pad_w = padding(opts.padding(), stride_w, in_w, k_w, out_w);

    let in_q = quant(&input_t);
    let out_q = quant(&output_t);
    let range = activation_range(op, opts.fused_activation_function(), out_q)?;

    let filter = ctx.constant(filter_idx)?;
    if filter.len() != volume(op, &[out_c, k_h, k_w, in_c])? {
        return Err(InvokeError::ShapeMismatch { op });
    }
    let bias = match bias_idx {
        Some(b) => Some(ctx.constant(b)?),
        None => None,
    };

    let (input, output) = ctx.activations(input_idx, output_idx)?;
    if input.len() != volume(op, &[batches, in_h, in_w, in_c])?
        || output.len() != volume(op, &[batches, out_h, out_w, out_c])?
    {
        return Err(InvokeError::ShapeMismatch { op });
    }

    for b in 0..batches {
        for oy in 0..out_h {
            for ox in 0..out_w {
                for oc in 0..out_c {
                    let mut acc = bias_at(bias, oc);
                    for ky in 0..k_h {
                        let Some(iy) = source(oy, ky, stride_h, pad_h, in_h) else {
                            continue;
                        };
                        for kx in 0..k_w {
                            let Some(ix) = source(ox, kx, stride_w, pad_w, in_w) else {
                                continue;
                            };
                            let in_base = ((b * in_h + iy) * in_w + ix) * in_c;
                            let f_base = ((oc * k_h + ky) * k_w + kx) * in_c;
                            for ic in 0..in_c {
                                acc += term(input[in_base + ic], in_q.zero_point, filter[f_base + ic]);
                            }
                        }
                    }
                    let multiplier = in_q.scale * channel_scale(&filter_t, oc) / out_q.scale;
                    output[((b * out_h + oy) * out_w + ox) * out_c + oc] =
                        requantize(acc, multiplier, out_q.zero_point, range) as u8;
                }
            }
        }
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// MAX_POOL_2D
// ───────────────────────────────────────────────────────────────

pub fn max_pool_2d(ctx: &mut OpContext<'_, '_>) -> Result<(), InvokeError> {
    let op = ctx.index;
    let opts = ctx
        .op
        .builtin_options_as_pool_2d_options()
        .ok_or(InvokeError::MissingOptions { op })?;

    let input_idx = ctx.required_input(0)?;
    let output_idx = ctx.required_output(0)?;
    let input_t = ctx.tensor(input_idx)?;
    let output_t = ctx.tensor(output_idx)?;
    expect_int8(op, input_idx, &input_t)?;
    expect_int8(op, output_idx, &output_t)?;

    let [batches, in_h, in_w, depth] = dims::<4>(op, &input_t)?;
    let [out_b, out_h, out_w, out_d] = dims::<4>(op, &output_t)?;
    if out_b != batches || out_d != depth {
        return Err(InvokeError::ShapeMismatch { op });
    }

    let stride_h = stride(op, opts.stride_h())?;
    let stride_w = stride(op, opts.stride_w())?;
    let f_h = stride(op, opts.filter_height())?;
    let f_w = stride(op, opts.filter_width())?;
    let pad_h = padding(opts.padding(), stride_h, in_h, f_h, out_h);
    let pad_w = padding(opts.padding(), stride_w, in_w, f_w, out_w);
    let range = activation_range(op, opts.fused_activation_function(), quant(&output_t))?;

    let (input, output) = ctx.activations(input_idx, output_idx)?;
    if input.len() != volume(op, &[batches, in_h, in_w, depth])?
        || output.len() != volume(op, &[batches, out_h, out_w, depth])?
    {
        return Err(InvokeError::ShapeMismatch { op });
    }
    // Taps past the padded input never land on a pixel.
    let taps_h = f_h.min(in_h.saturating_add(pad_h));
    let taps_w = f_w.min(in_w.saturating_add(pad_w));

    for b in 0..batches {
        for oy in 0..out_h {
            for ox in 0..out_w {
                for c in 0..depth {
                    let mut max = i32::from(i8::MIN);
                    for ky in 0..taps_h {
                        let Some(iy) = source(oy, ky, stride_h, pad_h, in_h) else {
                            continue;
                        };
                        for kx in 0..taps_w {
                            let Some(ix) = source(ox, kx, stride_w, pad_w, in_w) else {
                                continue;
                            };
                            max = max.max(s8(input[((b * in_h + iy) * in_w + ix) * depth + c]));
                        }
                    }
                    output[((b * out_h + oy) * out_w + ox) * depth + c] =
                        max.clamp(range.0, range.1) as i8 as u8;
                }
            }
        }
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// FULLY_CONNECTED
// ───────────────────────────────────────────────────────────────

pub fn fully_connected(ctx: &mut OpContext<'_, '_>) -> Result<(), InvokeError> {
    let op = ctx.index;
    let act = ctx
        .op
        .builtin_options_as_fully_connected_options()
        .map_or(ActivationFunctionType::NONE, |o| o.fused_activation_function());

    let input_idx = ctx.required_input(0)?;
    let weights_idx = ctx.required_input(1)?;
    let bias_idx = ctx.input_index(2);
    let output_idx = ctx.required_output(0)?;

    let input_t = ctx.tensor(input_idx)?;
    let weights_t = ctx.tensor(weights_idx)?;
    let output_t = ctx.tensor(output_idx)?;
    expect_int8(op, input_idx, &input_t)?;
    expect_int8(op, weights_idx, &weights_t)?;
    expect_int8(op, output_idx, &output_t)?;

    let [units, depth] = dims::<2>(op, &weights_t)?;
    let in_len = element_count(op, &input_t)?;
    if depth == 0 || in_len % depth != 0 {
        return Err(InvokeError::ShapeMismatch { op });
    }
    let batches = in_len / depth;

    let in_q = quant(&input_t);
    let out_q = quant(&output_t);
    let range = activation_range(op, act, out_q)?;

    let weights = ctx.constant(weights_idx)?;
    if weights.len() != volume(op, &[units, depth])? {
        return Err(InvokeError::ShapeMismatch { op });
    }
    let bias = match bias_idx {
        Some(b) => Some(ctx.constant(b)?),
        None => None,
    };

    let (input, output) = ctx.activations(input_idx, output_idx)?;
    if input.len() != in_len || output.len() != volume(op, &[batches, units])? {
        return Err(InvokeError::ShapeMismatch { op });
    }

    for b in 0..batches {
        let row = &input[b * depth..(b + 1) * depth];
        for u in 0..units {
            let w = &weights[u * depth..(u + 1) * depth];
            let acc = row.iter().zip(w).fold(bias_at(bias, u), |acc, (&x, &k)| {
                acc + term(x, in_q.zero_point, k)
            });
            let multiplier = in_q.scale * channel_scale(&weights_t, u) / out_q.scale;
            output[b * units + u] = requantize(acc, multiplier, out_q.zero_point, range) as u8;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_padding_matches_reference_formula() {
        // 96 -> 48 with a 3x3 stride-2 kernel needs one pixel of total pad.
        assert_eq!(padding(Padding::SAME, 2, 96, 3, 48), 0);
        assert_eq!(padding(Padding::SAME, 1, 5, 3, 5), 1);
        assert_eq!(padding(Padding::VALID, 1, 5, 3, 3), 0);
    }

    #[test]
    fn source_skips_padding() {
        assert_eq!(source(0, 0, 1, 1, 5), None);
        assert_eq!(source(0, 1, 1, 1, 5), Some(0));
        assert_eq!(source(4, 2, 1, 1, 5), None);
    }

    #[test]
    fn requantize_rounds_and_clamps() {
        assert_eq!(requantize(10, 0.25, 0, (-128, 127)), 3);
        assert_eq!(requantize(10_000, 1.0, 0, (-128, 127)), 127);
        assert_eq!(requantize(-10_000, 1.0, 5, (-128, 127)), -128);
        assert_eq!(requantize(-3, 1.0, 0, (0, 127)), 0);
        assert_eq!(requantize(i64::MAX, 1e30, 127, (-128, 127)), 127);
    }

    #[test]
    fn oversized_dims_are_rejected() {
        let huge = usize::MAX / 2;
        assert_eq!(volume(3, &[huge, 4]), Err(InvokeError::ShapeMismatch { op: 3 }));
        assert_eq!(volume(3, &[96, 96, 1]), Ok(9216));
        assert_eq!(source(usize::MAX, 1, 2, 0, 5), None);
        assert_eq!(padding(Padding::SAME, usize::MAX, 5, 3, 5), (usize::MAX - 5) / 2);
    }

    #[test]
    fn tiny_output_scale_saturates_activation_range() {
        let q = QuantParams {
            scale: 1e-30,
            zero_point: 100,
        };
        assert_eq!(
            activation_range(0, ActivationFunctionType::RELU_N1_TO_1, q),
            Ok((-128, 127))
        );
    }

    #[test]
    fn relu_floor_is_zero_point() {
        let q = QuantParams {
            scale: 0.5,
            zero_point: -10,
        };
        assert_eq!(
            activation_range(0, ActivationFunctionType::RELU, q),
            Ok((-10, 127))
        );
        assert_eq!(
            activation_range(0, ActivationFunctionType::RELU6, q),
            Ok((-10, 2))
        );
        assert_eq!(
            activation_range(0, ActivationFunctionType(9), q),
            Err(InvokeError::UnsupportedActivation { op: 0 })
        );
    }

    #[test]
    fn bias_is_little_endian_i32() {
        let bias = [1u8, 0, 0, 0, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(bias_at(Some(&bias), 0), 1);
        assert_eq!(bias_at(Some(&bias), 1), -1);
        assert_eq!(bias_at(Some(&bias), 2), 0);
        assert_eq!(bias_at(None, 0), 0);
    }
}
