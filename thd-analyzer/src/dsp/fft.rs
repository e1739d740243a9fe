//! In-place radix-2 FFT over split real/imaginary `f32` slices.
//!
//! Decimation in time: a bit-reversal permutation followed by `log2(n)`
//! butterfly stages. Each stage's twiddle factor is advanced by complex
//! multiplication from a per-stage step in [`TWIDDLE_STEP`], so no sine
//! table proportional to `n` is needed.

use crate::constants::MAX_FFT_SIZE_LOG2;
use crate::error::{Error, Result};

/// `(cos(pi / 2^k), -sin(pi / 2^k))` for stage `k`.
const TWIDDLE_STEP: [(f32, f32); MAX_FFT_SIZE_LOG2 as usize] = [
    (-1.000_000_000, -0.000_000_000),
    (0.000_000_000, -1.000_000_000),
    (0.707_106_77, -0.707_106_77),
    (0.923_879_5, -0.382_683_43),
    (0.980_785_25, -0.195_090_32),
    (0.995_184_7, -0.098_017_14),
    (0.998_795_45, -0.049_067_676),
    (0.999_698_8, -0.024_541_229),
    (0.999_924_7, -0.012_271_538),
    (0.999_981_16, -0.006_135_884_7),
    (0.999_995_3, -0.003_067_956_8),
    (0.999_998_8, -0.001_533_980_1),
    (0.999_999_7, -0.000_766_990_3),
    (0.999_999_94, -0.000_383_495_18),
    (1.000_000_000, -0.000_191_747_6),
    (1.000_000_000, -0.000_095_873_8),
];

fn check_lengths(re: &[f32], im: &[f32]) -> Result<usize> {
    let n = re.len();
    if n != im.len() || n < 2 || !n.is_power_of_two() || n.trailing_zeros() > MAX_FFT_SIZE_LOG2 {
        return Err(Error::InvalidLength(n));
    }
    Ok(n)
}

/// Forward transform, in place. Unnormalized.
///
/// Both slices must have the same power-of-two length between 2 and
/// [`MAX_FFT_SIZE`](crate::constants::MAX_FFT_SIZE).
pub fn fft(re: &mut [f32], im: &mut [f32]) -> Result<()> {
    let n = check_lengths(re, im)?;

    // Bit-reversal permutation
    let half = n >> 1;
    let mut j = half;
    for i in 1..n - 1 {
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
        let mut k = half;
        while k <= j {
            j -= k;
            k >>= 1;
        }
        j += k;
    }

    // Butterflies
    let stages = n.trailing_zeros() as usize;
    for stage in 0..stages {
        let span = 2 << stage;
        let half_span = span >> 1;
        let (sr, si) = TWIDDLE_STEP[stage];
        let mut ur = 1.0f32;
        let mut ui = 0.0f32;

        for offset in 0..half_span {
            let mut i = offset;
            while i < n {
                let ip = i + half_span;
                let tr = re[ip] * ur - im[ip] * ui;
                let ti = re[ip] * ui + im[ip] * ur;
                re[ip] = re[i] - tr;
                im[ip] = im[i] - ti;
                re[i] += tr;
                im[i] += ti;
                i += span;
            }

            let t = ur;
            ur = t * sr - ui * si;
            ui = t * si + ui * sr;
        }
    }

    Ok(())
}

/// Inverse transform, in place, scaled by `1/n`.
pub fn inverse_fft(re: &mut [f32], im: &mut [f32]) -> Result<()> {
    let n = check_lengths(re, im)?;

    for v in im.iter_mut() {
        *v = -*v;
    }
    fft(re, im)?;

    let scale = n as f32;
    for (r, i) in re.iter_mut().zip(im.iter_mut()) {
        *r /= scale;
        *i = -*i / scale;
    }
    Ok(())
}
