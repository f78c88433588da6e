/// Linear interpolation (equivalent to numpy.interp).
///
/// Interpolates values from `(xp, fp)` at points `x`.
/// Values outside the range are clamped to the boundary values.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    x.iter().map(|&xi| interp_one(xi, xp, fp)).collect()
}

/// Find the bracketing pair `(lo, hi)` for an interior point.
///
/// `xp` may repeat a value (an absorption edge). A point landing exactly on
/// a repeated knot resolves to the last sample at that knot, as numpy does.
#[inline]
fn bracket(x: f64, xp: &[f64]) -> (usize, usize) {
    let hi = xp.partition_point(|&v| v <= x);
    (hi - 1, hi)
}

/// Interpolate a single value.
pub fn interp_one(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    if xp.is_empty() || x.is_nan() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[xp.len() - 1] {
        return fp[fp.len() - 1];
    }

    let (lo, hi) = bracket(x, xp);
    if xp[lo] == x {
        return fp[lo];
    }

    let t = (x - xp[lo]) / (xp[hi] - xp[lo]);
    fp[lo] + t * (fp[hi] - fp[lo])
}

/// Log-log linear interpolation.
///
/// Equivalent to `10^interp(log10(x), log10(xp), log10(fp))`. This is the
/// model for every attenuation curve; knot points are returned untouched.
pub fn interp_loglog(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    x.iter().map(|&xi| interp_loglog_one(xi, xp, fp)).collect()
}

/// Log-log interpolate a single value.
pub fn interp_loglog_one(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    if xp.is_empty() || x.is_nan() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[xp.len() - 1] {
        return fp[fp.len() - 1];
    }

    let (lo, hi) = bracket(x, xp);
    if xp[lo] == x {
        return fp[lo];
    }

    let t = (x.log10() - xp[lo].log10()) / (xp[hi].log10() - xp[lo].log10());
    if fp[lo] <= 0.0 || fp[hi] <= 0.0 {
        // no logarithm for an empty bin; stay linear in y
        return fp[lo] + t * (fp[hi] - fp[lo]);
    }
    let (y0, y1) = (fp[lo].log10(), fp[hi].log10());
    10f64.powf(y0 + t * (y1 - y0))
}
