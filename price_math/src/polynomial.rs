//! Lag polynomial algebra for multiplicative seasonal models
//!
//! A lag polynomial is stored as its coefficient vector indexed by lag, so
//! `[1.0, -0.5]` is `1 - 0.5B`. The leading coefficient is always 1.

/// Build the autoregressive polynomial `1 - phi_1 B^s - ... - phi_k B^(k*s)`
pub fn ar_polynomial(coefficients: &[f64], step: usize) -> Vec<f64> {
    let step = step.max(1);
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (i, &c) in coefficients.iter().enumerate() {
        poly[(i + 1) * step] = -c;
    }
    poly
}

/// Build the moving-average polynomial `1 + theta_1 B^s + ... + theta_k B^(k*s)`
pub fn ma_polynomial(coefficients: &[f64], step: usize) -> Vec<f64> {
    let step = step.max(1);
    let mut poly = vec![0.0; coefficients.len() * step + 1];
    poly[0] = 1.0;
    for (i, &c) in coefficients.iter().enumerate() {
        poly[(i + 1) * step] = c;
    }
    poly
}

/// Product of two lag polynomials
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut product = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for (j, &y) in b.iter().enumerate() {
            product[i + j] += x * y;
        }
    }
    product
}

/// The integration operator `(1 - B)^d (1 - B^m)^D`
pub fn differencing_polynomial(d: usize, big_d: usize, m: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = multiply(&poly, &[1.0, -1.0]);
    }
    if m > 0 {
        let mut seasonal = vec![0.0; m + 1];
        seasonal[0] = 1.0;
        seasonal[m] = -1.0;
        for _ in 0..big_d {
            poly = multiply(&poly, &seasonal);
        }
    }
    poly
}

/// Convert an AR polynomial into recursion weights `a_i` so that
/// `x_t = sum_i a_i x_(t-i) + ...`
pub fn recursion_weights(ar_poly: &[f64]) -> Vec<f64> {
    ar_poly.iter().skip(1).map(|c| -c).collect()
}

/// First `n` psi weights of the MA(infinity) representation `ma(B) / ar(B)`
pub fn psi_weights(ar_poly: &[f64], ma_poly: &[f64], n: usize) -> Vec<f64> {
    let a = recursion_weights(ar_poly);
    let mut psi = Vec::with_capacity(n);

    for j in 0..n {
        let mut value = ma_poly.get(j).copied().unwrap_or(0.0);
        for i in 1..=j.min(a.len()) {
            value += a[i - 1] * psi[j - i];
        }
        psi.push(value);
    }
    psi
}
