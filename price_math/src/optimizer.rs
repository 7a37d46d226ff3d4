//! Derivative-free minimisation
//!
//! Nelder–Mead simplex search. Likelihood surfaces of seasonal models are
//! cheap to evaluate but awkward to differentiate, so the fitting engine relies
//! on this instead of gradient methods.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Settings for the simplex search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    /// Iteration ceiling; reaching it is not an error
    pub max_iter: usize,
    /// Spread of objective values across the simplex that counts as converged
    pub tolerance: f64,
    /// Offset used to build the initial simplex around the starting point
    pub initial_step: f64,
    /// Reflection coefficient
    pub alpha: f64,
    /// Expansion coefficient
    pub gamma: f64,
    /// Contraction coefficient
    pub rho: f64,
    /// Shrink coefficient
    pub sigma: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 500,
            tolerance: 1e-8,
            initial_step: 0.1,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
        }
    }
}

/// Outcome of a simplex search
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the tolerance was met before the iteration ceiling
    pub converged: bool,
}

/// Minimise `objective` starting from `initial`.
///
/// Non-finite objective values are treated as `+inf`, so the simplex moves away
/// from regions where the objective cannot be evaluated.
pub fn nelder_mead<F>(objective: F, initial: &[f64], config: &NelderMeadConfig) -> Result<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    if config.max_iter == 0 {
        return Err(MathError::InvalidInput(
            "Iteration ceiling must be greater than zero".to_string(),
        ));
    }

    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let n = initial.len();
    if n == 0 {
        let value = eval(initial);
        return Ok(Minimum {
            point: Vec::new(),
            value,
            iterations: 0,
            converged: true,
        });
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(initial.to_vec());
    for i in 0..n {
        let mut vertex = initial.to_vec();
        vertex[i] += if initial[i].abs() > 1e-8 {
            config.initial_step * initial[i].abs().max(1.0)
        } else {
            config.initial_step
        };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[n];
        if best.is_finite() && (worst - best).abs() <= config.tolerance * (1.0 + best.abs()) {
            converged = true;
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();

        let reflected = towards(&centroid, &simplex[n], -config.alpha);
        let reflected_value = eval(&reflected);

        if reflected_value < values[0] {
            let expanded = towards(&centroid, &simplex[n], -config.alpha * config.gamma);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[n] = expanded;
                values[n] = expanded_value;
            } else {
                simplex[n] = reflected;
                values[n] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[n - 1] {
            simplex[n] = reflected;
            values[n] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[n] {
            let c = towards(&centroid, &reflected, config.rho);
            let v = eval(&c);
            (c, v)
        } else {
            let c = towards(&centroid, &simplex[n], config.rho);
            let v = eval(&c);
            (c, v)
        };

        if contracted_value < values[n].min(reflected_value) {
            simplex[n] = contracted;
            values[n] = contracted_value;
            continue;
        }

        // Shrink everything towards the best vertex
        let anchor = simplex[0].clone();
        for i in 1..=n {
            simplex[i] = towards(&anchor, &simplex[i], config.sigma);
            values[i] = eval(&simplex[i]);
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    Ok(Minimum {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    })
}

/// `origin + t * (target - origin)`
fn towards(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(target.iter())
        .map(|(o, x)| o + t * (x - o))
        .collect()
}
