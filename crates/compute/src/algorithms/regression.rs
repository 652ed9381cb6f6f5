//! Ordinary least squares with an intercept.
//!
//! The normal equations are built from mean-centered data, so the intercept
//! falls out as `mean(y) - coef · mean(x)` and never enters the solve.

use rayon::prelude::*;

/// Fitted linear model.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    /// One coefficient per feature, in feature order.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Fit `label = intercept + Σ coef_i * feature_i`.
///
/// Each row holds the feature values followed by the label as its last
/// element. Returns `None` for an empty input, rows with fewer than two
/// values, sums that overflow `f64`, or a system that stays singular after
/// regularization. A constant feature gets a zero coefficient.
pub fn fit_linear(rows: &[Vec<f64>]) -> Option<LinearModel> {
    let n = rows.len();
    let width = rows.first()?.len();
    if width < 2 {
        return None;
    }
    let p = width - 1;

    let sums = rows
        .par_iter()
        .fold(
            || vec![0.0; width],
            |mut acc, row| {
                acc.iter_mut().zip(row).for_each(|(a, v)| *a += v);
                acc
            },
        )
        .reduce(
            || vec![0.0; width],
            |mut a, b| {
                a.iter_mut().zip(&b).for_each(|(x, y)| *x += y);
                a
            },
        );
    let means: Vec<f64> = sums.iter().map(|s| s / n as f64).collect();
    if means.iter().any(|m| !m.is_finite()) {
        return None;
    }

    // Accumulate [XtX | Xty] in one parallel pass.
    let (xtx, xty) = rows
        .par_iter()
        .fold(
            || (vec![vec![0.0; p]; p], vec![0.0; p]),
            |(mut xtx, mut xty), row| {
                let y = row[p] - means[p];
                for i in 0..p {
                    let xi = row[i] - means[i];
                    xty[i] += xi * y;
                    for j in 0..=i {
                        xtx[i][j] += xi * (row[j] - means[j]);
                    }
                }
                (xtx, xty)
            },
        )
        .reduce(
            || (vec![vec![0.0; p]; p], vec![0.0; p]),
            |(mut a, mut ay), (b, by)| {
                for i in 0..p {
                    ay[i] += by[i];
                    for j in 0..=i {
                        a[i][j] += b[i][j];
                    }
                }
                (a, ay)
            },
        );

    let mut xtx = xtx;
    for i in 0..p {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
    }

    let coefficients = cholesky_solve(&xtx, &xty)?;
    if coefficients.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let intercept = means[p]
        - coefficients
            .iter()
            .zip(&means[..p])
            .map(|(c, m)| c * m)
            .sum::<f64>();

    Some(LinearModel {
        coefficients,
        intercept,
    })
}

/// Solve the symmetric system `a x = b`. A matrix that is not positive
/// definite is retried once with a small ridge on the diagonal.
fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    if let Some(x) = cholesky_solve_inner(a, b) {
        return Some(x);
    }

    let n = a.len();
    let trace: f64 = (0..n).map(|i| a[i][i].abs()).sum();
    let ridge = (1e-8 * trace / n as f64).max(1e-12);
    let mut reg = a.to_vec();
    for (i, row) in reg.iter_mut().enumerate() {
        row[i] += ridge;
    }
    cholesky_solve_inner(&reg, b)
}

fn cholesky_solve_inner(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let diag = a[i][i] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[i][j] = diag.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[i][j] * y[j]).sum();
        y[i] = (b[i] - sum) / l[i][i];
    }

    // Lᵀ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[j][i] * x[j]).sum();
        x[i] = (y[i] - sum) / l[i][i];
    }

    Some(x)
}
