use crate::entities::RegressionPoint;

/// Highest polynomial degree the fitter will produce, regardless of how many
/// sample points are supplied.
pub(crate) const MAX_DEGREE: usize = 5;

/// Evaluates a polynomial with ascending-power coefficients
/// `[c0, c1, c2, …]` at `x`: `c0 + c1*x + c2*x² + …`.
pub(crate) fn evaluate(coefficients: &[f64], x: f64) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .map(|(i, c)| c * x.powi(i as i32))
        .sum()
}

/// Derives polynomial coefficients for a user-authored fee curve.
///
/// Degenerate inputs fall back to the straight line `f(x) = max_fee * x`
/// (coefficients `[0, max_fee]`):
///   - no points at all,
///   - a single point at frequency 0 (undefined slope),
///   - two points with equal frequencies (undefined slope).
///
/// One or two well-formed points produce a line through the origin; three or
/// more are fitted with a least-squares polynomial of degree
/// `min(len - 1, MAX_DEGREE)`.
pub(crate) fn fit_regression(points: &[RegressionPoint], max_fee_fraction: f64) -> Vec<f64> {
    match points {
        [] => vec![0.0, max_fee_fraction],
        [p] => {
            if p.frequency == 0.0 {
                vec![0.0, max_fee_fraction]
            } else {
                vec![0.0, p.fee_fraction / p.frequency]
            }
        }
        [p1, p2] => {
            if p2.frequency == p1.frequency {
                vec![0.0, max_fee_fraction]
            } else {
                vec![
                    0.0,
                    (p2.fee_fraction - p1.fee_fraction) / (p2.frequency - p1.frequency),
                ]
            }
        }
        _ => {
            let degree = (points.len() - 1).min(MAX_DEGREE);
            // A singular system (e.g. all points sharing one frequency) has
            // no defined curve either; fall back like the other degenerate
            // cases.
            least_squares_fit(points, degree)
                .unwrap_or_else(|| vec![0.0, max_fee_fraction])
        }
    }
}

/// Least-squares polynomial fit via the normal equations of the Vandermonde
/// system. With `degree == len - 1` this interpolates the points exactly.
fn least_squares_fit(points: &[RegressionPoint], degree: usize) -> Option<Vec<f64>> {
    let n = degree + 1;
    let mut matrix = vec![vec![0.0; n]; n];
    let mut rhs = vec![0.0; n];
    for p in points {
        for row in 0..n {
            rhs[row] += p.fee_fraction * p.frequency.powi(row as i32);
            for col in 0..n {
                matrix[row][col] += p.frequency.powi((row + col) as i32);
            }
        }
    }
    solve(matrix, rhs)
}

/// Gaussian elimination with partial pivoting. Returns `None` for a
/// (numerically) singular system.
fn solve(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| {
            matrix[a][col]
                .abs()
                .partial_cmp(&matrix[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if matrix[pivot][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);
        for row in (col + 1)..n {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let mut value = rhs[row];
        for col in (row + 1)..n {
            value -= matrix[row][col] * solution[col];
        }
        solution[row] = value / matrix[row][row];
    }
    Some(solution)
}
