//! Minimal positive integer solutions of `A·x = 0`
//!
//! Solves `min Σx  s.t.  A·x = 0, x ≥ 1, x integer` with depth-first branch and bound.
//! Relaxations are solved by a dense two-phase simplex over exact rationals.

use crate::error::BalanceError;
use crate::linalg::{denominator_lcm, to_coprime_integers, to_i64};
use crate::matrix::StoichiometryMatrix;
use log::{debug, trace};
use malachite::num::arithmetic::traits::{Ceiling, Floor};
use malachite::num::basic::traits::{One, Zero};
use malachite::{Natural, Rational};

/// Per-variable bounds of one branch and bound node
#[derive(Clone, Debug, Eq, PartialEq)]
struct Bounds {
    lower: Vec<i64>,
    upper: Vec<Option<i64>>,
}

/// Optimal point of a relaxation
#[derive(Clone, Debug, Eq, PartialEq)]
struct Relaxed {
    values: Vec<Rational>,
    objective: Rational,
}
impl Relaxed {
    fn first_fractional(&self) -> Option<usize> {
        self.values.iter().position(|v| *v.denominator_ref() != Natural::ONE)
    }
}

enum Outcome {
    Optimal,
    Unbounded,
}

/// Simplex tableau in canonical form for its basis
struct Tableau {
    rows: Vec<Vec<Rational>>,
    rhs: Vec<Rational>,
    basis: Vec<usize>,
}
impl Tableau {
    fn pivot(&mut self, row: usize, col: usize) {
        let factor = Rational::ONE / &self.rows[row][col];
        for x in self.rows[row].iter_mut() {
            *x *= &factor;
        }
        self.rhs[row] *= &factor;

        for r in 0..self.rows.len() {
            if r == row || self.rows[r][col] == Rational::ZERO {
                continue;
            }
            let f = self.rows[r][col].clone();
            for j in 0..self.rows[r].len() {
                if self.rows[row][j] == Rational::ZERO {
                    continue;
                }
                let delta = &f * &self.rows[row][j];
                self.rows[r][j] -= delta;
            }
            let delta = &f * &self.rhs[row];
            self.rhs[r] -= delta;
        }
        self.basis[row] = col;
    }

    /// Minimizes `cost·y` over the columns `0..allowed`, Bland's rule keeps it from cycling
    fn optimize(&mut self, cost: &[Rational], allowed: usize) -> Outcome {
        loop {
            let entering = (0..allowed).find(|&j| {
                if self.basis.contains(&j) {
                    return false;
                }
                let mut reduced = cost[j].clone();
                for (r, &b) in self.basis.iter().enumerate() {
                    if self.rows[r][j] != Rational::ZERO {
                        reduced -= &cost[b] * &self.rows[r][j];
                    }
                }
                reduced < Rational::ZERO
            });
            let col = match entering {
                Some(col) => col,
                None => return Outcome::Optimal,
            };

            let mut leaving: Option<(usize, Rational)> = None;
            for r in 0..self.rows.len() {
                if self.rows[r][col] <= Rational::ZERO {
                    continue;
                }
                let ratio = &self.rhs[r] / &self.rows[r][col];
                let better = match &leaving {
                    None => true,
                    Some((best_r, best)) => ratio < *best || (ratio == *best && self.basis[r] < self.basis[*best_r]),
                };
                if better {
                    leaving = Some((r, ratio));
                }
            }
            match leaving {
                Some((row, _)) => self.pivot(row, col),
                None => return Outcome::Unbounded,
            }
        }
    }

    fn objective(&self, cost: &[Rational]) -> Rational {
        let mut total = Rational::ZERO;
        for (r, &b) in self.basis.iter().enumerate() {
            total += &cost[b] * &self.rhs[r];
        }
        total
    }
}

/// Solves the linear relaxation of one node
/// Variables are shifted by their lower bounds (`x = l + y`, `y ≥ 0`); upper bounds and the
/// objective cap become equality rows with their own slack variable
fn relax(matrix: &StoichiometryMatrix, bounds: &Bounds, cap: Option<i64>) -> Option<Relaxed> {
    let n = matrix.species_count();
    let lower_sum: i64 = bounds.lower.iter().sum();

    let mut equations: Vec<(Vec<Rational>, Rational)> = Vec::new();
    for row in matrix.rows() {
        let shift: i64 = row.iter().zip(bounds.lower.iter()).map(|(a, l)| a * l).sum();
        let coefficients = row.iter().map(|&a| Rational::from(a)).collect::<Vec<Rational>>();
        equations.push((coefficients, Rational::from(-shift)));
    }
    let mut upper_rows: Vec<(usize, i64)> = Vec::new();
    for (i, upper) in bounds.upper.iter().enumerate() {
        if let Some(u) = upper {
            let room = u - bounds.lower[i];
            if room < 0 {
                return None;
            }
            upper_rows.push((i, room));
        }
    }
    if let Some(cap) = cap {
        if cap < lower_sum {
            return None;
        }
    }

    // columns: y (n), one slack per upper bound, one slack for the cap, then artificials
    let slack_count = upper_rows.len() + usize::from(cap.is_some());
    let structural = n + slack_count;
    let mut rows: Vec<Vec<Rational>> = Vec::new();
    let mut rhs: Vec<Rational> = Vec::new();
    for (coefficients, value) in equations {
        let mut row = coefficients;
        row.resize(structural, Rational::ZERO);
        rows.push(row);
        rhs.push(value);
    }
    for (k, &(i, room)) in upper_rows.iter().enumerate() {
        let mut row = vec![Rational::ZERO; structural];
        row[i] = Rational::ONE;
        row[n + k] = Rational::ONE;
        rows.push(row);
        rhs.push(Rational::from(room));
    }
    if let Some(cap) = cap {
        let mut row = vec![Rational::ONE; n];
        row.resize(structural, Rational::ZERO);
        row[structural - 1] = Rational::ONE;
        rows.push(row);
        rhs.push(Rational::from(cap - lower_sum));
    }

    // phase one: artificial basis, right hand sides made non-negative
    let m = rows.len();
    for (r, row) in rows.iter_mut().enumerate() {
        if rhs[r] < Rational::ZERO {
            for x in row.iter_mut() {
                *x = -x.clone();
            }
            rhs[r] = -rhs[r].clone();
        }
        row.resize(structural + m, Rational::ZERO);
        row[structural + r] = Rational::ONE;
    }
    let mut tableau = Tableau {
        rows,
        rhs,
        basis: (structural..structural + m).collect(),
    };
    let mut phase_one = vec![Rational::ZERO; structural + m];
    for c in phase_one.iter_mut().skip(structural) {
        *c = Rational::ONE;
    }
    if let Outcome::Unbounded = tableau.optimize(&phase_one, structural + m) {
        return None;
    }
    if tableau.objective(&phase_one) != Rational::ZERO {
        return None;
    }

    // drive remaining artificials out of the basis, rows without a structural entry are redundant
    let mut r = 0;
    while r < tableau.rows.len() {
        if tableau.basis[r] < structural {
            r += 1;
            continue;
        }
        match (0..structural).find(|&j| tableau.rows[r][j] != Rational::ZERO) {
            Some(col) => {
                tableau.pivot(r, col);
                r += 1;
            }
            None => {
                tableau.rows.remove(r);
                tableau.rhs.remove(r);
                tableau.basis.remove(r);
            }
        }
    }

    // phase two: minimize Σy, costs are non-negative so the optimum is finite
    let mut cost = vec![Rational::ZERO; structural + m];
    for c in cost.iter_mut().take(n) {
        *c = Rational::ONE;
    }
    if let Outcome::Unbounded = tableau.optimize(&cost, structural) {
        return None;
    }

    let mut values = bounds.lower.iter().map(|&l| Rational::from(l)).collect::<Vec<Rational>>();
    for (r, &b) in tableau.basis.iter().enumerate() {
        if b < n {
            values[b] += &tableau.rhs[r];
        }
    }
    let objective = tableau.objective(&cost) + Rational::from(lower_sum);
    Some(Relaxed { values, objective })
}

fn to_integers(values: &[Rational]) -> Result<Vec<i64>, BalanceError> {
    values.iter().map(to_i64).collect()
}

/// Finds the positive integer solution of `A·x = 0` with the smallest coefficient sum
/// # Arguments
/// * `matrix` - conservation equations
/// * `max_nodes` - limit of branch and bound nodes
/// # Returns
/// * `Ok` - coefficients, every entry ≥ 1
/// * `Err` - `Infeasible` if no positive solution exists, `SearchLimitExceeded` if the limit is hit
/// # Example
/// ```
/// use stoich_balance::{minimize_positive, StoichiometryMatrix};
///
/// // Fe + O2 -> FeO + Fe2O3 over rows O and Fe
/// let matrix = StoichiometryMatrix::from_rows(vec![vec![0, -2, 1, 3], vec![-1, 0, 1, 2]], 2, 4);
///
/// assert_eq!(minimize_positive(&matrix, 1000).unwrap(), vec![3, 2, 1, 1]);
/// ```
pub fn minimize_positive(matrix: &StoichiometryMatrix, max_nodes: usize) -> Result<Vec<i64>, BalanceError> {
    let n = matrix.species_count();
    let root = Bounds {
        lower: vec![1; n],
        upper: vec![None; n],
    };

    let relaxed = relax(matrix, &root, None).ok_or(BalanceError::Infeasible)?;
    if relaxed.first_fractional().is_none() {
        debug!("relaxation is integral, objective {}", relaxed.objective);
        return to_integers(&relaxed.values);
    }

    // scaling the relaxed vertex gives a first feasible integer point
    let lcm = denominator_lcm(relaxed.values.iter());
    let scaled = relaxed
        .values
        .iter()
        .map(|v| v * Rational::from(&lcm))
        .collect::<Vec<Rational>>();
    let mut best = to_integers(&to_coprime_integers(&scaled))?;
    let mut best_sum: i64 = best.iter().sum();
    debug!("relaxation objective {}, first incumbent sum {}", relaxed.objective, best_sum);

    let mut stack = vec![root];
    let mut nodes = 0;
    while let Some(node) = stack.pop() {
        nodes += 1;
        if nodes > max_nodes {
            return Err(BalanceError::SearchLimitExceeded { limit: max_nodes });
        }

        // only strictly better points are of interest
        let relaxed = match relax(matrix, &node, Some(best_sum - 1)) {
            Some(relaxed) => relaxed,
            None => continue,
        };
        let i = match relaxed.first_fractional() {
            Some(i) => i,
            None => {
                best = to_integers(&relaxed.values)?;
                best_sum = best.iter().sum();
                trace!("incumbent improved to sum {} at node {}", best_sum, nodes);
                continue;
            }
        };

        let value = &relaxed.values[i];
        let floor = to_i64(&Rational::from(value.floor()))?;
        let ceiling = to_i64(&Rational::from(value.ceiling()))?;

        let mut up = node.clone();
        up.lower[i] = ceiling;
        let mut down = node;
        down.upper[i] = Some(floor);
        // the lower branch is explored first
        stack.push(up);
        stack.push(down);
    }

    debug!("branch and bound finished after {} nodes, minimal sum {}", nodes, best_sum);
    Ok(best)
}
