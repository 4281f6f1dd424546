use crate::error::BalanceError;
use crate::ilp::minimize_positive;
use crate::linalg::{to_coprime_integers, to_i64};
use crate::nullspace::{integral_family, ParametricSolution, Symbol};
use crate::options::Mode;
use log::debug;
use malachite::num::basic::traits::Zero;
use malachite::Rational;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Integer affine expression `constant + Σ coefficient·symbol`
/// Substituting non-negative integers for the symbols gives a balanced set of coefficients
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct LinearExpr {
    pub constant: i64,
    pub terms: BTreeMap<Symbol, i64>,
}
impl LinearExpr {
    pub fn constant(value: i64) -> Self {
        Self {
            constant: value,
            terms: BTreeMap::new(),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Substitutes values for the symbols, missing symbols count as 0
    /// Fails with `Overflow` if the value leaves `i64`
    pub fn evaluate(&self, assignment: &BTreeMap<Symbol, i64>) -> Result<i64, BalanceError> {
        self.terms.iter().try_fold(self.constant, |value, (s, c)| {
            c.checked_mul(assignment.get(s).copied().unwrap_or(0))
                .and_then(|term| value.checked_add(term))
                .ok_or(BalanceError::Overflow)
        })
    }
}
impl Display for LinearExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.constant != 0 || self.terms.is_empty() {
            parts.push(self.constant.to_string());
        }
        for (symbol, coefficient) in self.terms.iter() {
            match coefficient {
                1 => parts.push(symbol.to_string()),
                -1 => parts.push(format!("-{}", symbol)),
                c => parts.push(format!("{}{}", c, symbol)),
            }
        }
        write!(f, "{}", parts.join(" + ").replace("+ -", "- "))
    }
}

/// Reduces a parametric solution to strictly positive integer coefficients
/// # Arguments
/// * `solution` - output of `solve`
/// * `mode` - `Exact` rejects free symbols, `IntegerMinimal` searches the smallest coefficient sum
/// * `max_search_nodes` - node limit of the integer search
/// # Returns
/// * `Ok` - one coefficient per species column
/// * `Err` - `Infeasible`, `UnderDetermined` or `SignError`
/// # Example
/// ```
/// use stoich_balance::{canonicalize, solve, Mode, StoichiometryMatrix};
///
/// // C2H6 + O2 -> CO2 + H2O over rows H, C and O
/// let matrix = StoichiometryMatrix::from_rows(
///     vec![vec![-6, 0, 0, 2], vec![-2, 0, 1, 0], vec![0, -2, 2, 1]],
///     2,
///     4,
/// );
///
/// assert_eq!(canonicalize(&solve(&matrix), Mode::Exact, 0).unwrap(), vec![2, 7, 4, 6]);
/// ```
pub fn canonicalize(solution: &ParametricSolution, mode: Mode, max_search_nodes: usize) -> Result<Vec<i64>, BalanceError> {
    if solution.is_trivial() {
        return Err(BalanceError::Infeasible);
    }
    if solution.is_unique() {
        return unique_coefficients(solution);
    }

    match mode {
        Mode::Exact => Err(BalanceError::UnderDetermined {
            free: solution.symbols().len(),
        }),
        Mode::IntegerMinimal => {
            debug!("{} free symbols, searching minimal integer solution", solution.symbols().len());
            minimize_positive(solution.equations(), max_search_nodes)
        }
    }
}

/// Coprime positive integers along the unique solution line
fn unique_coefficients(solution: &ParametricSolution) -> Result<Vec<i64>, BalanceError> {
    let coefficients = to_coprime_integers(&solution.constants());
    if let Some(column) = coefficients.iter().position(|x| *x <= Rational::ZERO) {
        return Err(BalanceError::SignError { column });
    }
    coefficients.iter().map(to_i64).collect()
}

/// Returns the general solution family with integer data
/// A unique solution comes back as constants, identical to `canonicalize` in `Exact` mode
/// # Example
/// ```
/// use stoich_balance::{canonicalize_symbolic, solve, StoichiometryMatrix, Symbol};
///
/// // Fe + O2 -> FeO + Fe2O3 over rows O and Fe
/// let matrix = StoichiometryMatrix::from_rows(vec![vec![0, -2, 1, 3], vec![-1, 0, 1, 2]], 2, 4);
/// let family = canonicalize_symbolic(&solve(&matrix)).unwrap();
///
/// let shown = family.iter().map(|e| e.to_string()).collect::<Vec<_>>();
/// assert_eq!(shown, ["2 + 4x1", "1 + 3x1", "2", "2x1"]);
/// ```
pub fn canonicalize_symbolic(solution: &ParametricSolution) -> Result<Vec<LinearExpr>, BalanceError> {
    if solution.is_trivial() {
        return Err(BalanceError::Infeasible);
    }
    if solution.is_unique() {
        return Ok(unique_coefficients(solution)?.into_iter().map(LinearExpr::constant).collect());
    }

    integral_family(solution)
        .iter()
        .map(|expr| {
            let terms = expr
                .terms
                .iter()
                .map(|(s, c)| Ok((*s, to_i64(c)?)))
                .collect::<Result<BTreeMap<Symbol, i64>, BalanceError>>()?;
            Ok(LinearExpr {
                constant: to_i64(&expr.constant)?,
                terms,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::StoichiometryMatrix;
    use crate::nullspace::solve;

    fn iron_oxides() -> StoichiometryMatrix {
        StoichiometryMatrix::from_rows(vec![vec![0, -2, 1, 3], vec![-1, 0, 1, 2]], 2, 4)
    }

    #[test]
    fn exact_rejects_free_symbols() {
        assert_eq!(
            canonicalize(&solve(&iron_oxides()), Mode::Exact, 100),
            Err(BalanceError::UnderDetermined { free: 1 })
        );
    }

    #[test]
    fn integer_minimal_picks_smallest_sum() {
        assert_eq!(
            canonicalize(&solve(&iron_oxides()), Mode::IntegerMinimal, 100),
            Ok(vec![3, 2, 1, 1])
        );
    }

    #[test]
    fn trivial_null_space_is_infeasible() {
        let matrix = StoichiometryMatrix::from_rows(vec![vec![-1, 1], vec![-1, 2]], 1, 2);
        for mode in [Mode::Exact, Mode::IntegerMinimal] {
            assert_eq!(canonicalize(&solve(&matrix), mode, 100), Err(BalanceError::Infeasible));
        }
        assert_eq!(canonicalize_symbolic(&solve(&matrix)), Err(BalanceError::Infeasible));
    }

    #[test]
    fn mixed_signs_are_a_sign_error() {
        // CO2 -> C + CO: the only solution line needs -1 C
        let matrix = StoichiometryMatrix::from_rows(vec![vec![-1, 1, 1], vec![-2, 0, 1]], 1, 3);
        assert_eq!(
            canonicalize(&solve(&matrix), Mode::IntegerMinimal, 100),
            Err(BalanceError::SignError { column: 1 })
        );
    }

    #[test]
    fn symbolic_family_evaluates_to_balanced_points() {
        let matrix = iron_oxides();
        let family = canonicalize_symbolic(&solve(&matrix)).unwrap();

        for t in 0..4 {
            let x = family
                .iter()
                .map(|e| e.evaluate(&BTreeMap::from([(Symbol(1), t)])))
                .collect::<Result<Vec<i64>, BalanceError>>()
                .unwrap();
            assert_eq!(matrix.residuals(&x), Ok(vec![0, 0]));
        }
    }

    #[test]
    fn evaluate_overflow() {
        let expr = LinearExpr {
            constant: 1,
            terms: BTreeMap::from([(Symbol(1), 2)]),
        };
        assert_eq!(expr.evaluate(&BTreeMap::from([(Symbol(1), i64::MAX / 2)])), Ok(i64::MAX));
        assert_eq!(expr.evaluate(&BTreeMap::from([(Symbol(1), i64::MAX / 2 + 1)])), Err(BalanceError::Overflow));
        assert_eq!(expr.evaluate(&BTreeMap::from([(Symbol(1), i64::MAX)])), Err(BalanceError::Overflow));
    }

    #[test]
    fn display() {
        let expr = LinearExpr {
            constant: 0,
            terms: BTreeMap::from([(Symbol(1), -1), (Symbol(2), 3)]),
        };
        assert_eq!(expr.to_string(), "-x1 + 3x2");
        assert_eq!(LinearExpr::constant(0).to_string(), "0");
        assert_eq!(
            LinearExpr { constant: 5, terms: BTreeMap::from([(Symbol(3), -2)]) }.to_string(),
            "5 - 2x3"
        );
    }
}
