use crate::linalg::{gaussian_elimination, rational_gcd, reduce_row_echelon, to_rational};
use crate::matrix::StoichiometryMatrix;
use log::{debug, trace};
use malachite::num::basic::traits::{One, Zero};
use malachite::Rational;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Free parameter of a parametric solution, displayed as `x1`, `x2`, ...
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Symbol(pub usize);
impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Hands out numbered symbols, starting from `x1`
/// Lives only for one solve, there is no global numbering
#[derive(Debug, Default)]
pub struct SymbolAllocator {
    issued: usize,
}
impl SymbolAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Symbol {
        self.issued += 1;
        Symbol(self.issued)
    }
}

/// Affine expression `constant + Σ coefficient·symbol` over rationals
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParametricExpr {
    pub constant: Rational,
    pub terms: BTreeMap<Symbol, Rational>,
}
impl ParametricExpr {
    pub fn zero() -> Self {
        Self {
            constant: Rational::ZERO,
            terms: BTreeMap::new(),
        }
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Self {
            constant: Rational::ZERO,
            terms: BTreeMap::from([(symbol, Rational::ONE)]),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.constant == Rational::ZERO && self.terms.is_empty()
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coefficient(&self, symbol: Symbol) -> Option<&Rational> {
        self.terms.get(&symbol)
    }

    /// Replaces `symbol` by the constant 1
    fn fix_to_one(&mut self, symbol: Symbol) {
        if let Some(coefficient) = self.terms.remove(&symbol) {
            self.constant += coefficient;
        }
    }

    /// Replaces `symbol` by `symbol / divisor`
    fn rescale(&mut self, symbol: Symbol, divisor: &Rational) {
        if let Some(coefficient) = self.terms.get_mut(&symbol) {
            *coefficient /= divisor;
        }
    }

    /// Multiplies the whole expression by `factor`
    fn scale(&mut self, factor: &Rational) {
        self.constant *= factor;
        for coefficient in self.terms.values_mut() {
            *coefficient *= factor;
        }
    }
}

/// Solution space of `A·x = 0`, one expression per species column
/// With no surviving symbols the constants give the unique solution up to scale
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParametricSolution {
    exprs: Vec<ParametricExpr>,
    symbols: Vec<Symbol>,
    equations: StoichiometryMatrix,
}
impl ParametricSolution {
    pub fn exprs(&self) -> &[ParametricExpr] {
        &self.exprs
    }

    /// Surviving free symbols in increasing order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// The equations this solution solves
    pub fn equations(&self) -> &StoichiometryMatrix {
        &self.equations
    }

    pub fn is_unique(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Only the zero vector solves the system
    pub fn is_trivial(&self) -> bool {
        self.exprs.iter().all(|e| e.is_zero())
    }

    /// Constant parts of the expressions
    pub fn constants(&self) -> Vec<Rational> {
        self.exprs.iter().map(|e| e.constant.clone()).collect()
    }
}

/// Computes the parametric solution of `A·x = 0` in exact arithmetic
/// # Arguments
/// * `matrix` - conservation equations of the reaction
/// # Returns
/// * `ParametricSolution` - overall scale is fixed, the remaining free symbols describe the under-determined part
/// # Example
/// ```
/// use stoich_balance::{solve, StoichiometryMatrix};
/// use malachite::Rational;
///
/// // H2 + O2 -> H2O over rows H and O
/// let matrix = StoichiometryMatrix::from_rows(vec![vec![-2, 0, 2], vec![0, -2, 1]], 2, 3);
/// let solution = solve(&matrix);
///
/// assert!(solution.is_unique());
/// assert_eq!(solution.constants(), vec![Rational::from(2), Rational::from(1), Rational::from(2)]);
/// assert!(solution.exprs().iter().all(|e| e.is_constant()));
/// ```
pub fn solve(matrix: &StoichiometryMatrix) -> ParametricSolution {
    let m = matrix.component_count();
    let n = matrix.species_count();

    let mut reduced = to_rational(matrix.rows());
    let pivots = gaussian_elimination(&mut reduced, m, n);
    reduce_row_echelon(&mut reduced, &pivots);

    // one symbol per column, the last column gets x1
    let mut allocator = SymbolAllocator::new();
    let mut column_symbols = (0..n).map(|_| allocator.fresh()).collect::<Vec<Symbol>>();
    column_symbols.reverse();

    let mut exprs = vec![ParametricExpr::zero(); n];
    let mut is_pivot = vec![false; n];
    for (row, &p) in pivots.iter().enumerate() {
        is_pivot[p] = true;
        let mut expr = ParametricExpr::zero();
        for col in (p + 1)..n {
            if reduced[row][col] != Rational::ZERO {
                expr.terms.insert(column_symbols[col], -reduced[row][col].clone());
            }
        }
        exprs[p] = expr;
    }
    for col in 0..n {
        if !is_pivot[col] {
            exprs[col] = ParametricExpr::symbol(column_symbols[col]);
        }
    }
    // pivot rows may only reference free columns after the reduction
    debug_assert!(exprs.iter().all(|e| e.terms.keys().all(|s| {
        let col = column_symbols.iter().position(|c| c == s);
        col.map(|c| !is_pivot[c]).unwrap_or(false)
    })));

    debug!("rank {} of {} species, {} free symbols before reduction", pivots.len(), n, n - pivots.len());

    let mut solution = ParametricSolution {
        exprs,
        symbols: Vec::new(),
        equations: matrix.clone(),
    };
    normalize_symbols(&mut solution);
    eliminate_scale(&mut solution, &column_symbols);
    normalize_symbols(&mut solution);
    solution.symbols = surviving_symbols(&solution.exprs);

    trace!("parametric solution {:?}", solution.exprs);
    solution
}

/// Back-substitutes the first symbol that alone fixes the ratio of some species
/// Stops as soon as any expression carries a constant term, the scale is fixed then
fn eliminate_scale(solution: &mut ParametricSolution, column_symbols: &[Symbol]) {
    for &symbol in column_symbols {
        if solution.exprs.iter().any(|e| e.constant != Rational::ZERO) {
            break;
        }
        let fixes_ratio = solution
            .exprs
            .iter()
            .any(|e| e.constant == Rational::ZERO && e.terms.len() == 1 && e.terms.contains_key(&symbol));
        if fixes_ratio {
            trace!("fixing {} to 1", symbol);
            for expr in solution.exprs.iter_mut() {
                expr.fix_to_one(symbol);
            }
        }
    }
}

/// Reparametrizes every surviving symbol so its coefficients are coprime integers
fn normalize_symbols(solution: &mut ParametricSolution) {
    for symbol in surviving_symbols(&solution.exprs) {
        let gcd = rational_gcd(solution.exprs.iter().filter_map(|e| e.coefficient(symbol)));
        if gcd != Rational::ZERO && gcd != Rational::ONE {
            for expr in solution.exprs.iter_mut() {
                expr.rescale(symbol, &gcd);
            }
        }
    }
}

fn surviving_symbols(exprs: &[ParametricExpr]) -> Vec<Symbol> {
    let mut symbols = exprs
        .iter()
        .flat_map(|e| e.terms.keys().copied())
        .collect::<Vec<Symbol>>();
    symbols.sort();
    symbols.dedup();
    symbols
}

/// Scales the whole family so the constants are coprime integers, then renormalizes the symbols
/// The result describes the same solutions with integer data
pub(crate) fn integral_family(solution: &ParametricSolution) -> Vec<ParametricExpr> {
    let mut family = solution.clone();
    let gcd = rational_gcd(family.exprs.iter().map(|e| &e.constant));
    if gcd != Rational::ZERO {
        let factor = Rational::ONE / gcd;
        for expr in family.exprs.iter_mut() {
            expr.scale(&factor);
        }
    }
    normalize_symbols(&mut family);
    family.exprs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn r(s: &str) -> Rational {
        Rational::from_str(s).unwrap()
    }

    #[test]
    fn allocator_counts_from_one() {
        let mut allocator = SymbolAllocator::new();
        assert_eq!(allocator.fresh(), Symbol(1));
        assert_eq!(allocator.fresh(), Symbol(2));
        assert_eq!(Symbol(2).to_string(), "x2");
    }

    #[test]
    fn unique_solution_has_integer_constants() {
        // C2H6 + O2 -> CO2 + H2O over rows H, C, O
        let matrix = StoichiometryMatrix::from_rows(
            vec![vec![-6, 0, 0, 2], vec![-2, 0, 1, 0], vec![0, -2, 2, 1]],
            2,
            4,
        );
        let solution = solve(&matrix);

        assert!(solution.is_unique());
        assert!(!solution.is_trivial());
        assert_eq!(solution.constants(), vec![r("2"), r("7"), r("4"), r("6")]);
    }

    #[test]
    fn under_determined_keeps_one_symbol() {
        // Fe + O2 -> FeO + Fe2O3 over rows O and Fe
        let matrix = StoichiometryMatrix::from_rows(vec![vec![0, -2, 1, 3], vec![-1, 0, 1, 2]], 2, 4);
        let solution = solve(&matrix);

        // the first free column (FeO) is fixed to 1, Fe2O3 keeps x1
        assert_eq!(solution.symbols(), &[Symbol(1)]);
        assert_eq!(solution.constants(), vec![r("2"), r("1"), r("2"), r("0")]);
        let x1: Vec<Option<&Rational>> = solution.exprs().iter().map(|e| e.coefficient(Symbol(1))).collect();
        assert_eq!(x1, vec![Some(&r("4")), Some(&r("3")), None, Some(&r("2"))]);
    }

    #[test]
    fn integral_family_clears_constants() {
        let matrix = StoichiometryMatrix::from_rows(vec![vec![0, -2, 1, 3], vec![-1, 0, 1, 2]], 2, 4);
        let family = integral_family(&solve(&matrix));

        let constants: Vec<Rational> = family.iter().map(|e| e.constant.clone()).collect();
        assert_eq!(constants, vec![r("2"), r("1"), r("2"), r("0")]);
        let x1: Vec<Option<&Rational>> = family.iter().map(|e| e.coefficient(Symbol(1))).collect();
        assert_eq!(x1, vec![Some(&r("4")), Some(&r("3")), None, Some(&r("2"))]);
    }

    #[test]
    fn full_rank_is_trivial() {
        // CO -> CO2 over rows C and O
        let matrix = StoichiometryMatrix::from_rows(vec![vec![-1, 1], vec![-1, 2]], 1, 2);
        let solution = solve(&matrix);

        assert!(solution.is_trivial());
        assert!(solution.is_unique());
    }
}
