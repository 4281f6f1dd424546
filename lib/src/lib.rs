//! Exact stoichiometry balancing of chemical reactions
//!
//! Species are opaque keys, their compositions come from a [`CompositionLookup`].
//! The conservation equations are solved over rationals, the solution is reduced
//! to the smallest positive integer coefficients and checked before it is returned.
//!
//! ```
//! use stoich_balance::{balance, BalanceOptions, Composition};
//! use std::collections::HashMap;
//!
//! let species = HashMap::from([
//!     ("C2H6", Composition::from_symbols([("C", 2), ("H", 6)]).unwrap()),
//!     ("O2", Composition::from_symbols([("O", 2)]).unwrap()),
//!     ("CO2", Composition::from_symbols([("C", 1), ("O", 2)]).unwrap()),
//!     ("H2O", Composition::from_symbols([("H", 2), ("O", 1)]).unwrap()),
//! ]);
//!
//! let balanced = balance(&["C2H6", "O2"], &["H2O", "CO2"], &species, &BalanceOptions::default()).unwrap();
//! assert_eq!(balanced.reactants.values().collect::<Vec<_>>(), [&2, &7]);
//! assert_eq!(balanced.products.values().collect::<Vec<_>>(), [&4, &6]);
//! ```

mod balance;
mod canonical;
mod composition;
mod duplicates;
mod error;
mod ilp;
mod linalg;
mod matrix;
mod nullspace;
mod options;
mod validate;

pub use balance::{balance, balance_parametric, Balanced, CoefficientMap};
pub use canonical::{canonicalize, canonicalize_symbolic, LinearExpr};
pub use composition::{Component, Composition, CompositionLookup};
pub use duplicates::resolve_duplicates;
pub use error::{BalanceError, Side};
pub use ilp::minimize_positive;
pub use matrix::{build, StoichiometryMatrix};
pub use nullspace::{solve, ParametricExpr, ParametricSolution, Symbol, SymbolAllocator};
pub use options::{BalanceOptions, Mode};
pub use validate::{composition_violation, validate};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(counts: &[(&str, i64)]) -> Composition {
        Composition::from_symbols(counts.iter().copied()).unwrap()
    }

    fn species() -> HashMap<&'static str, Composition> {
        HashMap::from([
            ("NH4ClO4", parse(&[("N", 1), ("H", 4), ("Cl", 1), ("O", 4)])),
            ("Al", parse(&[("Al", 1)])),
            ("Al2O3", parse(&[("Al", 2), ("O", 3)])),
            ("HCl", parse(&[("H", 1), ("Cl", 1)])),
            ("H2O", parse(&[("H", 2), ("O", 1)])),
            ("N2", parse(&[("N", 2)])),
            ("Na2CO3", parse(&[("Na", 2), ("C", 1), ("O", 3)])),
            ("HCl(aq)", parse(&[("H", 1), ("Cl", 1)])),
            ("NaCl", parse(&[("Na", 1), ("Cl", 1)])),
            ("CO2", parse(&[("C", 1), ("O", 2)])),
            ("Zn+2", parse(&[("Zn", 1)]).with_charge(2).unwrap()),
            ("e-", Composition::new().with_charge(-1).unwrap()),
            ("Zn", parse(&[("Zn", 1)])),
        ])
    }

    fn test_reaction(reactants: &[&'static str], products: &[&'static str], expected: &[i64]) {
        let balanced = balance(reactants, products, &species(), &BalanceOptions::default()).unwrap();
        let coefficients = reactants
            .iter()
            .chain(products.iter())
            .map(|k| *balanced.coefficient(k).unwrap())
            .collect::<Vec<i64>>();

        assert_eq!(coefficients, expected);
    }

    #[test]
    fn ammonium_perchlorate() {
        test_reaction(&["NH4ClO4", "Al"], &["Al2O3", "HCl", "H2O", "N2"], &[6, 10, 5, 6, 9, 3]);
    }

    #[test]
    fn carbonate_with_acid() {
        test_reaction(&["Na2CO3", "HCl(aq)"], &["NaCl", "H2O", "CO2"], &[1, 2, 2, 1, 1]);
    }

    #[test]
    fn reduction_with_electrons() {
        test_reaction(&["Zn+2", "e-"], &["Zn"], &[1, 2, 1]);
    }

    #[test]
    fn exact_and_minimal_agree_on_unique_reactions() {
        let exact = BalanceOptions::default().with_mode(Mode::Exact);
        let minimal = BalanceOptions::default();
        let reactants = ["NH4ClO4", "Al"];
        let products = ["Al2O3", "HCl", "H2O", "N2"];

        assert_eq!(
            balance(&reactants, &products, &species(), &exact),
            balance(&reactants, &products, &species(), &minimal)
        );
    }
}
