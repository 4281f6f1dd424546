use crate::composition::{resolve, Component, Composition, CompositionLookup};
use crate::error::{BalanceError, Side};
use log::debug;
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Matrix of the conservation equations of a reaction
/// Rows are components, columns are species (reactants first, then products)
/// Entries of reactant columns have flipped sign, so balanced coefficients `x` satisfy `A·x = 0`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoichiometryMatrix {
    rows: Vec<Vec<i64>>,
    reactant_count: usize,
    species_count: usize,
}
impl StoichiometryMatrix {
    /// Creates the matrix from raw rows
    /// # Arguments
    /// * `rows` - one row per component, every row has `species_count` entries
    /// * `reactant_count` - number of leading columns that belong to reactants
    /// * `species_count` - number of columns
    pub fn from_rows(rows: Vec<Vec<i64>>, reactant_count: usize, species_count: usize) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == species_count));
        Self {
            rows,
            reactant_count,
            species_count,
        }
    }

    pub fn rows(&self) -> &[Vec<i64>] {
        &self.rows
    }

    pub fn component_count(&self) -> usize {
        self.rows.len()
    }

    pub fn species_count(&self) -> usize {
        self.species_count
    }

    pub fn reactant_count(&self) -> usize {
        self.reactant_count
    }

    /// Returns `A·x`, one residual per component, or `Overflow` if a residual leaves `i64`
    pub fn residuals(&self, x: &[i64]) -> Result<Vec<i64>, BalanceError> {
        self.rows
            .iter()
            .map(|row| {
                row.iter().zip(x).try_fold(0i64, |sum, (a, b)| {
                    a.checked_mul(*b)
                        .and_then(|term| sum.checked_add(term))
                        .ok_or(BalanceError::Overflow)
                })
            })
            .collect()
    }
}

/// Builds the conservation equations for the given reactants and products
/// # Arguments
/// * `reactant_keys` - reactants in column order
/// * `product_keys` - products in column order, disjoint from `reactant_keys`
/// * `lookup` - source of the compositions
/// # Returns
/// * `Ok` - sorted components (row order) and the matrix
/// * `Err` - `UnknownSpecies` for unresolvable keys, `InfeasibleSystem` if a component can not be conserved
/// # Example
/// ```
/// use stoich_balance::{build, Composition};
/// use std::collections::HashMap;
///
/// let species = HashMap::from([
///     ("H2", Composition::from_symbols([("H", 2)]).unwrap()),
///     ("O2", Composition::from_symbols([("O", 2)]).unwrap()),
///     ("H2O", Composition::from_symbols([("H", 2), ("O", 1)]).unwrap()),
/// ]);
///
/// let (components, matrix) = build(&["H2", "O2"], &["H2O"], &species).unwrap();
///
/// assert_eq!(components.iter().map(|c| c.to_string()).collect::<Vec<_>>(), ["H", "O"]);
/// assert_eq!(matrix.rows(), &[vec![-2, 0, 2], vec![0, -2, 1]]);
/// ```
pub fn build<K, L>(
    reactant_keys: &[K],
    product_keys: &[K],
    lookup: &L,
) -> Result<(Vec<Component>, StoichiometryMatrix), BalanceError>
where
    K: Debug,
    L: CompositionLookup<K> + ?Sized,
{
    let reactants = reactant_keys
        .iter()
        .map(|k| resolve(lookup, k))
        .collect::<Result<Vec<Composition>, BalanceError>>()?;
    let products = product_keys
        .iter()
        .map(|k| resolve(lookup, k))
        .collect::<Result<Vec<Composition>, BalanceError>>()?;

    // BTreeSet keeps the canonical component order, which is the row order
    let components = reactants
        .iter()
        .chain(products.iter())
        .flat_map(|c| c.components().cloned())
        .collect::<BTreeSet<Component>>()
        .into_iter()
        .collect::<Vec<Component>>();

    for component in components.iter() {
        check_side(component, &reactants, &products, Side::Reactants)?;
        check_side(component, &products, &reactants, Side::Products)?;
    }

    let rows = components
        .iter()
        .map(|component| {
            reactants
                .iter()
                .map(|c| c.get(component).checked_neg().ok_or(BalanceError::Overflow))
                .chain(products.iter().map(|c| Ok(c.get(component))))
                .collect::<Result<Vec<i64>, BalanceError>>()
        })
        .collect::<Result<Vec<Vec<i64>>, BalanceError>>()?;

    debug!(
        "built {}x{} stoichiometry matrix over components {:?}",
        rows.len(),
        reactants.len() + products.len(),
        components.iter().map(|c| c.to_string()).collect::<Vec<_>>()
    );

    let species_count = reactants.len() + products.len();
    Ok((components, StoichiometryMatrix::from_rows(rows, reactants.len(), species_count)))
}

/// A component missing from `side` is tolerated only if it appears with both signs on the other side
fn check_side(
    component: &Component,
    side: &[Composition],
    other: &[Composition],
    side_kind: Side,
) -> Result<(), BalanceError> {
    if side.iter().any(|c| c.get(component) != 0) {
        return Ok(());
    }
    let any_pos = other.iter().any(|c| c.get(component) > 0);
    let any_neg = other.iter().any(|c| c.get(component) < 0);
    if any_pos && any_neg {
        return Ok(());
    }
    Err(BalanceError::InfeasibleSystem {
        component: component.clone(),
        side: side_kind,
    })
}
