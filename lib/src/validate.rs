use crate::balance::Balanced;
use crate::canonical::LinearExpr;
use crate::composition::{resolve, Component, CompositionLookup};
use crate::error::BalanceError;
use log::warn;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Net amount of every component, reactant side minus product side
/// A balanced reaction has only zero entries
/// # Arguments
/// * `balanced` - coefficients of both sides
/// * `lookup` - source of the compositions
/// # Returns
/// * `Ok` - residual per component appearing in any species, sorted like the matrix rows
/// * `Err` - `UnknownSpecies` if a key can not be resolved
/// # Example
/// ```
/// use stoich_balance::{composition_violation, Balanced, Component, Composition};
/// use std::collections::{BTreeMap, HashMap};
///
/// let species = HashMap::from([
///     ("H2", Composition::from_symbols([("H", 2)]).unwrap()),
///     ("O2", Composition::from_symbols([("O", 2)]).unwrap()),
///     ("H2O", Composition::from_symbols([("H", 2), ("O", 1)]).unwrap()),
/// ]);
/// let unbalanced = Balanced {
///     reactants: BTreeMap::from([("H2", 1), ("O2", 1)]),
///     products: BTreeMap::from([("H2O", 1)]),
/// };
///
/// let violation = composition_violation(&unbalanced, &species).unwrap();
/// assert_eq!(violation[&Component::element("H").unwrap()], 0);
/// assert_eq!(violation[&Component::element("O").unwrap()], 1);
/// ```
pub fn composition_violation<K, L>(balanced: &Balanced<K>, lookup: &L) -> Result<BTreeMap<Component, i64>, BalanceError>
where
    K: Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    let mut net = BTreeMap::new();
    for (sign, side) in [(1, &balanced.reactants), (-1, &balanced.products)] {
        for (key, coefficient) in side.iter() {
            for (component, count) in resolve(lookup, key)?.iter() {
                let amount = count
                    .checked_mul(*coefficient)
                    .and_then(|a| a.checked_mul(sign))
                    .ok_or(BalanceError::Overflow)?;
                let entry = net.entry(component.clone()).or_insert(0i64);
                *entry = entry.checked_add(amount).ok_or(BalanceError::Overflow)?;
            }
        }
    }
    Ok(net)
}

/// Final check of a balanced reaction
/// # Returns
/// * `Ok` - every coefficient is positive and every component is conserved
/// * `Err` - `InvalidCoefficient` or `BalanceViolation`
pub fn validate<K, L>(balanced: &Balanced<K>, lookup: &L) -> Result<(), BalanceError>
where
    K: Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    for (key, value) in balanced.reactants.iter().chain(balanced.products.iter()) {
        if *value <= 0 {
            warn!("coefficient {} for {:?}", value, key);
            return Err(BalanceError::InvalidCoefficient {
                species: format!("{:?}", key),
                value: *value,
            });
        }
    }

    match composition_violation(balanced, lookup)?.into_iter().find(|(_, r)| *r != 0) {
        Some((component, residual)) => {
            warn!("{} is off balance by {}", component, residual);
            Err(BalanceError::BalanceViolation { component, residual })
        }
        None => Ok(()),
    }
}

/// Checks a solution family at the origin and along every free symbol
/// The family is affine, so these points cover all of it
/// An expression that is identically zero is rejected as `InvalidCoefficient`
pub(crate) fn validate_family<K, L>(family: &Balanced<K, LinearExpr>, lookup: &L) -> Result<(), BalanceError>
where
    K: Clone + Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    for (key, expr) in family.reactants.iter().chain(family.products.iter()) {
        if expr.is_constant() && expr.constant == 0 {
            return Err(BalanceError::InvalidCoefficient {
                species: format!("{:?}", key),
                value: 0,
            });
        }
    }

    let origin = family.evaluate(&BTreeMap::new())?;
    let base = composition_violation(&origin, lookup)?;
    for symbol in family.free_symbols() {
        let point = family.evaluate(&BTreeMap::from([(symbol, 1)]))?;
        for (component, residual) in composition_violation(&point, lookup)? {
            let direction = residual
                .checked_sub(base.get(&component).copied().unwrap_or(0))
                .ok_or(BalanceError::Overflow)?;
            if direction != 0 {
                return Err(BalanceError::BalanceViolation {
                    component,
                    residual: direction,
                });
            }
        }
    }
    match base.into_iter().find(|(_, r)| *r != 0) {
        Some((component, residual)) => Err(BalanceError::BalanceViolation { component, residual }),
        None => Ok(()),
    }
}
