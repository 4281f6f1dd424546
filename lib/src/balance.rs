use crate::canonical::{canonicalize, canonicalize_symbolic, LinearExpr};
use crate::composition::CompositionLookup;
use crate::duplicates::balance_with_duplicates;
use crate::error::{BalanceError, Side};
use crate::matrix::build;
use crate::nullspace::{solve, Symbol};
use crate::options::BalanceOptions;
use crate::validate::{validate, validate_family};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// Species key → coefficient for one side of a reaction
pub type CoefficientMap<K, V = i64> = BTreeMap<K, V>;

/// Coefficients of a balanced reaction
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Balanced<K, V = i64> {
    pub reactants: CoefficientMap<K, V>,
    pub products: CoefficientMap<K, V>,
}
impl<K: Ord, V> Balanced<K, V> {
    /// Coefficient of a species on whichever side it is on
    pub fn coefficient(&self, key: &K) -> Option<&V> {
        self.reactants.get(key).or_else(|| self.products.get(key))
    }

    /// Pairs the keys with column values, reactants first
    pub(crate) fn from_columns(reactants: &[K], products: &[K], values: Vec<V>) -> Self
    where
        K: Clone,
    {
        let mut values = values.into_iter();
        Self {
            reactants: reactants.iter().cloned().zip(values.by_ref()).collect(),
            products: products.iter().cloned().zip(values).collect(),
        }
    }
}
impl<K: Ord> Balanced<K> {
    /// Sum of all coefficients of both sides
    pub fn total(&self) -> i64 {
        self.reactants.values().chain(self.products.values()).sum()
    }
}
impl<K: Ord + Clone> Balanced<K, LinearExpr> {
    /// Free symbols used by any coefficient, in increasing order
    pub fn free_symbols(&self) -> Vec<Symbol> {
        self.reactants
            .values()
            .chain(self.products.values())
            .flat_map(|e| e.terms.keys().copied())
            .collect::<BTreeSet<Symbol>>()
            .into_iter()
            .collect()
    }

    /// Substitutes values for the free symbols, missing symbols count as 0
    pub fn evaluate(&self, assignment: &BTreeMap<Symbol, i64>) -> Result<Balanced<K>, BalanceError> {
        let side = |exprs: &CoefficientMap<K, LinearExpr>| {
            exprs
                .iter()
                .map(|(k, e)| Ok((k.clone(), e.evaluate(assignment)?)))
                .collect::<Result<CoefficientMap<K>, BalanceError>>()
        };
        Ok(Balanced {
            reactants: side(&self.reactants)?,
            products: side(&self.products)?,
        })
    }
}

/// Balances a reaction
/// # Arguments
/// * `reactants` - reactant keys, repeated keys are merged
/// * `products` - product keys, repeated keys are merged
/// * `lookup` - source of the compositions
/// * `options` - mode and limits
/// # Returns
/// * `Ok` - strictly positive integer coefficients that conserve every component
/// * `Err` - the first failure detected
/// # Example
/// ```
/// use stoich_balance::{balance, BalanceOptions, Composition};
/// use std::collections::HashMap;
///
/// let species = HashMap::from([
///     ("H2", Composition::from_symbols([("H", 2)]).unwrap()),
///     ("O2", Composition::from_symbols([("O", 2)]).unwrap()),
///     ("H2O", Composition::from_symbols([("H", 2), ("O", 1)]).unwrap()),
/// ]);
///
/// let balanced = balance(&["H2", "O2"], &["H2O"], &species, &BalanceOptions::default()).unwrap();
///
/// assert_eq!(balanced.coefficient(&"H2"), Some(&2));
/// assert_eq!(balanced.coefficient(&"O2"), Some(&1));
/// assert_eq!(balanced.coefficient(&"H2O"), Some(&2));
/// ```
pub fn balance<K, L>(
    reactants: &[K],
    products: &[K],
    lookup: &L,
    options: &BalanceOptions,
) -> Result<Balanced<K>, BalanceError>
where
    K: Clone + Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    let reactants = distinct(reactants);
    let products = distinct(products);
    check_sides(&reactants, &products)?;

    if shared_keys(&reactants, &products).is_empty() {
        balance_distinct(&reactants, &products, lookup, options)
    } else {
        balance_with_duplicates(&reactants, &products, lookup, options)
    }
}

/// Balances a reaction and keeps its free parameters
/// A uniquely determined reaction comes back as constants
/// # Returns
/// * `Ok` - one integer affine expression per species, every non-negative assignment of the symbols is balanced
/// * `Err` - duplicates fail with `DuplicateSpecies`, otherwise like `balance`
/// # Example
/// ```
/// use stoich_balance::{balance_parametric, Composition};
/// use std::collections::HashMap;
///
/// let species = HashMap::from([
///     ("Fe", Composition::from_symbols([("Fe", 1)]).unwrap()),
///     ("O2", Composition::from_symbols([("O", 2)]).unwrap()),
///     ("FeO", Composition::from_symbols([("Fe", 1), ("O", 1)]).unwrap()),
///     ("Fe2O3", Composition::from_symbols([("Fe", 2), ("O", 3)]).unwrap()),
/// ]);
///
/// let family = balance_parametric(&["Fe", "O2"], &["FeO", "Fe2O3"], &species).unwrap();
///
/// assert_eq!(family.free_symbols().len(), 1);
/// assert_eq!(family.coefficient(&"Fe").unwrap().to_string(), "2 + 4x1");
/// assert_eq!(family.coefficient(&"FeO").unwrap().to_string(), "2");
/// ```
pub fn balance_parametric<K, L>(reactants: &[K], products: &[K], lookup: &L) -> Result<Balanced<K, LinearExpr>, BalanceError>
where
    K: Clone + Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    let reactants = distinct(reactants);
    let products = distinct(products);
    check_sides(&reactants, &products)?;

    let duplicates = shared_keys(&reactants, &products);
    if !duplicates.is_empty() {
        return Err(BalanceError::DuplicateSpecies(format_keys(&duplicates)));
    }

    let (_, matrix) = build(&reactants, &products, lookup)?;
    let family = Balanced::from_columns(&reactants, &products, canonicalize_symbolic(&solve(&matrix))?);
    validate_family(&family, lookup)?;

    debug!("parametric balance with {} free symbols", family.free_symbols().len());
    Ok(family)
}

/// Balances sides that share no key
pub(crate) fn balance_distinct<K, L>(
    reactants: &[K],
    products: &[K],
    lookup: &L,
    options: &BalanceOptions,
) -> Result<Balanced<K>, BalanceError>
where
    K: Clone + Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    let (_, matrix) = build(reactants, products, lookup)?;
    let coefficients = canonicalize(&solve(&matrix), options.mode, options.max_search_nodes)?;
    let balanced = Balanced::from_columns(reactants, products, coefficients);
    validate(&balanced, lookup)?;

    debug!("balanced {:?} -> {:?}", balanced.reactants, balanced.products);
    Ok(balanced)
}

/// Removes repeated keys, the first occurrence keeps its position
pub(crate) fn distinct<K: Clone + Ord>(keys: &[K]) -> Vec<K> {
    let mut seen = BTreeSet::new();
    keys.iter().filter(|k| seen.insert(*k)).cloned().collect()
}

pub(crate) fn check_sides<K: Ord>(reactants: &[K], products: &[K]) -> Result<(), BalanceError> {
    if reactants.is_empty() {
        return Err(BalanceError::EmptySide(Side::Reactants));
    }
    if products.is_empty() {
        return Err(BalanceError::EmptySide(Side::Products));
    }
    if reactants.iter().collect::<BTreeSet<_>>() == products.iter().collect::<BTreeSet<_>>() {
        return Err(BalanceError::IdenticalSides);
    }
    Ok(())
}

/// Keys present on both sides, sorted
pub(crate) fn shared_keys<K: Clone + Ord>(reactants: &[K], products: &[K]) -> Vec<K> {
    let products = products.iter().collect::<BTreeSet<_>>();
    reactants
        .iter()
        .filter(|k| products.contains(k))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

pub(crate) fn format_keys<K: Debug>(keys: &[K]) -> String {
    keys.iter().map(|k| format!("{:?}", k)).collect::<Vec<_>>().join(", ")
}
