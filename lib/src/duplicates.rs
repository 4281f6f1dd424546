use crate::balance::{balance_distinct, check_sides, distinct, format_keys, shared_keys, Balanced};
use crate::composition::{resolve, CompositionLookup};
use crate::error::BalanceError;
use crate::options::BalanceOptions;
use log::{debug, trace};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Decides where species listed on both sides belong
/// Each duplicate in turn is first cancelled from both sides and the rest balanced recursively,
/// the first success wins. Otherwise every assignment of each duplicate to exactly one side is tried
/// (2^k balances for k duplicates) and the one with the smallest coefficient sum wins, ties going to
/// the earlier assignment. A pair of sides reached along several paths is balanced only once
/// # Arguments
/// * `reactants` - reactant keys
/// * `products` - product keys
/// * `lookup` - source of the compositions
/// * `options` - `allow_duplicates` and `max_duplicates` control the search, the mode is used for every attempt
/// # Returns
/// * `Ok` - reactant and product keys that balance, in caller order
/// * `Err` - `DuplicateSpecies`, `TooManyDuplicates` or `UnresolvableDuplicates`
/// # Example
/// ```
/// use stoich_balance::{resolve_duplicates, BalanceOptions, Composition};
/// use std::collections::HashMap;
///
/// let species = HashMap::from([
///     ("C", Composition::from_symbols([("C", 1)]).unwrap()),
///     ("CO", Composition::from_symbols([("C", 1), ("O", 1)]).unwrap()),
///     ("CO2", Composition::from_symbols([("C", 1), ("O", 2)]).unwrap()),
/// ]);
///
/// let (reactants, products) =
///     resolve_duplicates(&["C", "CO", "CO2"], &["C", "CO"], &species, &BalanceOptions::default()).unwrap();
///
/// assert_eq!(reactants, ["C", "CO2"]);
/// assert_eq!(products, ["CO"]);
/// ```
pub fn resolve_duplicates<K, L>(
    reactants: &[K],
    products: &[K],
    lookup: &L,
    options: &BalanceOptions,
) -> Result<(Vec<K>, Vec<K>), BalanceError>
where
    K: Clone + Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    let reactants = distinct(reactants);
    let products = distinct(products);
    check_sides(&reactants, &products)?;

    let balanced = balance_with_duplicates(&reactants, &products, lookup, options)?;
    Ok((
        reactants.into_iter().filter(|k| balanced.reactants.contains_key(k)).collect(),
        products.into_iter().filter(|k| balanced.products.contains_key(k)).collect(),
    ))
}

/// Balances distinct sides that may share keys
pub(crate) fn balance_with_duplicates<K, L>(
    reactants: &[K],
    products: &[K],
    lookup: &L,
    options: &BalanceOptions,
) -> Result<Balanced<K>, BalanceError>
where
    K: Clone + Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    let duplicates = shared_keys(reactants, products);
    if duplicates.is_empty() {
        return balance_distinct(reactants, products, lookup, options);
    }
    if !options.allow_duplicates {
        return Err(BalanceError::DuplicateSpecies(format_keys(&duplicates)));
    }
    // unknown keys must not hide behind a failed attempt
    for key in reactants.iter().chain(products.iter()) {
        resolve(lookup, key)?;
    }

    let k = duplicates.len();
    if k > options.max_duplicates || k >= usize::BITS as usize {
        return Err(BalanceError::TooManyDuplicates {
            count: k,
            limit: options.max_duplicates,
        });
    }

    let mut search = DuplicateSearch::new(lookup, options);
    search.tried.insert(search_key(reactants, products));
    search.resolve(reactants, products, duplicates)
}

/// One duplicate resolution, shared by every nested cancellation
/// Each pair of sides is balanced at most once, so k duplicates cost at most 2^k + 3^k attempts
struct DuplicateSearch<'a, K, L: ?Sized> {
    lookup: &'a L,
    options: &'a BalanceOptions,
    tried: BTreeSet<(Vec<K>, Vec<K>)>,
}
impl<'a, K, L> DuplicateSearch<'a, K, L>
where
    K: Clone + Debug + Ord,
    L: CompositionLookup<K> + ?Sized,
{
    fn new(lookup: &'a L, options: &'a BalanceOptions) -> Self {
        Self {
            lookup,
            options,
            tried: BTreeSet::new(),
        }
    }

    /// Cancels each duplicate in turn, then tries every side assignment
    fn resolve(&mut self, reactants: &[K], products: &[K], duplicates: Vec<K>) -> Result<Balanced<K>, BalanceError> {
        for duplicate in duplicates.iter() {
            let cancelled = (without(reactants, duplicate), without(products, duplicate));
            if let Some(balanced) = self.attempt(&cancelled.0, &cancelled.1)? {
                debug!("cancelled duplicate {:?}", duplicate);
                return Ok(balanced);
            }
        }

        let k = duplicates.len();
        let mut best: Option<Balanced<K>> = None;
        for assignment in 0..(1usize << k) {
            let mut side_reactants = reactants.to_vec();
            let mut side_products = products.to_vec();
            for (i, key) in duplicates.iter().enumerate() {
                // the first duplicate is the most significant bit, a set bit keeps the key as a product
                if (assignment >> (k - 1 - i)) & 1 == 1 {
                    side_reactants.retain(|r| r != key);
                } else {
                    side_products.retain(|p| p != key);
                }
            }

            if let Some(balanced) = self.attempt(&side_reactants, &side_products)? {
                trace!("assignment {:0width$b} balances with total {}", assignment, balanced.total(), width = k);
                if best.as_ref().map_or(true, |b| balanced.total() < b.total()) {
                    best = Some(balanced);
                }
            }
        }

        best.ok_or_else(|| BalanceError::UnresolvableDuplicates(format_keys(&duplicates)))
    }

    /// Balances one pair of sides, resolving its duplicates recursively
    /// # Returns
    /// * `Ok(Some)` - the pair balances
    /// * `Ok(None)` - the pair fails or was already tried, every earlier success ends the search
    /// * `Err` - `SearchLimitExceeded`, which aborts the whole resolution
    fn attempt(&mut self, reactants: &[K], products: &[K]) -> Result<Option<Balanced<K>>, BalanceError> {
        if !self.tried.insert(search_key(reactants, products)) {
            return Ok(None);
        }
        let outcome = check_sides(reactants, products).and_then(|_| {
            let duplicates = shared_keys(reactants, products);
            if duplicates.is_empty() {
                balance_distinct(reactants, products, self.lookup, self.options)
            } else {
                self.resolve(reactants, products, duplicates)
            }
        });
        match outcome {
            Ok(balanced) => Ok(Some(balanced)),
            Err(BalanceError::SearchLimitExceeded { limit }) => Err(BalanceError::SearchLimitExceeded { limit }),
            Err(e) => {
                trace!("{} -> {} failed: {}", format_keys(reactants), format_keys(products), e);
                Ok(None)
            }
        }
    }
}

fn search_key<K: Clone + Ord>(reactants: &[K], products: &[K]) -> (Vec<K>, Vec<K>) {
    let mut reactants = reactants.to_vec();
    let mut products = products.to_vec();
    reactants.sort();
    products.sort();
    (reactants, products)
}

fn without<K: Clone + PartialEq>(keys: &[K], removed: &K) -> Vec<K> {
    keys.iter().filter(|k| *k != removed).cloned().collect()
}
