use crate::error::BalanceError;
use mendeleev::{Element, ALL_ELEMENTS};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};
use std::hash::{BuildHasher, Hash};
use std::str::FromStr;

/// A conserved quantity counted in a species
/// # Example
/// ```
/// use stoich_balance::Component;
/// use mendeleev::Element;
///
/// assert_eq!("Fe".parse::<Component>().unwrap(), Component::Element(Element::Fe));
/// assert_eq!("charge".parse::<Component>().unwrap(), Component::Charge);
/// assert!("Xx".parse::<Component>().is_err());
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Component {
    /// Chemical element
    Element(Element),
    /// Abstract conserved unit that is not an element (e.g. "eggs")
    Named(String),
    /// Net charge, counted in elementary charges
    Charge,
}
impl Component {
    /// Looks up an element by its symbol (e.g. "Cl")
    pub fn element(symbol: &str) -> Result<Self, BalanceError> {
        ALL_ELEMENTS
            .iter()
            .find(|e| e.symbol() == symbol)
            .map(|e| Component::Element(*e))
            .ok_or_else(|| BalanceError::UnknownElement(symbol.to_string()))
    }

    /// Creates an abstract named component
    pub fn named(name: impl Into<String>) -> Self {
        Component::Named(name.into())
    }

    fn rank(&self) -> u8 {
        match self {
            Component::Element(_) => 0,
            Component::Named(_) => 1,
            Component::Charge => 2,
        }
    }
}
impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Element(a), Component::Element(b)) => a.atomic_number().cmp(&b.atomic_number()),
            (Component::Named(a), Component::Named(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}
impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Element(e) => write!(f, "{}", e.symbol()),
            Component::Named(name) => write!(f, "{}", name),
            Component::Charge => write!(f, "charge"),
        }
    }
}
impl FromStr for Component {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "charge" {
            return Ok(Component::Charge);
        }
        Component::element(s)
    }
}

/// Counts of every component in one species
/// Components with zero count are never stored, a missing component counts as 0
/// # Example
/// ```
/// use stoich_balance::{Component, Composition};
///
/// let sulfate = Composition::from_symbols([("S", 1), ("O", 4)]).unwrap().with_charge(-2).unwrap();
///
/// assert_eq!(sulfate.get(&"O".parse().unwrap()), 4);
/// assert_eq!(sulfate.get(&Component::Charge), -2);
/// assert_eq!(sulfate.get(&"H".parse().unwrap()), 0);
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Composition {
    counts: BTreeMap<Component, i64>,
}
impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a composition from element symbols and their counts
    /// # Arguments
    /// * `symbols` - pairs of element symbol and count, repeated symbols are summed
    /// # Returns
    /// * `Ok` - composition
    /// * `Err` - `UnknownElement` if a symbol is not an element, `Overflow` if a summed count leaves `i64`
    pub fn from_symbols<'a, I>(symbols: I) -> Result<Self, BalanceError>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
    {
        let mut composition = Self::new();
        for (symbol, count) in symbols {
            composition.add(Component::element(symbol)?, count)?;
        }
        Ok(composition)
    }

    /// Adds `count` units of `component`, failing with `Overflow` if the total leaves `i64`
    pub fn add(&mut self, component: Component, count: i64) -> Result<(), BalanceError> {
        let total = self.get(&component).checked_add(count).ok_or(BalanceError::Overflow)?;
        if total == 0 {
            self.counts.remove(&component);
        } else {
            self.counts.insert(component, total);
        }
        Ok(())
    }

    /// Returns the composition with `count` units of `component` added
    pub fn with(mut self, component: Component, count: i64) -> Result<Self, BalanceError> {
        self.add(component, count)?;
        Ok(self)
    }

    /// Returns the composition with its net charge increased by `charge`
    pub fn with_charge(self, charge: i64) -> Result<Self, BalanceError> {
        self.with(Component::Charge, charge)
    }

    pub fn get(&self, component: &Component) -> i64 {
        self.counts.get(component).copied().unwrap_or(0)
    }

    pub fn charge(&self) -> i64 {
        self.get(&Component::Charge)
    }

    /// Components with non-zero count, in canonical order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Component, i64)> {
        self.counts.iter().map(|(c, q)| (c, *q))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Resolves species keys to their compositions
pub trait CompositionLookup<K> {
    /// Returns the composition of `key` or `None` if the species is unknown
    fn lookup(&self, key: &K) -> Option<Composition>;
}
impl<K, S> CompositionLookup<K> for HashMap<K, Composition, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn lookup(&self, key: &K) -> Option<Composition> {
        self.get(key).cloned()
    }
}
impl<K: Ord> CompositionLookup<K> for BTreeMap<K, Composition> {
    fn lookup(&self, key: &K) -> Option<Composition> {
        self.get(key).cloned()
    }
}
impl<K, T: CompositionLookup<K> + ?Sized> CompositionLookup<K> for &T {
    fn lookup(&self, key: &K) -> Option<Composition> {
        (**self).lookup(key)
    }
}

/// Looks up a species, failing with `UnknownSpecies` for unknown keys
pub(crate) fn resolve<K, L>(lookup: &L, key: &K) -> Result<Composition, BalanceError>
where
    K: std::fmt::Debug,
    L: CompositionLookup<K> + ?Sized,
{
    lookup
        .lookup(key)
        .ok_or_else(|| BalanceError::UnknownSpecies(format!("{:?}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_sort_by_atomic_number_then_named_then_charge() {
        let mut components = vec![
            Component::Charge,
            Component::named("eggs"),
            Component::element("O").unwrap(),
            Component::named("apples"),
            Component::element("H").unwrap(),
            Component::element("Fe").unwrap(),
        ];
        components.sort();

        let names: Vec<String> = components.iter().map(|c| c.to_string()).collect();
        assert_eq!(names, ["H", "O", "Fe", "apples", "eggs", "charge"]);
    }

    #[test]
    fn zero_counts_are_dropped() {
        let mut composition = Composition::from_symbols([("H", 2), ("O", 1)]).unwrap();
        composition.add(Component::element("O").unwrap(), -1).unwrap();

        assert_eq!(composition.components().count(), 1);
        assert_eq!(composition.get(&Component::element("O").unwrap()), 0);
    }

    #[test]
    fn repeated_symbols_are_summed() {
        // C2H5OH
        let ethanol = Composition::from_symbols([("C", 2), ("H", 5), ("O", 1), ("H", 1)]).unwrap();
        assert_eq!(ethanol.get(&Component::element("H").unwrap()), 6);
    }

    #[test]
    fn count_overflow() {
        let mut composition = Composition::from_symbols([("C", i64::MAX)]).unwrap();
        assert_eq!(composition.add(Component::element("C").unwrap(), 1), Err(BalanceError::Overflow));
        assert_eq!(composition.get(&Component::element("C").unwrap()), i64::MAX);
        assert_eq!(
            Composition::new().with_charge(i64::MIN).unwrap().with_charge(-1),
            Err(BalanceError::Overflow)
        );
    }

    #[test]
    fn unknown_element_symbol() {
        assert_eq!(
            Composition::from_symbols([("Qq", 1)]),
            Err(BalanceError::UnknownElement("Qq".to_string()))
        );
    }

    #[test]
    fn lookup_through_maps() {
        let water = Composition::from_symbols([("H", 2), ("O", 1)]).unwrap();
        let hash = HashMap::from([("H2O", water.clone())]);
        let tree = BTreeMap::from([("H2O", water.clone())]);

        assert_eq!(resolve(&hash, &"H2O"), Ok(water.clone()));
        assert_eq!(resolve(&&tree, &"H2O"), Ok(water));
        assert_eq!(resolve(&tree, &"D2O"), Err(BalanceError::UnknownSpecies("\"D2O\"".to_string())));
    }
}
