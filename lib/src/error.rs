use crate::composition::Component;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Side of a reaction equation
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Side {
    /// Left hand side, consumed species
    Reactants,
    /// Right hand side, formed species
    Products,
}
impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Reactants => write!(f, "reactants"),
            Side::Products => write!(f, "products"),
        }
    }
}

/// Errors that can occur while balancing a reaction
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BalanceError {
    /// The composition collaborator does not know the species
    #[error("Unknown species: {0}")]
    UnknownSpecies(String),
    /// Symbol is not a chemical element
    #[error("Unknown element symbol: {0}")]
    UnknownElement(String),
    /// One side of the reaction has no species at all
    #[error("There are no {0} in the reaction")]
    EmptySide(Side),

    /// A component is present on one side only and cannot cancel out
    #[error("Component '{component}' not among {side}")]
    InfeasibleSystem { component: Component, side: Side },
    /// Free parameters remain but a unique solution was requested
    #[error("The system was under-determined ({free} free parameters)")]
    UnderDetermined { free: usize },
    /// No strictly positive integer solution exists
    #[error("No positive integer solution exists")]
    Infeasible,
    /// The unique solution has a non-positive entry after normalization
    #[error("Non-positive coefficient for species at column {column}")]
    SignError { column: usize },

    /// Species on both sides while duplicates are not allowed
    #[error("Substances on both sides: {0}")]
    DuplicateSpecies(String),
    /// Reactant and product sets are the same
    #[error("Cannot balance: reactants and products identical")]
    IdenticalSides,
    /// No removal or side assignment of the duplicates balances
    #[error("Failed to remove duplicate keys: {0}")]
    UnresolvableDuplicates(String),
    /// Too many duplicates for the exhaustive side assignment search
    #[error("{count} duplicate species exceed the limit of {limit}")]
    TooManyDuplicates { count: usize, limit: usize },

    /// Final coefficients leave a residual (internal invariant failure)
    #[error("Component '{component}' is off balance by {residual}")]
    BalanceViolation { component: Component, residual: i64 },
    /// Final coefficient is zero or negative (internal invariant failure)
    #[error("Invalid coefficient {value} for species {species}")]
    InvalidCoefficient { species: String, value: i64 },

    /// Coefficient does not fit into 64 bits
    #[error("Coefficient out of the 64-bit integer range")]
    Overflow,
    /// Branch and bound visited more nodes than allowed
    #[error("Integer search exceeded the limit of {limit} nodes")]
    SearchLimitExceeded { limit: usize },
}
