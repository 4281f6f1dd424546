use serde::{Deserialize, Serialize};

/// How an under-determined reaction is turned into coefficients
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Only uniquely determined reactions are accepted
    Exact,
    /// Smallest coefficient sum among all positive integer solutions
    #[default]
    IntegerMinimal,
}

/// Settings of one balancing call
/// # Example
/// ```
/// use stoich_balance::{BalanceOptions, Mode};
///
/// let options = BalanceOptions::default().with_mode(Mode::Exact).allow_duplicates(false);
///
/// assert_eq!(options.mode, Mode::Exact);
/// assert!(!options.allow_duplicates);
/// assert_eq!(options.max_duplicates, 10);
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct BalanceOptions {
    pub mode: Mode,
    /// Resolve species that appear on both sides instead of failing
    pub allow_duplicates: bool,
    /// Largest number of duplicated species for the exhaustive side assignment (2^k balances)
    pub max_duplicates: usize,
    /// Largest number of branch and bound nodes for the integer search
    pub max_search_nodes: usize,
}
impl Default for BalanceOptions {
    fn default() -> Self {
        Self {
            mode: Mode::IntegerMinimal,
            allow_duplicates: true,
            max_duplicates: 10,
            max_search_nodes: 100_000,
        }
    }
}
impl BalanceOptions {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    pub fn max_duplicates(mut self, limit: usize) -> Self {
        self.max_duplicates = limit;
        self
    }

    pub fn max_search_nodes(mut self, limit: usize) -> Self {
        self.max_search_nodes = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_settings() {
        let options: BalanceOptions = serde_json::from_str(r#"{"mode": "exact", "max_search_nodes": 50}"#).unwrap();

        assert_eq!(options, BalanceOptions::default().with_mode(Mode::Exact).max_search_nodes(50));
    }

    #[test]
    fn serializes_mode_in_snake_case() {
        let json = serde_json::to_string(&BalanceOptions::default()).unwrap();
        assert!(json.contains(r#""mode":"integer_minimal""#));
    }
}
