//! Common utilities for integration tests

use simplelog::{Config, LevelFilter, TestLogger};
use stoich_balance::{Balanced, Composition};
use std::collections::HashMap;

/// Routes library logs to the test output, safe to call from every test
pub fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}

/// Parses a plain formula such as `C7H5(NO2)3`, `Zn+2`, `C7H5O3-` or `e-`
pub fn formula(input: &str) -> Composition {
    if input == "e-" {
        return Composition::new().with_charge(-1).unwrap();
    }
    let (body, charge) = match input.find(['+', '-']) {
        Some(i) => {
            let sign = if input[i..].starts_with('+') { 1 } else { -1 };
            let magnitude = match &input[i + 1..] {
                "" => 1,
                digits => digits.parse::<i64>().unwrap(),
            };
            (&input[..i], sign * magnitude)
        }
        None => (input, 0),
    };

    let chars = body.chars().collect::<Vec<char>>();
    let mut groups: Vec<Vec<(String, i64)>> = vec![Vec::new()];
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '(' => {
                groups.push(Vec::new());
                i += 1;
            }
            ')' => {
                let (count, next) = read_count(&chars, i + 1);
                i = next;
                let group = groups.pop().unwrap();
                groups.last_mut().unwrap().extend(group.into_iter().map(|(s, n)| (s, n * count)));
            }
            c if c.is_ascii_uppercase() => {
                let mut symbol = c.to_string();
                i += 1;
                while i < chars.len() && chars[i].is_ascii_lowercase() {
                    symbol.push(chars[i]);
                    i += 1;
                }
                let (count, next) = read_count(&chars, i);
                i = next;
                groups.last_mut().unwrap().push((symbol, count));
            }
            c => panic!("unexpected '{}' in {}", c, input),
        }
    }

    let counts = groups.pop().unwrap();
    Composition::from_symbols(counts.iter().map(|(s, n)| (s.as_str(), *n)))
        .unwrap()
        .with_charge(charge)
        .unwrap()
}

fn read_count(chars: &[char], start: usize) -> (i64, usize) {
    let end = chars[start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(chars.len(), |p| start + p);
    if end == start {
        return (1, start);
    }
    (chars[start..end].iter().collect::<String>().parse().unwrap(), end)
}

/// Composition table for the given formulas
pub fn species(formulas: &[&'static str]) -> HashMap<&'static str, Composition> {
    formulas.iter().map(|f| (*f, formula(f))).collect()
}

/// Builds the expected result from literal pairs
pub fn expected(reactants: &[(&'static str, i64)], products: &[(&'static str, i64)]) -> Balanced<&'static str> {
    Balanced {
        reactants: reactants.iter().copied().collect(),
        products: products.iter().copied().collect(),
    }
}
