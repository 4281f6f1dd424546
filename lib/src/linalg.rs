use crate::error::BalanceError;
use malachite::num::arithmetic::traits::{Abs, Gcd, Lcm};
use malachite::num::basic::traits::{One, Zero};
use malachite::{Natural, Rational};
use std::cmp::{max, min};
use std::mem;

/// Converts an integer matrix into a matrix of Rational numbers
pub fn to_rational(matrix: &[Vec<i64>]) -> Vec<Vec<Rational>> {
    matrix
        .iter()
        .map(|row| row
            .iter()
            .map(|&x| Rational::from(x))
            .collect()
        )
        .collect()
}

/// Performs Gaussian elimination with partial pivoting and returns the pivot columns
/// # Arguments
/// * `matrix` - matrix to reduce in place (`m` rows, `n` columns)
/// * `m` - number of rows
/// * `n` - number of columns
/// # Returns
/// * `Vec<usize>` - column of the leading coefficient of each non-zero row, the length is the rank
pub fn gaussian_elimination(matrix: &mut [Vec<Rational>], m: usize, n: usize) -> Vec<usize> {
    let mut pivots = Vec::new();
    let mut row = 0;
    let mut col = 0;
    while row < m && col < n {
        let mut i_max = row;
        for (i, row_n) in matrix.iter().enumerate().take(m).skip(row + 1) {
            if (&row_n[col]).abs() > (&matrix[i_max][col]).abs() {
                i_max = i;
            }
        }

        if matrix[i_max][col] == Rational::ZERO {
            col += 1;
        } else {
            swap_rows(row, i_max, matrix);
            for i in (row + 1)..m {
                if matrix[i][col] == Rational::ZERO {
                    continue;
                }
                let f = &matrix[i][col] / &matrix[row][col];
                matrix[i][col] = Rational::ZERO;
                for j in (col + 1)..n {
                    let div_amount = &f * &matrix[row][j];
                    matrix[i][j] -= div_amount;
                }
            }

            pivots.push(col);
            row += 1;
            col += 1;
        }
    }
    pivots
}

/// Swaps two rows in a matrix
#[inline(always)]
pub fn swap_rows<T>(r1: usize, r2: usize, matrix: &mut [Vec<T>]) {
    if r1 != r2 {
        let bigger_r = max(r1, r2);
        let smaller_r = min(r1, r2);
        let (top, bot) = matrix.split_at_mut(bigger_r);  // splits before bigger_r so index 0 in bot will be bigger_r
        mem::swap(&mut top[smaller_r], &mut bot[0])
    }
}

/// Reduces a matrix in row echelon form to reduced row echelon form
/// Every pivot becomes 1 and every entry above a pivot becomes 0
/// # Arguments
/// * `matrix` - output of `gaussian_elimination`
/// * `pivots` - pivot columns returned by `gaussian_elimination`
pub fn reduce_row_echelon(matrix: &mut [Vec<Rational>], pivots: &[usize]) {
    for (r, &p) in pivots.iter().enumerate() {
        let factor = Rational::ONE / &matrix[r][p];
        for x in matrix[r].iter_mut() {
            *x *= &factor;
        }
    }

    // process matrix from bottom to top, rows below the current one are already clean
    for (r, &p) in pivots.iter().enumerate().rev() {
        for r_temp in 0..r {
            if matrix[r_temp][p] == Rational::ZERO {
                continue;
            }
            let factor = matrix[r_temp][p].clone();
            let (top, bot) = matrix.split_at_mut(r);
            for (x, y) in top[r_temp].iter_mut().zip(bot[0].iter()) {
                *x -= &factor * y;
            }
        }
    }
}

/// Least common multiple of the denominators
pub fn denominator_lcm<'a>(values: impl IntoIterator<Item = &'a Rational>) -> Natural {
    let mut lcm = Natural::ONE;
    for value in values {
        lcm = lcm.lcm(value.denominator_ref());
    }
    lcm
}

/// Greatest common divisor of a set of rationals (gcd of numerators over lcm of denominators)
/// Zeros are ignored, an empty or all-zero set has gcd 0
pub fn rational_gcd<'a>(values: impl IntoIterator<Item = &'a Rational>) -> Rational {
    let mut numerators = Natural::ZERO;
    let mut denominators = Natural::ONE;
    for value in values {
        if *value == Rational::ZERO {
            continue;
        }
        numerators = numerators.gcd(value.numerator_ref());
        denominators = denominators.lcm(value.denominator_ref());
    }
    Rational::from(&numerators) / Rational::from(&denominators)
}

/// Scales a vector of rationals to coprime integers with the same direction
/// A zero vector stays zero
pub fn to_coprime_integers(values: &[Rational]) -> Vec<Rational> {
    let gcd = rational_gcd(values.iter());
    if gcd == Rational::ZERO {
        return values.to_vec();
    }
    values.iter().map(|x| x / &gcd).collect()
}

/// Converts an integral Rational to i64
pub fn to_i64(value: &Rational) -> Result<i64, BalanceError> {
    i64::try_from(value).map_err(|_| BalanceError::Overflow)
}
