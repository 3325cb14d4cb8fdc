//! Place invariants.
//!
//! A P-invariant is an integer vector `y` with `yᵀ·C = 0`, where `C` is the
//! incidence matrix. Firing never changes `y·M`, so every reachable marking
//! satisfies `y·M = y·M0`. The basis is the rational nullspace of `Cᵀ`, scaled
//! to primitive integer vectors.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::net::NetModel;

/// Basis of the P-invariants of `net`; each vector is indexed by place.
pub fn place_invariants(net: &NetModel) -> Vec<Vec<BigInt>> {
    // rows = transitions, columns = places
    let matrix = (0..net.num_transitions())
        .map(|t| {
            (0..net.num_places())
                .map(|p| BigInt::from(net.incidence(t, p)))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    nullspace(&matrix, net.num_places())
}

/// Whether `weights` annihilates every column of the incidence matrix.
pub fn is_invariant(net: &NetModel, weights: &[BigInt]) -> bool {
    (0..net.num_transitions()).all(|t| {
        (0..net.num_places())
            .map(|p| &weights[p] * BigInt::from(net.incidence(t, p)))
            .sum::<BigInt>()
            .is_zero()
    })
}

fn nullspace(matrix: &[Vec<BigInt>], cols: usize) -> Vec<Vec<BigInt>> {
    if cols == 0 {
        return Vec::new();
    }

    let rows = matrix.len();
    let mut rref = matrix
        .iter()
        .map(|row| row.iter().cloned().map(BigRational::from_integer).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut pivot_cols = Vec::new();
    let mut pivot_row = 0;
    for col in 0..cols {
        if pivot_row >= rows {
            break;
        }
        let Some(found) = (pivot_row..rows).find(|&r| !rref[r][col].is_zero()) else {
            continue;
        };
        rref.swap(found, pivot_row);

        let pivot = rref[pivot_row][col].clone();
        for value in rref[pivot_row].iter_mut() {
            *value /= pivot.clone();
        }
        for row in 0..rows {
            if row == pivot_row || rref[row][col].is_zero() {
                continue;
            }
            let factor = rref[row][col].clone();
            for c in col..cols {
                let delta = rref[pivot_row][c].clone() * factor.clone();
                rref[row][c] -= delta;
            }
        }

        pivot_cols.push(col);
        pivot_row += 1;
    }

    let mut is_pivot = vec![false; cols];
    for &col in &pivot_cols {
        is_pivot[col] = true;
    }

    (0..cols)
        .filter(|&col| !is_pivot[col])
        .map(|free| {
            let mut vector = vec![BigRational::zero(); cols];
            vector[free] = BigRational::one();
            for (row, &pivot_col) in pivot_cols.iter().enumerate() {
                vector[pivot_col] = -rref[row][free].clone();
            }
            primitive(vector)
        })
        .collect()
}

/// Scale a rational vector to integers with gcd 1.
fn primitive(vector: Vec<BigRational>) -> Vec<BigInt> {
    let lcm = vector.iter().fold(BigInt::one(), |acc, v| acc.lcm(v.denom()));
    let ints = vector
        .into_iter()
        .map(|v| v.numer() * (&lcm / v.denom()))
        .collect::<Vec<_>>();
    let gcd = ints
        .iter()
        .filter(|v| !v.is_zero())
        .fold(BigInt::zero(), |acc, v| if acc.is_zero() { v.abs() } else { acc.gcd(v) });
    if gcd.is_zero() || gcd.is_one() {
        ints
    } else {
        ints.into_iter().map(|v| v / &gcd).collect()
    }
}
