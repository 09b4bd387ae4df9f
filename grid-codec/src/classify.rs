// SPDX-License-Identifier: MIT
//! # Nearest-Colour Classification
//!
//! A sampled cell colour is assigned to the alphabet symbol whose reference colour is
//! closest in Euclidean RGB distance. Every colour maps to some symbol; heavy noise
//! degrades accuracy but never produces an error.
//!
//! Ties go to the symbol that appears first in the alphabet table, so the result is
//! stable for colours equidistant from two references (e.g. `(128, 128, 0)`).

use crate::alphabet::{Rgb, Symbol, ALPHABET};
use crate::error::CodecError;
use crate::grid::{Grid, GridSize};

/// Classification result with distances, for quality reporting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Classification {
    pub symbol: Symbol,
    /// Distance to the chosen reference colour.
    pub distance: f64,
    /// Distance to the second-closest reference colour.
    pub runner_up: f64,
}

impl Classification {
    /// How much closer the winner is than the runner-up. Near zero means the cell
    /// sits on a decision boundary and the symbol is a coin toss.
    pub fn margin(&self) -> f64 {
        self.runner_up - self.distance
    }
}

/// Symbol whose reference colour is nearest to `color`.
pub fn classify(color: Rgb) -> Symbol {
    classify_detailed(color).symbol
}

/// Like [`classify`], also reporting the winning and runner-up distances.
pub fn classify_detailed(color: Rgb) -> Classification {
    let mut best = (ALPHABET[0].symbol, color.distance(ALPHABET[0].color));
    let mut runner_up = f64::INFINITY;

    for entry in &ALPHABET[1..] {
        let d = color.distance(entry.color);
        // strict comparison keeps the earliest entry on ties
        if d < best.1 {
            runner_up = best.1;
            best = (entry.symbol, d);
        } else if d < runner_up {
            runner_up = d;
        }
    }

    Classification {
        symbol: best.0,
        distance: best.1,
        runner_up,
    }
}

/// Classify one sampled colour per cell (row-major) into a grid.
pub fn classify_colors(colors: &[Rgb], size: GridSize) -> Result<Grid, CodecError> {
    let symbols = colors.iter().map(|&c| classify(c)).collect();
    Grid::from_symbols(size, symbols)
}
