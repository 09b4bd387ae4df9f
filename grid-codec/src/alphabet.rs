// SPDX-License-Identifier: MIT
//! # Symbol Alphabet
//!
//! The alphabet is the one table both directions of the codec agree on. Every symbol
//! has exactly one 2-bit value and exactly one reference colour, and the table order
//! is the value order, so `ALPHABET[v].value == v`.
//!
//! ## Colour Choice
//!
//! The reference colours sit on the origin and the three primary axes of RGB space.
//! Any two of them are at least 255 apart, which leaves roughly 127 units of noise
//! margin per sampled colour before a cell can flip to a neighbouring symbol. Swapping
//! in colours that are closer together shrinks that margin directly.

/// An 8-bit-per-channel RGB colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Euclidean distance between two colours in RGB space.
    pub fn distance(self, other: Rgb) -> f64 {
        let dr = f64::from(self.r) - f64::from(other.r);
        let dg = f64::from(self.g) - f64::from(other.g);
        let db = f64::from(self.b) - f64::from(other.b);
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Channels as `[r, g, b, 255]`.
    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }
}

/// One of the four visual symbols a grid cell can hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Symbol {
    /// Value `00`; also the padding symbol for cells past the payload.
    #[default]
    Black = 0,
    /// Value `01`
    Red = 1,
    /// Value `10`
    Green = 2,
    /// Value `11`
    Blue = 3,
}

/// A row of the alphabet table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlphabetEntry {
    pub symbol: Symbol,
    pub value: u8,
    pub color: Rgb,
}

/// The shared symbol ↔ value ↔ colour table, in value order.
pub const ALPHABET: [AlphabetEntry; 4] = [
    AlphabetEntry {
        symbol: Symbol::Black,
        value: 0b00,
        color: Rgb::new(0, 0, 0),
    },
    AlphabetEntry {
        symbol: Symbol::Red,
        value: 0b01,
        color: Rgb::new(255, 0, 0),
    },
    AlphabetEntry {
        symbol: Symbol::Green,
        value: 0b10,
        color: Rgb::new(0, 255, 0),
    },
    AlphabetEntry {
        symbol: Symbol::Blue,
        value: 0b11,
        color: Rgb::new(0, 0, 255),
    },
];

impl Symbol {
    /// All symbols in alphabet order.
    pub const ALL: [Symbol; 4] = [Symbol::Black, Symbol::Red, Symbol::Green, Symbol::Blue];

    /// Symbol for a 2-bit value. Bits above the low pair are ignored.
    pub fn from_value(value: u8) -> Symbol {
        ALPHABET[usize::from(value & 0b11)].symbol
    }

    /// The symbol's 2-bit value.
    pub fn value(self) -> u8 {
        self.entry().value
    }

    /// The symbol's reference colour.
    pub fn color(self) -> Rgb {
        self.entry().color
    }

    fn entry(self) -> &'static AlphabetEntry {
        &ALPHABET[self as usize]
    }
}
