//! Instrument symbols scanned each cycle and their SmartAPI identifiers.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::AlertError;

/// Exchange segment an instrument is quoted on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, Hash, Eq, PartialEq)]
pub enum Exchange {
    /// National Stock Exchange cash segment.
    #[strum(serialize = "NSE")]
    Nse,
    /// Bombay Stock Exchange cash segment.
    #[strum(serialize = "BSE")]
    Bse,
}

/// Trait providing list parsing for symbols.
pub trait SymbolParser {
    /// Parses a list of symbols separated by commas, spaces, or new lines.
    ///
    /// Duplicates are dropped while the first-seen order is kept. Returns an
    /// error if any entry is not a known symbol.
    fn parse_list(input: &str) -> Result<Vec<Symbol>, AlertError>;
}

impl SymbolParser for Symbol {
    fn parse_list(input: &str) -> Result<Vec<Self>, AlertError> {
        let mut symbols = Vec::new();

        for raw in input.split(|c: char| c == ',' || c.is_whitespace()) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            match trimmed.parse::<Self>() {
                Ok(symbol) if !symbols.contains(&symbol) => symbols.push(symbol),
                Ok(_) => {}
                Err(e) => {
                    return Err(AlertError::Format(format!("unknown symbol '{trimmed}': {e}")));
                }
            }
        }
        Ok(symbols)
    }
}

/// Set of supported instruments.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
    Hash,
    Eq,
    PartialEq,
)]
#[clap(rename_all = "UPPER")]
#[serde(rename_all = "UPPERCASE")]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Symbol {
    /// NIFTY 50 index.
    Nifty,
    /// BSE SENSEX index.
    Sensex,
    /// Reliance Industries.
    Reliance,
    /// HDFC Bank.
    Hdfcbank,
}

impl Symbol {
    /// Default scan list, in scan order.
    pub const DEFAULT: [Symbol; 4] = [
        Symbol::Nifty,
        Symbol::Sensex,
        Symbol::Reliance,
        Symbol::Hdfcbank,
    ];

    /// Exchange segment the instrument is quoted on.
    pub fn exchange(&self) -> Exchange {
        match self {
            Symbol::Sensex => Exchange::Bse,
            _ => Exchange::Nse,
        }
    }

    /// SmartAPI trading symbol.
    pub fn trading_symbol(&self) -> &'static str {
        match self {
            Symbol::Nifty => "Nifty 50",
            Symbol::Sensex => "SENSEX",
            Symbol::Reliance => "RELIANCE-EQ",
            Symbol::Hdfcbank => "HDFCBANK-EQ",
        }
    }

    /// SmartAPI instrument token.
    pub fn token(&self) -> &'static str {
        match self {
            Symbol::Nifty => "99926000",
            Symbol::Sensex => "99919000",
            Symbol::Reliance => "2885",
            Symbol::Hdfcbank => "1333",
        }
    }

    /// Indices have no traded volume.
    pub fn is_index(&self) -> bool {
        matches!(self, Symbol::Nifty | Symbol::Sensex)
    }

    /// Reference price used for synthesized mock data.
    pub fn reference_price(&self) -> f64 {
        match self {
            Symbol::Nifty => 22_000.0,
            Symbol::Sensex => 72_000.0,
            Symbol::Reliance => 2_900.0,
            Symbol::Hdfcbank => 1_500.0,
        }
    }
}
