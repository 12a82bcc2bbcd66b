//! Typed field extraction over broker responses.
//!
//! Each field is described by an ordered list of JSON locations and an ordered
//! list of key aliases. The first location holding any alias with a usable
//! value wins; anything else yields `None`.
use serde_json::Value;

/// Places a quote record can sit inside a SmartAPI response, in priority order.
pub const QUOTE_LOCATIONS: &[&str] = &["", "/data", "/data/fetched/0"];

/// Aliases for the last traded price.
pub const PRICE_ALIASES: &[&str] = &["ltp", "lastPrice", "last_traded_price"];

/// Aliases for traded volume.
pub const VOLUME_ALIASES: &[&str] = &["volume", "tradeVolume", "totalTradedVolume", "vol_traded"];

/// One extraction rule: locations × aliases.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub locations: &'static [&'static str],
    pub aliases: &'static [&'static str],
}

pub const PRICE: FieldRule = FieldRule {
    locations: QUOTE_LOCATIONS,
    aliases: PRICE_ALIASES,
};

pub const VOLUME: FieldRule = FieldRule {
    locations: QUOTE_LOCATIONS,
    aliases: VOLUME_ALIASES,
};

impl FieldRule {
    /// First matching value as a float. Numeric strings are accepted.
    pub fn number(&self, response: &Value) -> Option<f64> {
        self.find(response, as_f64)
    }

    /// First matching value as a non-negative integer.
    pub fn count(&self, response: &Value) -> Option<u64> {
        self.find(response, |v| {
            as_f64(v).filter(|n| *n >= 0.0 && n.fract() == 0.0).map(|n| n as u64)
        })
    }

    fn find<T>(&self, response: &Value, convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
        self.locations
            .iter()
            .filter_map(|loc| response.pointer(loc))
            .filter_map(Value::as_object)
            .find_map(|record| {
                self.aliases
                    .iter()
                    .filter_map(|alias| record.get(*alias))
                    .find_map(&convert)
            })
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
