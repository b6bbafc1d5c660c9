//! `integer`/`real` type class fields: endianness, conversion,
//! ASCII mappings. Grounded on `til::r#enum::Enum`'s `bte` enum-base byte
//! type plus `til::flag.rs`'s bitfield-of-booleans idiom for compact option
//! storage.

/// Declared endianness of a number's physical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Endianness {
    Little,
    Big,
}

/// Conversion 4-tuple: `if v == invalid_value then NaN else
/// (v * numerator / denominator) + add_offset`. Applying a conversion
/// changes the read type to `double`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub numerator: f64,
    pub denominator: f64,
    pub add_offset: f64,
    pub invalid_value: f64,
}

impl Conversion {
    pub fn apply(&self, v: f64) -> f64 {
        if v == self.invalid_value {
            f64::NAN
        } else {
            (v * self.numerator / self.denominator) + self.add_offset
        }
    }
}

/// The numeric value side of an ASCII [`Mapping`] entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MappingValue {
    Integer(i64),
    Float(f64),
}

/// One entry of a number type's value-to-literal table. An
/// empty `literal` matches a zero-length window.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub literal: Vec<u8>,
    pub value: MappingValue,
}

impl Mapping {
    pub fn new(literal: impl Into<Vec<u8>>, value: MappingValue) -> Self {
        Mapping {
            literal: literal.into(),
            value,
        }
    }

    /// `Some(length consumed)` if `window` starts with this mapping's
    /// literal (or the literal is empty and `window` is empty).
    pub fn matches(&self, window: &[u8]) -> bool {
        if self.literal.is_empty() {
            window.is_empty()
        } else {
            window.starts_with(&self.literal)
        }
    }
}

/// `integer`/`real` class fields.
#[derive(Debug, Clone)]
pub struct NumberType {
    pub endianness: Endianness,
    pub unit: Option<String>,
    pub conversion: Option<Conversion>,
    /// Ordered; first matching entry wins.
    pub mappings: Vec<Mapping>,
    /// Bit size to report when no mapping matches and the type has no
    /// `size_expr` of its own.
    pub default_bit_size: Option<i64>,
}

impl NumberType {
    pub fn new(endianness: Endianness) -> Self {
        NumberType {
            endianness,
            unit: None,
            conversion: None,
            mappings: Vec::new(),
            default_bit_size: None,
        }
    }

    pub fn with_conversion(mut self, conversion: Conversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn with_mappings(mut self, mappings: Vec<Mapping>) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn with_default_bit_size(mut self, bit_size: i64) -> Self {
        self.default_bit_size = Some(bit_size);
        self
    }

    /// First mapping whose literal matches the prefix of `window`, if any.
    pub fn matching_mapping(&self, window: &[u8]) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.matches(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_maps_invalid_sentinel_to_nan() {
        let c = Conversion {
            numerator: 1.0,
            denominator: 2.0,
            add_offset: 10.0,
            invalid_value: -9999.0,
        };
        assert!(c.apply(-9999.0).is_nan());
        assert_eq!(c.apply(20.0), 20.0 / 2.0 + 10.0);
    }

    #[test]
    fn mapping_precedence_first_match_wins() {
        let mappings = vec![
            Mapping::new("N/A", MappingValue::Integer(-1)),
            Mapping::new("", MappingValue::Integer(0)),
        ];
        let num = NumberType::new(Endianness::Big).with_mappings(mappings);
        assert_eq!(
            num.matching_mapping(b"N/Axxx").unwrap().value,
            MappingValue::Integer(-1)
        );
        assert_eq!(
            num.matching_mapping(b"").unwrap().value,
            MappingValue::Integer(0)
        );
        assert!(num.matching_mapping(b"007").is_none());
    }
}
