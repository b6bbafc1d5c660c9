//! `raw` type class fields.

#[derive(Debug, Clone, Default)]
pub struct RawType {
    /// Length is implied by the byte vector; `fixed_value` bits compare
    /// against raw bits read through the cursor.
    pub fixed_value: Option<Vec<u8>>,
}

impl RawType {
    pub fn new() -> Self {
        RawType::default()
    }

    pub fn with_fixed_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.fixed_value = Some(value.into());
        self
    }
}
