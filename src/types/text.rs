//! `text` type class fields.

/// A text type's special line/whitespace handling, when it is not just "a
/// fixed or size-expression-bounded run of bytes".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SpecialTextType {
    Default,
    LineSeparator,
    LineWithEol,
    LineWithoutEol,
    Whitespace,
}

#[derive(Debug, Clone, Default)]
pub struct TextType {
    pub fixed_value: Option<Vec<u8>>,
    pub special_text_type: Option<SpecialTextType>,
}

impl TextType {
    pub fn new() -> Self {
        TextType::default()
    }

    pub fn with_fixed_value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.fixed_value = Some(value.into());
        self
    }

    pub fn with_special_text_type(mut self, kind: SpecialTextType) -> Self {
        self.special_text_type = Some(kind);
        self
    }

    pub fn special_kind(&self) -> SpecialTextType {
        self.special_text_type.unwrap_or(SpecialTextType::Default)
    }
}
