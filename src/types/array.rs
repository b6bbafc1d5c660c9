//! `array` type class fields. Grounded on `til::array::Array`
//! (single fixed-count base-type array), generalized to CODA's
//! multi-dimensional, possibly size-expression-bounded shape.

use crate::expr::Expression;
use crate::types::Type;

/// CODA caps array rank at `CODA_MAX_NUM_DIMS`.
pub const CODA_MAX_NUM_DIMS: usize = 8;

/// One dimension of an [`ArrayType`]: either a fixed, statically-known
/// size, or an expression evaluated against a cursor at read time.
#[derive(Debug, Clone)]
pub enum Dimension {
    Fixed(u32),
    Expr(Expression),
}

#[derive(Debug, Clone)]
pub struct ArrayType {
    pub base: Type,
    pub dimensions: Vec<Dimension>,
}

impl ArrayType {
    pub fn new(base: Type, dimensions: Vec<Dimension>) -> Self {
        debug_assert!(
            dimensions.len() <= CODA_MAX_NUM_DIMS,
            "array rank exceeds CODA_MAX_NUM_DIMS"
        );
        ArrayType { base, dimensions }
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// The product of all dimensions that are statically known; `None` if
    /// any dimension requires an expression evaluation.
    pub fn static_num_elements(&self) -> Option<u64> {
        self.dimensions
            .iter()
            .try_fold(1u64, |acc, dim| match dim {
                Dimension::Fixed(n) => Some(acc * u64::from(*n)),
                Dimension::Expr(_) => None,
            })
    }
}
