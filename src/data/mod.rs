mod context;

pub use context::{EvaluationContext, FieldMap};
