pub mod operator;
pub mod trace;
pub mod tree;
pub mod value;

pub use operator::*;
pub use trace::*;
pub use tree::*;
pub use value::Value;
