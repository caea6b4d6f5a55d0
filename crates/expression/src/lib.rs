//! Template interpolation engine (half of component B, the Execution
//! Context): parses `${...}`/`{{...}}` placeholders once and renders them
//! against anything implementing [`PathResolver`].

mod error;
mod resolver;
mod template;

pub use error::ExpressionError;
pub use resolver::{EmptyResolver, PathResolver};
pub use template::{interpolate, Template, MAX_TEMPLATE_EXPRESSIONS};
