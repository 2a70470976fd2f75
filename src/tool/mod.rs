// ABOUTME: Tool module - defines tools, parameter schemas, the registry and results.
// ABOUTME: Core abstraction for what a capability agent may execute.

mod registry;
mod result;
mod schema;
mod traits;

pub use registry::*;
pub use result::*;
pub use schema::*;
pub use traits::*;

#[cfg(test)]
mod registry_test;
#[cfg(test)]
mod schema_test;
