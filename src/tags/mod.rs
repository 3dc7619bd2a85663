// Biome tag handling: the tag registry and the resolver built on top of it.

pub mod registry;
pub mod resolver;

pub use registry::{TagError, TagRegistry};
pub use resolver::{ResolveMode, TagResolver};
