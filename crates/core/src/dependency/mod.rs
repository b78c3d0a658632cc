//! Cartridge dependency analysis
//!
//! Two independent capabilities share the [`Dependency`] model:
//! - an n-ary [`DependencyTree`] built from `dependencies { ... }` blocks of
//!   `build.gradle.kts` files
//! - a [`TrailGraph`] built from breadcrumb trails (`a > b > c`) that detects
//!   dependency cycles and mutual dependencies
//!
//! [`MarkerPolicy`] checks the trails against marker-cartridge assignments.

pub mod cycles;
pub mod declarations;
pub mod markers;
pub mod tree;

pub use cycles::TrailGraph;
pub use declarations::{parse_declarations, EXCLUDED_MARK};
pub use markers::MarkerPolicy;
pub use tree::{Dependency, DependencyKind, DependencyTree, NodeId};
