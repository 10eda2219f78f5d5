//! Step registry.
//!
//! Indexes every available step by id, category, tag and numeric ordinal.
//! The registry is built once from a YAML catalog at startup and is
//! read-only afterwards.
//!
//! # Example
//!
//! ```
//! use orchestrate::registry::{parse_catalog, Selector};
//!
//! let registry = parse_catalog(
//!     "steps:\n  - id: lint\n    category: check\n    command: cargo clippy\n",
//!     "inline",
//! )
//! .unwrap();
//!
//! let selector: Selector = "category:check".parse().unwrap();
//! assert_eq!(registry.resolve(&selector).unwrap().len(), 1);
//! ```

pub mod catalog;
pub mod selector;
pub mod step;

pub use catalog::{load_catalog, parse_catalog, StepCatalog, StepRegistry};
pub use selector::{Selector, SelectorKind};
pub use step::{ParamSpec, Step, StepCommand};
