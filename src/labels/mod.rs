//! Label subsystem.
//!
//! # Data Flow
//! ```text
//! Service labels (flat key/value map)
//!     → parser.rs (route index + directive name per key)
//!     → bundle.rs (one DirectiveBundle per route index)
//!     → classify: route | snippet "(name)" | global settings
//!     → snippets.rs (merge imported snippets into route bundles)
//! ```

pub mod bundle;
pub mod directive;
pub mod parser;
pub mod snippets;

pub use bundle::{BundleKind, DirectiveBundle, DirectiveEntry, RouteIndex};
pub use directive::Directive;
pub use parser::{LabelParser, ParsedLabels};
pub use snippets::SnippetTable;
