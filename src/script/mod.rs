//! Script directive handling
//!
//! Scripts declare their dependencies with line-oriented directives:
//!
//! ```text
//! #r "package: Newtonsoft.Json, 13.0.3"
//! #r "sdk: Microsoft.AspNetCore.App"
//! #r "../lib/Helpers.dll"
//! #load "shared/util.csx"
//! ```

pub mod directives;
pub mod scanner;

pub use directives::{parse_directives, Directive, ReferenceKind};
pub use scanner::{DirectiveScanner, ScanResult};
