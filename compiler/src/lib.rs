//! Tessera lowering pass: typed source tree to lowered IR
//!
//! - [`tast`] is the typed tree handed over by resolution, with its symbol table
//! - [`ir`] is the lowered tree, its dump and its ownership validation
//! - [`registry`] maps source symbols to lowered declarations
//! - [`lower`] walks a typed file and builds its lowered declarations
//! - [`driver`] lowers whole modules

pub mod config;
pub mod driver;
pub mod error_codes;
pub mod ir;
pub mod logging;
pub mod lower;
pub mod registry;
pub mod tast;

pub use config::LoweringConfig;
pub use driver::{lower_module, lower_modules_parallel, LoweredModule, TypedModule};
pub use lower::{LoweredUnit, LoweringDiagnostic, LoweringError, LoweringResult, LoweringSession};
