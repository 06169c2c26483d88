//! 结构校验模块

pub mod discovery;
pub mod report;
pub mod scanner;

pub use self::discovery::discover_sources;
pub use self::report::{Diagnostic, DiagnosticKind, DirectiveStats, FileReport, ValidationReport};
pub use self::scanner::StructuralValidator;
