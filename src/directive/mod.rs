//! 指令模块：合并器与校验器共用的逐行指令文法
pub mod grammar;

pub use self::grammar::{ConditionalKind, Directive, DirectiveGrammar};
