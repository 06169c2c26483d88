//! 特性模块：已知特性目录、启用集合与条件表达式
pub mod catalog;
pub mod expr;

pub use self::catalog::{FeatureCatalog, FeatureName, FeatureSet, FeatureSpec};
pub use self::expr::{ExprError, FeatureExpr};
