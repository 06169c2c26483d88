//! 合并模块：包含解析、选择器改写、特性过滤与产物生成

pub mod artifact;
pub mod filter;
pub mod resolver;
pub mod rewriter;
pub mod source;

pub use self::artifact::{BundleFiles, BundleOutput, Bundler};
pub use self::filter::ConditionalFilter;
pub use self::resolver::{ExemptPolicy, IncludeOutcome, InclusionResolver, ResolveContext, ResolveStats};
pub use self::rewriter::SelectorRewriter;
pub use self::source::{LineSource, VerbatimSource};
