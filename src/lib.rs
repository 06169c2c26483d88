//! rsamalgam - 源码合并与特性裁剪工具
//! 将多文件 C/C++ 库合并为头文件与实现文件两个产物，并按启用特性裁剪条件块

// 导出全局错误类型
pub use self::error::{AmalgamError, AmalgamResult};

// 导出配置模块
pub use self::config::{BundleConfig, BundleConfigBuilder, ConfigManager};

// 导出特性模块核心接口
pub use self::feature::{ExprError, FeatureCatalog, FeatureExpr, FeatureName, FeatureSet, FeatureSpec};

// 导出指令文法
pub use self::directive::{ConditionalKind, Directive, DirectiveGrammar};

// 导出合并模块核心接口
pub use self::bundler::{
    BundleFiles, BundleOutput, Bundler, ConditionalFilter, ExemptPolicy, InclusionResolver,
    LineSource, SelectorRewriter, VerbatimSource,
};

// 导出校验模块核心接口
pub use self::validator::{
    Diagnostic, DiagnosticKind, DirectiveStats, StructuralValidator, ValidationReport, discover_sources,
};

// 导出工具模块核心接口
pub use self::utils::{GitTimestamp, display_relative};

// 声明所有子模块
pub mod bundler;
pub mod config;
pub mod directive;
pub mod error;
pub mod feature;
pub mod utils;
pub mod validator;
