//! 产物生成：头文件与实现文件两次独立的解析过程

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::filter::ConditionalFilter;
use super::resolver::{ExemptPolicy, InclusionResolver, ResolveContext};
use super::source::{LineSource, VerbatimSource};
use crate::config::BundleConfig;
use crate::directive::DirectiveGrammar;
use crate::error::AmalgamResult;
use crate::feature::{FeatureCatalog, FeatureName, FeatureSet};
use crate::utils::GitTimestamp;

/// 生成的两个产物文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOutput {
    pub header: String,
    pub implementation: String,
}

/// 写出的产物路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFiles {
    pub header: PathBuf,
    pub implementation: PathBuf,
}

/// 合并器
pub struct Bundler {
    config: BundleConfig,
    grammar: DirectiveGrammar,
    catalog: FeatureCatalog,
    enabled: FeatureSet,
    exempt: ExemptPolicy,
}

impl Bundler {
    /// 校验配置并预编译所需的正则与特性集合
    pub fn new(config: BundleConfig) -> AmalgamResult<Self> {
        config.validate()?;
        let grammar = DirectiveGrammar::from_config(&config)?;
        let catalog = config.catalog()?;
        let enabled = catalog.enabled_set(&config.enabled_features)?;
        let exempt = ExemptPolicy::new(&config.exempt_patterns)?;

        Ok(Self {
            config,
            grammar,
            catalog,
            enabled,
            exempt,
        })
    }

    pub fn enabled_features(&self) -> impl Iterator<Item = &FeatureName> {
        self.enabled.iter()
    }

    /// 是否经过特性过滤（部分特性构建，或要求保留源码位置）
    pub fn is_filtering(&self) -> bool {
        self.config.debug_sources || !self.enabled.is_complete(&self.catalog)
    }

    /// 生成两个产物，`timestamp` 写入首行
    pub fn bundle(&self, timestamp: &str) -> AmalgamResult<BundleOutput> {
        let filter = ConditionalFilter::new(
            &self.grammar,
            &self.catalog,
            &self.enabled,
            &self.config.toggle_file,
        );
        let source: &dyn LineSource = if self.is_filtering() {
            debug!("启用特性过滤，共{}个特性", self.enabled.len());
            &filter
        } else {
            &VerbatimSource
        };

        let (header, published) = self.assemble(&self.config.header_entry, timestamp, source, HashSet::new())?;
        let (implementation, _) =
            self.assemble(&self.config.implementation_entry, timestamp, source, published)?;
        Ok(BundleOutput {
            header,
            implementation,
        })
    }

    /// 单个产物：新建解析器，选择器绑定不跨产物；
    /// `published` 为头文件产物已包含的文件，实现产物中不再重复展开
    fn assemble(
        &self,
        entry: &str,
        timestamp: &str,
        source: &dyn LineSource,
        published: HashSet<String>,
    ) -> AmalgamResult<(String, HashSet<String>)> {
        let roots = self.config.search_roots();
        let ctx = ResolveContext {
            roots: &roots,
            project_dir: &self.config.project_dir,
            header_entry: &self.config.header_entry,
            implementation_entry: &self.config.implementation_entry,
            grammar: &self.grammar,
            exempt: &self.exempt,
            source,
        };

        let mut resolver = InclusionResolver::new(ctx).with_published(published);
        resolver.include_entry(entry)?;
        let stats = resolver.stats();
        let (lines, expanded) = resolver.into_parts();
        info!(
            "生成 {}：{}行，展开{}个文件，跳过{}次重复包含",
            entry,
            lines.len(),
            stats.expanded,
            stats.skipped
        );

        let mut text = format!("/* auto-generated on {}. Do not edit! */\n", timestamp);
        for line in lines {
            text.push_str(&line);
            text.push('\n');
        }
        Ok((text, expanded))
    }

    /// 写入输出目录，文件名取自入口文件名
    pub fn write(&self, output: &BundleOutput) -> AmalgamResult<BundleFiles> {
        let dir = self.config.output_dir();
        fs::create_dir_all(&dir)?;

        let files = BundleFiles {
            header: dir.join(entry_file_name(&self.config.header_entry)),
            implementation: dir.join(entry_file_name(&self.config.implementation_entry)),
        };
        fs::write(&files.header, &output.header)?;
        fs::write(&files.implementation, &output.implementation)?;
        info!("已写入 {} 与 {}", files.header.display(), files.implementation.display());
        Ok(files)
    }

    /// 获取时间戳、生成并写出
    pub fn run(&self) -> AmalgamResult<BundleFiles> {
        let timestamp = GitTimestamp::resolve(&self.config.project_dir);
        let output = self.bundle(&timestamp)?;
        self.write(&output)
    }
}

fn entry_file_name(entry: &str) -> &OsStr {
    let path = Path::new(entry);
    path.file_name().unwrap_or(path.as_os_str())
}
