//! 全局配置管理，存储所有可配置项

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AmalgamError, AmalgamResult};
use crate::feature::{FeatureCatalog, FeatureSpec};

/// 环境变量覆盖：源码目录
pub const ENV_SOURCE_PATH: &str = "AMALGAMATE_SOURCE_PATH";
/// 环境变量覆盖：头文件目录
pub const ENV_INCLUDE_PATH: &str = "AMALGAMATE_INCLUDE_PATH";
/// 环境变量覆盖：输出目录
pub const ENV_OUTPUT_PATH: &str = "AMALGAMATE_OUTPUT_PATH";

/// 合并配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    // 项目根目录（输出中的相对路径以此为基准）
    pub project_dir: PathBuf,
    // 头文件根目录（优先查找），缺省为 <project>/include
    pub include_dir: Option<PathBuf>,
    // 源码根目录（其次查找），缺省为 <project>/src
    pub source_dir: Option<PathBuf>,
    // 输出目录，缺省为 <project>/singleheader
    pub output_dir: Option<PathBuf>,
    // 公共头文件入口
    pub header_entry: String,
    // 实现文件入口
    pub implementation_entry: String,
    // 需要改写特性开关定义的根文件名
    pub toggle_file: String,
    // 特性宏命名前缀
    pub feature_prefix: String,
    // 选择器宏（按后端重绑定）
    pub selector_macro: String,
    // 已知特性（封闭集合）
    pub known_features: Vec<FeatureSpec>,
    // 启用的特性（名称或别名），为空表示全部
    pub enabled_features: Vec<String>,
    // 允许重复展开的包含路径（正则，从开头匹配）
    pub exempt_patterns: Vec<String>,
    // 是否在输出中保留源码位置注释
    pub debug_sources: bool,
    // 校验器扫描的文件扩展名
    pub source_extensions: Vec<String>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            project_dir: PathBuf::from("."),
            include_dir: None,
            source_dir: None,
            output_dir: None,
            header_entry: "simdutf.h".to_string(),
            implementation_entry: "simdutf.cpp".to_string(),
            toggle_file: "implementation.h".to_string(),
            feature_prefix: "SIMDUTF_FEATURE".to_string(),
            selector_macro: "SIMDUTF_IMPLEMENTATION".to_string(),
            known_features: default_features(),
            enabled_features: Vec::new(),
            exempt_patterns: vec![
                r".*generic/.*\.h".to_string(),
                r".*/begin\.h".to_string(),
                r".*/end\.h".to_string(),
            ],
            debug_sources: false,
            source_extensions: vec!["cpp".to_string(), "h".to_string()],
        }
    }
}

fn default_features() -> Vec<FeatureSpec> {
    vec![
        FeatureSpec::new("SIMDUTF_FEATURE_DETECT_ENCODING", "detect-enc"),
        FeatureSpec::new("SIMDUTF_FEATURE_LATIN1", "latin1"),
        FeatureSpec::new("SIMDUTF_FEATURE_ASCII", "ascii"),
        FeatureSpec::new("SIMDUTF_FEATURE_BASE64", "base64"),
        FeatureSpec::new("SIMDUTF_FEATURE_UTF8", "utf8"),
        FeatureSpec::new("SIMDUTF_FEATURE_UTF16", "utf16"),
        FeatureSpec::new("SIMDUTF_FEATURE_UTF32", "utf32"),
    ]
}

impl BundleConfig {
    pub fn include_dir(&self) -> PathBuf {
        self.include_dir
            .clone()
            .unwrap_or_else(|| self.project_dir.join("include"))
    }

    pub fn source_dir(&self) -> PathBuf {
        self.source_dir
            .clone()
            .unwrap_or_else(|| self.project_dir.join("src"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.project_dir.join("singleheader"))
    }

    /// 查找顺序：include 目录优先，其次 source 目录
    pub fn search_roots(&self) -> [PathBuf; 2] {
        [self.include_dir(), self.source_dir()]
    }

    /// 构建已知特性目录
    pub fn catalog(&self) -> AmalgamResult<FeatureCatalog> {
        FeatureCatalog::new(&self.known_features)
    }

    /// 从进程环境变量覆盖目录配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// 按给定查找函数覆盖目录配置（便于测试注入）
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(ENV_SOURCE_PATH) {
            info!("使用环境变量 {}={}", ENV_SOURCE_PATH, val);
            self.source_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup(ENV_INCLUDE_PATH) {
            info!("使用环境变量 {}={}", ENV_INCLUDE_PATH, val);
            self.include_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup(ENV_OUTPUT_PATH) {
            info!("使用环境变量 {}={}", ENV_OUTPUT_PATH, val);
            self.output_dir = Some(PathBuf::from(val));
        }
    }

    /// 校验配置项
    pub fn validate(&self) -> AmalgamResult<()> {
        let required = [
            ("header_entry", &self.header_entry),
            ("implementation_entry", &self.implementation_entry),
            ("toggle_file", &self.toggle_file),
            ("feature_prefix", &self.feature_prefix),
            ("selector_macro", &self.selector_macro),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AmalgamError::InvalidConfig(format!("{} 不能为空", field)));
            }
        }

        let catalog = self.catalog()?;
        if catalog.is_empty() {
            return Err(AmalgamError::InvalidConfig("至少需要一个已知特性".to_string()));
        }
        if let Some(bad) = catalog
            .names()
            .find(|n| !n.as_str().starts_with(&self.feature_prefix))
        {
            return Err(AmalgamError::InvalidConfig(format!(
                "特性 {} 不符合前缀 {}",
                bad, self.feature_prefix
            )));
        }

        // 启用列表中的未知特性在此提前暴露
        catalog.enabled_set(&self.enabled_features)?;
        Ok(())
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> BundleConfig {
        BundleConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> BundleConfigBuilder {
        BundleConfigBuilder::new()
    }

    /// 从JSON文件加载配置，缺省字段取默认值
    pub fn load_json(path: &Path) -> AmalgamResult<BundleConfig> {
        let content = fs::read_to_string(path).map_err(|source| AmalgamError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: BundleConfig = serde_json::from_str(&content)?;
        config.validate()?;
        debug!("已加载配置文件 {}", path.display());
        Ok(config)
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone)]
pub struct BundleConfigBuilder {
    config: BundleConfig,
}

impl Default for BundleConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BundleConfig::default(),
        }
    }

    /// 基于已有配置继续修改
    pub fn from_config(config: BundleConfig) -> Self {
        Self { config }
    }

    pub fn project_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.project_dir = path.into();
        self
    }

    pub fn include_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.include_dir = Some(path.into());
        self
    }

    pub fn source_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_dir = Some(path.into());
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(path.into());
        self
    }

    pub fn header_entry(mut self, name: impl Into<String>) -> Self {
        self.config.header_entry = name.into();
        self
    }

    pub fn implementation_entry(mut self, name: impl Into<String>) -> Self {
        self.config.implementation_entry = name.into();
        self
    }

    pub fn toggle_file(mut self, name: impl Into<String>) -> Self {
        self.config.toggle_file = name.into();
        self
    }

    pub fn feature_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.feature_prefix = prefix.into();
        self
    }

    pub fn selector_macro(mut self, name: impl Into<String>) -> Self {
        self.config.selector_macro = name.into();
        self
    }

    pub fn known_features(mut self, features: Vec<FeatureSpec>) -> Self {
        self.config.known_features = features;
        self
    }

    pub fn enable_feature(mut self, name: impl Into<String>) -> Self {
        self.config.enabled_features.push(name.into());
        self
    }

    pub fn enabled_features(mut self, names: Vec<String>) -> Self {
        self.config.enabled_features = names;
        self
    }

    pub fn exempt_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.exempt_patterns = patterns;
        self
    }

    pub fn debug_sources(mut self, enabled: bool) -> Self {
        self.config.debug_sources = enabled;
        self
    }

    pub fn source_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.source_extensions = extensions;
        self
    }

    pub fn build(self) -> BundleConfig {
        self.config
    }
}
