//! 特性名称目录
//! 封闭的已知特性集合，以及一次运行中启用的特性集合

use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AmalgamError, AmalgamResult};

/// 特性名称（精确字符串匹配）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureName(String);

impl FeatureName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FeatureName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// 配置中的特性声明：完整宏名 + 命令行短别名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }
}

/// 已知特性目录（构建期固定的封闭集合，保持声明顺序）
#[derive(Debug, Clone)]
pub struct FeatureCatalog {
    names: Vec<FeatureName>,
    aliases: HashMap<String, usize>,
}

impl FeatureCatalog {
    pub fn new(specs: &[FeatureSpec]) -> AmalgamResult<Self> {
        let mut names: Vec<FeatureName> = Vec::with_capacity(specs.len());
        let mut aliases = HashMap::new();

        for spec in specs {
            if spec.name.trim().is_empty() {
                return Err(AmalgamError::InvalidConfig("特性名称不能为空".to_string()));
            }
            if names.iter().any(|n| n.as_str() == spec.name) {
                return Err(AmalgamError::InvalidConfig(format!("重复的特性名称：{}", spec.name)));
            }
            let index = names.len();
            names.push(FeatureName(spec.name.clone()));

            if let Some(alias) = &spec.alias {
                if aliases.insert(alias.clone(), index).is_some() {
                    return Err(AmalgamError::InvalidConfig(format!("重复的特性别名：{}", alias)));
                }
            }
        }

        Ok(Self { names, aliases })
    }

    /// 按完整名称查找
    pub fn lookup(&self, name: &str) -> Option<&FeatureName> {
        self.names.iter().find(|n| n.as_str() == name)
    }

    /// 按完整名称或别名查找
    pub fn resolve(&self, name_or_alias: &str) -> Option<&FeatureName> {
        self.lookup(name_or_alias)
            .or_else(|| self.aliases.get(name_or_alias).map(|&i| &self.names[i]))
    }

    pub fn names(&self) -> impl Iterator<Item = &FeatureName> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 全部已知特性
    pub fn full_set(&self) -> FeatureSet {
        FeatureSet {
            enabled: self.names.iter().cloned().collect(),
        }
    }

    /// 根据请求列表生成启用集合，空列表视为全部启用
    pub fn enabled_set<S: AsRef<str>>(&self, requested: &[S]) -> AmalgamResult<FeatureSet> {
        if requested.is_empty() {
            return Ok(self.full_set());
        }

        let mut enabled = BTreeSet::new();
        for item in requested {
            let item = item.as_ref();
            let name = self
                .resolve(item)
                .ok_or_else(|| AmalgamError::UnknownFeature(item.to_string()))?;
            enabled.insert(name.clone());
        }
        Ok(FeatureSet { enabled })
    }
}

/// 本次运行启用的特性集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    enabled: BTreeSet<FeatureName>,
}

impl FeatureSet {
    pub fn contains(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// 是否覆盖目录中的全部特性（即完整构建）
    pub fn is_complete(&self, catalog: &FeatureCatalog) -> bool {
        catalog.names().all(|n| self.enabled.contains(n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureName> {
        self.enabled.iter()
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}
