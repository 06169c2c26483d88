//! 包含解析器
//! 深度优先展开 `#include "..."`，应用按文件的去重策略

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use super::rewriter::SelectorRewriter;
use super::source::LineSource;
use crate::directive::{Directive, DirectiveGrammar};
use crate::error::{AmalgamError, AmalgamResult};
use crate::utils::display_relative;

/// 允许重复展开的包含路径（按后端重复进入的通用头、begin/end 成对头）
#[derive(Debug, Clone)]
pub struct ExemptPolicy {
    patterns: Vec<Regex>,
}

impl ExemptPolicy {
    /// 每个模式从目标字符串开头匹配
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> AmalgamResult<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&format!("^(?:{})", p.as_ref())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_exempt(&self, target: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(target))
    }
}

/// 解析所需的只读上下文
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// 查找顺序：include 根目录，其次 source 根目录
    pub roots: &'a [PathBuf],
    pub project_dir: &'a Path,
    pub header_entry: &'a str,
    pub implementation_entry: &'a str,
    pub grammar: &'a DirectiveGrammar,
    pub exempt: &'a ExemptPolicy,
    pub source: &'a dyn LineSource,
}

/// 单次包含的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeOutcome {
    Expanded,
    Skipped,
    Unresolved,
}

/// 解析统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub expanded: usize,
    pub skipped: usize,
    pub unresolved: usize,
}

/// 包含解析器（每个产物一份，选择器绑定不跨产物共享；已展开集合只通过 `with_published` 显式传入）
pub struct InclusionResolver<'a> {
    ctx: ResolveContext<'a>,
    seen: HashSet<String>,
    stack: Vec<String>,
    rewriter: SelectorRewriter<'a>,
    output: Vec<String>,
    stats: ResolveStats,
}

impl<'a> InclusionResolver<'a> {
    pub fn new(ctx: ResolveContext<'a>) -> Self {
        Self {
            ctx,
            seen: HashSet::new(),
            stack: Vec::new(),
            rewriter: SelectorRewriter::new(ctx.grammar),
            output: Vec::new(),
            stats: ResolveStats::default(),
        }
    }

    /// 预置已由另一产物发布的文件（实现产物以头文件产物展开过的文件为起点），
    /// 这些文件再次被包含时直接跳过
    pub fn with_published(mut self, published: HashSet<String>) -> Self {
        self.seen.extend(published);
        self
    }

    /// 展开产物入口文件，入口必须存在
    pub fn include_entry(&mut self, entry: &str) -> AmalgamResult<()> {
        match self.include(entry, None)? {
            IncludeOutcome::Unresolved => Err(AmalgamError::MissingEntry(entry.to_string())),
            _ => Ok(()),
        }
    }

    /// 处理一次包含；找不到时原样输出指令行（视为系统/外部依赖）
    pub fn include(&mut self, target: &str, directive_line: Option<&str>) -> AmalgamResult<IncludeOutcome> {
        let target = normalize_target(target);

        for root in self.ctx.roots {
            let path = root.join(target);
            if !path.is_file() {
                continue;
            }

            if !self.ctx.exempt.is_exempt(target) && !self.seen.insert(target.to_string()) {
                debug!("跳过已展开的文件 {}", target);
                self.stats.skipped += 1;
                return Ok(IncludeOutcome::Skipped);
            }

            self.expand(&path, target)?;
            return Ok(IncludeOutcome::Expanded);
        }

        if let Some(line) = directive_line {
            self.output.push(line.to_string());
        }
        self.stats.unresolved += 1;
        Ok(IncludeOutcome::Unresolved)
    }

    fn expand(&mut self, path: &Path, target: &str) -> AmalgamResult<()> {
        if self.stack.iter().any(|t| t == target) {
            let mut chain = self.stack.clone();
            chain.push(target.to_string());
            return Err(AmalgamError::IncludeCycle { chain });
        }

        let rel = display_relative(path, self.ctx.project_dir);
        let lines = self.ctx.source.read_lines(path, &rel)?;
        let is_implementation = target == self.ctx.implementation_entry;

        self.stack.push(target.to_string());
        self.stats.expanded += 1;
        self.output.push(format!("/* begin file {} */", rel));

        for line in &lines {
            let directive = self.ctx.grammar.classify(line);
            if let Directive::Include(included) = directive {
                // 公共头作为独立产物发布，实现产物中保留原始 #include
                if is_implementation && included == self.ctx.header_entry {
                    self.output.push(line.clone());
                } else {
                    self.include(included, Some(line.as_str()))?;
                }
                continue;
            }

            for rewritten in self.rewriter.apply(&directive, line) {
                self.output.push(rewritten.into_owned());
            }
        }

        self.output.push(format!("/* end file {} */", rel));
        self.stack.pop();
        Ok(())
    }

    pub fn stats(&self) -> ResolveStats {
        self.stats
    }

    /// 结束解析，取出输出行
    pub fn finish(self) -> Vec<String> {
        self.into_parts().0
    }

    /// 结束解析，取出输出行与已展开（非豁免）文件集合
    pub fn into_parts(self) -> (Vec<String>, HashSet<String>) {
        debug!(
            "包含解析完成：展开{}次，跳过{}次，外部包含{}条",
            self.stats.expanded, self.stats.skipped, self.stats.unresolved
        );
        (self.output, self.seen)
    }
}

/// 去掉开头的 `../`
fn normalize_target(target: &str) -> &str {
    let mut target = target;
    while let Some(rest) = target.strip_prefix("../") {
        target = rest;
    }
    target
}
