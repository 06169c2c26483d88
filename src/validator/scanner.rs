//! 结构校验器
//! 与过滤器共用指令文法，但不共享运行期状态。
//! 所有条件指令（含 `#ifdef`/`#ifndef`）必须配对；特性块的 `#endif` 注释必须规范化后与开头条件一致。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::report::{DiagnosticKind, FileReport, ValidationReport};
use crate::config::BundleConfig;
use crate::directive::{ConditionalKind, Directive, DirectiveGrammar};
use crate::error::AmalgamResult;
use crate::feature::{FeatureCatalog, FeatureExpr};
use crate::utils::display_relative;

/// 条件栈中的一帧
#[derive(Debug, Clone)]
struct DirectiveRegion {
    kind: ConditionalKind,
    condition: String,
    // 解析失败时为 None，闭合时不再比较
    canonical: Option<String>,
    is_feature: bool,
    line: usize,
}

/// 结构校验器
pub struct StructuralValidator {
    grammar: DirectiveGrammar,
    catalog: FeatureCatalog,
}

impl StructuralValidator {
    /// 校验配置并编译文法
    pub fn new(config: &BundleConfig) -> AmalgamResult<Self> {
        config.validate()?;
        Ok(Self {
            grammar: DirectiveGrammar::from_config(config)?,
            catalog: config.catalog()?,
        })
    }

    /// 校验一段源码文本
    pub fn check_source(&self, name: &str, text: &str) -> FileReport {
        let mut report = FileReport::new(name);
        let lines: Vec<&str> = text.lines().collect();
        let mut stack: Vec<DirectiveRegion> = Vec::new();
        let mut idx = 0;

        while idx < lines.len() {
            let lineno = idx + 1;
            let following = &lines[idx + 1..];

            let directive = self.grammar.classify(lines[idx]);
            match directive {
                Directive::Conditional { kind, condition } => {
                    report.stats.record_open(kind);

                    if let Some((joined, consumed)) = self.grammar.feature_condition(&directive, following) {
                        idx += consumed;
                        let canonical = match FeatureExpr::parse(&joined, &self.catalog) {
                            Ok(expr) => Some(expr.to_string()),
                            Err(e) => {
                                report.push(lineno, DiagnosticKind::Grammar, format!("`#if {}`: {}", joined, e));
                                None
                            }
                        };
                        stack.push(DirectiveRegion {
                            kind,
                            condition: joined,
                            canonical,
                            is_feature: true,
                            line: lineno,
                        });
                    } else {
                        stack.push(DirectiveRegion {
                            kind,
                            condition: condition.to_string(),
                            canonical: None,
                            is_feature: false,
                            line: lineno,
                        });
                    }
                }
                Directive::Endif { comment } => {
                    report.stats.record_endif();
                    let (comment, consumed) = self.grammar.collect_endif_comment(comment, following);
                    idx += consumed;

                    match stack.pop() {
                        None => report.push(lineno, DiagnosticKind::OrphanEndif, "`#endif` 没有对应的开头指令"),
                        Some(region) if region.is_feature => {
                            self.check_closer(&mut report, &region, comment.as_deref(), lineno)
                        }
                        Some(_) => {}
                    }
                }
                _ => {}
            }
            idx += 1;
        }

        for region in stack.iter().filter(|r| r.is_feature) {
            report.push(
                region.line,
                DiagnosticKind::Unclosed,
                format!("`#{} {}` 在文件结束时仍未闭合", region.kind.as_str(), region.condition),
            );
        }

        debug!("{}: 处理{}条条件指令", name, report.stats.total());
        report
    }

    /// 特性块闭合检查：注释存在、命名前缀、规范化后一致
    fn check_closer(&self, report: &mut FileReport, region: &DirectiveRegion, comment: Option<&str>, lineno: usize) {
        let Some(comment) = comment else {
            report.push(
                lineno,
                DiagnosticKind::MissingComment,
                format!("`#endif` 缺少注释，应为 `// {}`（开头于第{}行）", region.condition, region.line),
            );
            return;
        };

        if !self.grammar.starts_with_feature(comment) {
            report.push(
                lineno,
                DiagnosticKind::BadPrefix,
                format!(
                    "`#endif // {}` 应以 {} 开头（开头于第{}行）",
                    comment,
                    self.grammar.feature_prefix(),
                    region.line
                ),
            );
            return;
        }

        match FeatureExpr::parse(comment, &self.catalog) {
            Err(e) => report.push(lineno, DiagnosticKind::Grammar, format!("`#endif // {}`: {}", comment, e)),
            Ok(expr) => {
                if let Some(expected) = &region.canonical {
                    let found = expr.to_string();
                    if &found != expected {
                        report.push(
                            lineno,
                            DiagnosticKind::Mismatch,
                            format!("注释 `{}` 与第{}行的条件 `{}` 不一致", found, region.line, expected),
                        );
                    }
                }
            }
        }
    }

    /// 读取并校验单个文件，读取失败记为诊断
    pub fn check_file(&self, path: &Path, name: &str) -> FileReport {
        match fs::read_to_string(path) {
            Ok(text) => self.check_source(name, &text),
            Err(e) => {
                let mut report = FileReport::new(name);
                report.push(0, DiagnosticKind::Unreadable, format!("无法读取文件: {}", e));
                report
            }
        }
    }

    /// 批量校验，显示路径相对 `base`
    pub fn check_files(&self, paths: &[PathBuf], base: &Path) -> ValidationReport {
        let mut summary = ValidationReport::default();
        for path in paths {
            let name = display_relative(path, base);
            summary.absorb(self.check_file(path, &name));
        }
        info!(
            "校验完成：{}个文件，{}条诊断",
            summary.files_scanned,
            summary.diagnostics.len()
        );
        summary
    }
}
