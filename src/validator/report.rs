//! 校验结果：诊断信息与指令统计

use std::fmt;

use serde::Serialize;

use crate::directive::ConditionalKind;

/// 诊断类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// 特性块的 `#endif` 缺少注释
    MissingComment,
    /// 注释不以特性宏命名开头
    BadPrefix,
    /// 注释与开头条件不一致
    Mismatch,
    /// 条件表达式无法解析
    Grammar,
    /// 没有对应开头的 `#endif`
    OrphanEndif,
    /// 文件结束时特性块未闭合
    Unclosed,
    /// 文件无法读取
    Unreadable,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MissingComment => "missing-comment",
            DiagnosticKind::BadPrefix => "bad-prefix",
            DiagnosticKind::Mismatch => "mismatch",
            DiagnosticKind::Grammar => "grammar",
            DiagnosticKind::OrphanEndif => "orphan-endif",
            DiagnosticKind::Unclosed => "unclosed",
            DiagnosticKind::Unreadable => "unreadable",
        }
    }
}

/// 单条诊断（行号从 1 开始）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: [{}] {}", self.file, self.line, self.kind.as_str(), self.message)
    }
}

/// 各类条件指令的处理数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectiveStats {
    pub r#if: usize,
    pub ifdef: usize,
    pub ifndef: usize,
    pub endif: usize,
}

impl DirectiveStats {
    pub fn record_open(&mut self, kind: ConditionalKind) {
        match kind {
            ConditionalKind::If => self.r#if += 1,
            ConditionalKind::Ifdef => self.ifdef += 1,
            ConditionalKind::Ifndef => self.ifndef += 1,
        }
    }

    pub fn record_endif(&mut self) {
        self.endif += 1;
    }

    pub fn merge(&mut self, other: &DirectiveStats) {
        self.r#if += other.r#if;
        self.ifdef += other.ifdef;
        self.ifndef += other.ifndef;
        self.endif += other.endif;
    }

    /// 按指令名列出的计数
    pub fn entries(&self) -> [(&'static str, usize); 4] {
        [
            ("#if", self.r#if),
            ("#ifdef", self.ifdef),
            ("#ifndef", self.ifndef),
            ("#endif", self.endif),
        ]
    }

    pub fn total(&self) -> usize {
        self.r#if + self.ifdef + self.ifndef + self.endif
    }
}

/// 单个文件的校验结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileReport {
    pub file: String,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: DirectiveStats,
}

impl FileReport {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, line: usize, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            file: self.file.clone(),
            line,
            kind,
            message: message.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// 汇总结果（批量诊断，不在首个错误处停止）
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub files_scanned: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: DirectiveStats,
}

impl ValidationReport {
    pub fn absorb(&mut self, report: FileReport) {
        self.files_scanned += 1;
        self.stats.merge(&report.stats);
        self.diagnostics.extend(report.diagnostics);
    }

    /// 扫描到文件且没有任何诊断
    pub fn is_success(&self) -> bool {
        self.files_scanned > 0 && self.diagnostics.is_empty()
    }

    /// 适合 CI 的退出码
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_fails() {
        let report = ValidationReport::default();
        assert!(!report.is_success());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_absorb_merges_stats_and_diagnostics() {
        let mut clean = FileReport::new("a.h");
        clean.stats.record_open(ConditionalKind::Ifndef);
        clean.stats.record_endif();

        let mut dirty = FileReport::new("b.cpp");
        dirty.stats.record_open(ConditionalKind::If);
        dirty.push(3, DiagnosticKind::Unclosed, "unclosed");

        let mut report = ValidationReport::default();
        report.absorb(clean);
        assert!(report.is_success());
        report.absorb(dirty);

        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.stats.total(), 3);
        assert_eq!(report.count(DiagnosticKind::Unclosed), 1);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.diagnostics[0].to_string(), "b.cpp:3: [unclosed] unclosed");
    }
}
