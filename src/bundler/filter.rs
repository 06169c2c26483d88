//! 特性条件过滤器
//! 按启用特性保留或丢弃 `#if <feature expr>` ... `#endif // <feature expr>` 块，
//! 并改写根文件中的特性开关定义。
//!
//! 约束：
//! 1. 特性块不允许嵌套
//! 2. 每个特性块的 `#endif` 必须以注释重复开头条件（规范化后逐字符相等）

use std::path::Path;

use tracing::{debug, warn};

use super::source::{LineSource, read_trimmed_lines};
use crate::directive::{Directive, DirectiveGrammar};
use crate::error::{AmalgamError, AmalgamResult};
use crate::feature::{FeatureCatalog, FeatureExpr, FeatureSet};

/// 当前打开的特性块
#[derive(Debug, Clone)]
struct OpenRegion {
    canonical: String,
    opened_at: usize,
    included: bool,
}

/// 特性条件过滤器
#[derive(Debug, Clone)]
pub struct ConditionalFilter<'a> {
    grammar: &'a DirectiveGrammar,
    catalog: &'a FeatureCatalog,
    enabled: &'a FeatureSet,
    toggle_file: &'a str,
}

impl<'a> ConditionalFilter<'a> {
    pub fn new(
        grammar: &'a DirectiveGrammar,
        catalog: &'a FeatureCatalog,
        enabled: &'a FeatureSet,
        toggle_file: &'a str,
    ) -> Self {
        Self {
            grammar,
            catalog,
            enabled,
            toggle_file,
        }
    }

    /// 是否为需要改写特性开关的根文件
    pub fn is_toggle_file(&self, rel: &str) -> bool {
        rel == self.toggle_file || rel.ends_with(&format!("/{}", self.toggle_file))
    }

    /// 过滤一个文件的全部行
    pub fn filter_lines<S: AsRef<str>>(&self, rel: &str, lines: &[S]) -> AmalgamResult<Vec<String>> {
        let root_file = self.is_toggle_file(rel);
        let mut output = Vec::with_capacity(lines.len() * 2);
        let mut region: Option<OpenRegion> = None;
        let mut prev_line = String::new();
        let mut dropped = 0usize;
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx].as_ref();
            let lineno = idx + 1;
            let following = &lines[idx + 1..];

            let directive = self.grammar.classify(line);
            if let Some((joined, consumed)) = self.grammar.feature_condition(&directive, following) {
                if let Some(open) = &region {
                    return Err(AmalgamError::NestedFeatureBlock {
                        file: rel.to_string(),
                        line: lineno,
                        opened_at: open.opened_at,
                    });
                }

                let expr = self.parse(rel, lineno, &joined)?;
                let included = expr.evaluate(self.enabled);
                debug!("{}:{}: 特性块 {} -> {}", rel, lineno, expr, if included { "保留" } else { "移除" });

                region = Some(OpenRegion {
                    canonical: expr.to_string(),
                    opened_at: lineno,
                    included,
                });
                idx += 1 + consumed;
                continue;
            }

            match directive {
                Directive::FeatureToggle { name, value } if root_file => {
                    output.push(self.rewrite_toggle(rel, lineno, line, name, value)?);
                    idx += 1;
                    continue;
                }
                Directive::Endif { comment } => {
                    let (collected, consumed) = self.grammar.collect_endif_comment(comment, following);
                    if let Some(text) = collected.filter(|c| self.grammar.is_feature_condition(c)) {
                        let Some(open) = region.take() else {
                            return Err(AmalgamError::OrphanEndif {
                                file: rel.to_string(),
                                line: lineno,
                            });
                        };

                        let closing = self.parse(rel, lineno, &text)?.to_string();
                        if closing != open.canonical {
                            return Err(AmalgamError::BlockMismatch {
                                file: rel.to_string(),
                                line: lineno,
                                opened_at: open.opened_at,
                                expected: open.canonical,
                                found: closing,
                            });
                        }
                        idx += 1 + consumed;
                        continue;
                    }
                }
                _ => {}
            }

            if region.as_ref().is_none_or(|r| r.included) {
                Self::emit(&mut output, &mut prev_line, rel, lineno, line);
            } else {
                dropped += 1;
            }
            idx += 1;
        }

        if let Some(open) = region {
            return Err(AmalgamError::UnclosedBlock {
                file: rel.to_string(),
                opened_at: open.opened_at,
                condition: open.canonical,
            });
        }

        if dropped > 0 {
            debug!("{}: 按特性移除 {} 行", rel, dropped);
        }
        Ok(output)
    }

    /// 输出一行源码：前置来源注释（续行除外），并折叠连续空行
    fn emit(output: &mut Vec<String>, prev_line: &mut String, rel: &str, lineno: usize, line: &str) {
        if line.is_empty() && prev_line.is_empty() {
            return;
        }
        if !prev_line.ends_with('\\') {
            output.push(format!("// {}:{}", rel, lineno));
        }
        output.push(line.to_string());
        *prev_line = line.to_string();
    }

    /// `#define FEATURE 1` → 启用时保持 1，否则改为 0
    fn rewrite_toggle(
        &self,
        rel: &str,
        lineno: usize,
        line: &str,
        name: &str,
        value: &str,
    ) -> AmalgamResult<String> {
        if value != "1" {
            return Err(AmalgamError::InvalidToggle {
                file: rel.to_string(),
                line: lineno,
                text: line.to_string(),
            });
        }
        if self.catalog.lookup(name).is_none() {
            warn!("{}:{}: 特性开关 {} 不在已知特性列表中，按未启用处理", rel, lineno, name);
        }

        if self.enabled.contains(name) {
            Ok(line.to_string())
        } else {
            Ok(format!("#define {} 0", name))
        }
    }

    fn parse(&self, rel: &str, lineno: usize, text: &str) -> AmalgamResult<FeatureExpr> {
        FeatureExpr::parse(text, self.catalog).map_err(|source| AmalgamError::Expression {
            file: rel.to_string(),
            line: lineno,
            source,
        })
    }
}

impl LineSource for ConditionalFilter<'_> {
    fn read_lines(&self, path: &Path, rel: &str) -> AmalgamResult<Vec<String>> {
        let lines = read_trimmed_lines(path)?;
        self.filter_lines(rel, &lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{ExprError, FeatureSpec};

    struct Fixture {
        grammar: DirectiveGrammar,
        catalog: FeatureCatalog,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grammar: DirectiveGrammar::new("FEATURE", "SELECTOR").unwrap(),
                catalog: FeatureCatalog::new(&[
                    FeatureSpec::new("FEATURE_A", "a"),
                    FeatureSpec::new("FEATURE_B", "b"),
                ])
                .unwrap(),
            }
        }

        fn run(&self, enabled: &[&str], rel: &str, text: &str) -> AmalgamResult<Vec<String>> {
            let enabled = if enabled.is_empty() {
                FeatureSet::default()
            } else {
                self.catalog.enabled_set(enabled).unwrap()
            };
            let filter = ConditionalFilter::new(&self.grammar, &self.catalog, &enabled, "implementation.h");
            let lines: Vec<&str> = text.lines().collect();
            filter.filter_lines(rel, &lines)
        }

        /// 去掉来源注释，只保留源码行
        fn code(&self, enabled: &[&str], text: &str) -> Vec<String> {
            self.run(enabled, "src/x.cpp", text)
                .unwrap()
                .into_iter()
                .filter(|l| !l.starts_with("// src/x.cpp:"))
                .collect()
        }
    }

    const GATED: &str = "\
int always;
#if FEATURE_A && FEATURE_B
int both;
#endif // FEATURE_A && FEATURE_B
#if FEATURE_A || FEATURE_B
int either;
#endif // FEATURE_A || FEATURE_B
";

    #[test]
    fn test_and_or_blocks() {
        let f = Fixture::new();
        assert_eq!(f.code(&["a", "b"], GATED), vec!["int always;", "int both;", "int either;"]);
        assert_eq!(f.code(&["a"], GATED), vec!["int always;", "int either;"]);
        assert_eq!(f.code(&["b"], GATED), vec!["int always;", "int either;"]);
        assert_eq!(f.code(&[], GATED), vec!["int always;"]);
    }

    #[test]
    fn test_provenance_and_blank_collapse() {
        let f = Fixture::new();
        let text = "int a; \\\n  int b;\n\n\n\nint c;\n";
        let out = f.run(&["a"], "src/x.cpp", text).unwrap();
        assert_eq!(
            out,
            vec![
                "// src/x.cpp:1",
                "int a; \\",
                "  int b;",
                "// src/x.cpp:3",
                "",
                "// src/x.cpp:6",
                "int c;",
            ]
        );
    }

    #[test]
    fn test_continued_condition_and_comment() {
        let f = Fixture::new();
        let text = "\
#if FEATURE_A && \\
    FEATURE_B
int both;
#endif // FEATURE_A &&
       // FEATURE_B
int after;
";
        assert_eq!(f.code(&["a", "b"], text), vec!["int both;", "int after;"]);
        assert_eq!(f.code(&["a"], text), vec!["int after;"]);
    }

    #[test]
    fn test_feature_condition_on_continuation_line() {
        let f = Fixture::new();
        let text = "\
#if \\
    FEATURE_B
int b_only;
#endif // FEATURE_B
#if defined(X) && \\
    defined(Y)
int plain;
#endif
";
        assert_eq!(
            f.code(&["a"], text),
            vec!["#if defined(X) && \\", "    defined(Y)", "int plain;", "#endif"]
        );
        assert_eq!(f.code(&["b"], text)[0], "int b_only;");
    }

    #[test]
    fn test_non_ascii_closing_comment_is_an_error() {
        let f = Fixture::new();
        let err = f
            .run(&["a"], "src/x.cpp", "#if FEATURE_A\nint a;\n#endif // FEATURE_A — done\n")
            .unwrap_err();
        assert!(matches!(
            err,
            AmalgamError::Expression { line: 3, source: ExprError::Grammar { .. }, .. }
        ));
    }

    #[test]
    fn test_plain_conditionals_pass_through() {
        let f = Fixture::new();
        let text = "\
#if FEATURE_A
#ifdef _MSC_VER
int msvc;
#endif
#if defined(X) // X
int x;
#endif // X
#endif // FEATURE_A
";
        assert_eq!(
            f.code(&["a"], text),
            vec!["#ifdef _MSC_VER", "int msvc;", "#endif", "#if defined(X) // X", "int x;", "#endif // X"]
        );
        assert!(f.code(&["b"], text).is_empty());
    }

    #[test]
    fn test_nested_feature_block_rejected() {
        let f = Fixture::new();
        let text = "#if FEATURE_A\n#if FEATURE_B\n#endif // FEATURE_B\n#endif // FEATURE_A\n";
        let err = f.run(&["a"], "src/x.cpp", text).unwrap_err();
        assert!(matches!(err, AmalgamError::NestedFeatureBlock { line: 2, opened_at: 1, .. }));
    }

    #[test]
    fn test_mismatched_closer_names_both_lines() {
        let f = Fixture::new();
        let text = "#if FEATURE_A\nint a;\n#endif // FEATURE_B\n";
        let err = f.run(&["a"], "src/x.cpp", text).unwrap_err();
        match err {
            AmalgamError::BlockMismatch { line, opened_at, expected, found, .. } => {
                assert_eq!((line, opened_at), (3, 1));
                assert_eq!(expected, "FEATURE_A");
                assert_eq!(found, "FEATURE_B");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_orphan_unclosed_and_grammar_errors() {
        let f = Fixture::new();

        let err = f.run(&["a"], "src/x.cpp", "int a;\n#endif // FEATURE_A\n").unwrap_err();
        assert!(matches!(err, AmalgamError::OrphanEndif { line: 2, .. }));

        let err = f.run(&["a"], "src/x.cpp", "#if FEATURE_A\nint a;\n").unwrap_err();
        assert!(matches!(err, AmalgamError::UnclosedBlock { opened_at: 1, .. }));

        let err = f.run(&["a"], "src/x.cpp", "#if FEATURE_A && FEATURE_B || FEATURE_A\n").unwrap_err();
        assert!(matches!(
            err,
            AmalgamError::Expression { line: 1, source: ExprError::Grammar { .. }, .. }
        ));

        let err = f.run(&["a"], "src/x.cpp", "#if FEATURE_C\n#endif // FEATURE_C\n").unwrap_err();
        assert!(matches!(
            err,
            AmalgamError::Expression { source: ExprError::UnknownFeature(ref n), .. } if n == "FEATURE_C"
        ));
    }

    #[test]
    fn test_toggle_rewrite_only_in_root_file() {
        let f = Fixture::new();
        let text = "#define FEATURE_A 1\n#define FEATURE_B 1\n";

        let out = f.run(&["a"], "include/lib/implementation.h", text).unwrap();
        assert_eq!(out, vec!["#define FEATURE_A 1", "#define FEATURE_B 0"]);

        let out = f.code(&["a"], text);
        assert_eq!(out, vec!["#define FEATURE_A 1", "#define FEATURE_B 1"]);

        let err = f
            .run(&["a"], "include/lib/implementation.h", "#define FEATURE_A 2\n")
            .unwrap_err();
        assert!(matches!(err, AmalgamError::InvalidToggle { line: 1, .. }));
    }
}
