//! 指令文法
//! 合并器、特性过滤器与结构校验器共用的逐行指令识别

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::BundleConfig;
use crate::error::AmalgamResult;

static INCLUDE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*#\s*include\s*"([^"]*)""#).unwrap());
static CONDITIONAL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#\s*(ifdef|ifndef|if)\b(.*)$").unwrap());
static ENDIF_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\s*endif\b(.*)$").unwrap());

/// 条件指令类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionalKind {
    If,
    Ifdef,
    Ifndef,
}

impl ConditionalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionalKind::If => "if",
            ConditionalKind::Ifdef => "ifdef",
            ConditionalKind::Ifndef => "ifndef",
        }
    }
}

/// 单行指令分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive<'a> {
    /// `#include "path"`
    Include(&'a str),
    /// `#define <SELECTOR> value`
    SelectorBind(&'a str),
    /// `#undef <SELECTOR>`
    SelectorUnbind,
    /// `#define <PREFIX>_X value`
    FeatureToggle { name: &'a str, value: &'a str },
    /// `#if` / `#ifdef` / `#ifndef`，条件已去掉行尾注释
    Conditional {
        kind: ConditionalKind,
        condition: &'a str,
    },
    /// `#endif`，可带行尾注释
    Endif { comment: Option<&'a str> },
    Text,
}

/// 指令文法（特性前缀与选择器宏可配置，正则在运行期编译）
#[derive(Debug, Clone)]
pub struct DirectiveGrammar {
    feature_prefix: String,
    selector_macro: String,
    selector_bind: Regex,
    selector_unbind: Regex,
    selector_use: Regex,
    feature_toggle: Regex,
    feature_ident: Regex,
}

impl DirectiveGrammar {
    pub fn new(feature_prefix: &str, selector_macro: &str) -> AmalgamResult<Self> {
        let prefix = regex::escape(feature_prefix);
        let selector = regex::escape(selector_macro);

        Ok(Self {
            feature_prefix: feature_prefix.to_string(),
            selector_macro: selector_macro.to_string(),
            selector_bind: Regex::new(&format!(r"^\s*#\s*define\s+{}\s+(.*?)\s*$", selector))?,
            selector_unbind: Regex::new(&format!(r"^\s*#\s*undef\s+{}\s*$", selector))?,
            selector_use: Regex::new(&format!(r"\b{}\b", selector))?,
            feature_toggle: Regex::new(&format!(r"^\s*#\s*define\s+({}\w*)(.*)$", prefix))?,
            feature_ident: Regex::new(&format!(r"\b{}\w*", prefix))?,
        })
    }

    pub fn from_config(config: &BundleConfig) -> AmalgamResult<Self> {
        Self::new(&config.feature_prefix, &config.selector_macro)
    }

    pub fn feature_prefix(&self) -> &str {
        &self.feature_prefix
    }

    pub fn selector_macro(&self) -> &str {
        &self.selector_macro
    }

    /// 识别单行指令
    pub fn classify<'a>(&self, line: &'a str) -> Directive<'a> {
        if let Some(caps) = INCLUDE_REGEX.captures(line) {
            if let Some(target) = caps.get(1) {
                return Directive::Include(target.as_str());
            }
        }

        if let Some(caps) = self.selector_bind.captures(line) {
            let value = caps.get(1).map_or("", |m| m.as_str());
            return Directive::SelectorBind(value);
        }
        if self.selector_unbind.is_match(line) {
            return Directive::SelectorUnbind;
        }

        if let Some(caps) = self.feature_toggle.captures(line) {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let value = caps.get(2).map_or("", |m| m.as_str().trim());
            return Directive::FeatureToggle { name, value };
        }

        if let Some(caps) = CONDITIONAL_REGEX.captures(line) {
            let kind = match caps.get(1).map(|m| m.as_str()) {
                Some("ifdef") => ConditionalKind::Ifdef,
                Some("ifndef") => ConditionalKind::Ifndef,
                _ => ConditionalKind::If,
            };
            let condition = strip_line_comment(caps.get(2).map_or("", |m| m.as_str()));
            return Directive::Conditional { kind, condition };
        }

        if let Some(caps) = ENDIF_REGEX.captures(line) {
            let rest = caps.get(1).map_or("", |m| m.as_str());
            return Directive::Endif {
                comment: trailing_comment(rest),
            };
        }

        Directive::Text
    }

    /// 条件中是否出现特性宏
    pub fn is_feature_condition(&self, condition: &str) -> bool {
        self.feature_ident.is_match(condition)
    }

    /// `#if` 条件拼接续行后含特性宏时，返回完整条件与额外消耗的行数
    pub fn feature_condition<S: AsRef<str>>(
        &self,
        directive: &Directive<'_>,
        following: &[S],
    ) -> Option<(String, usize)> {
        let Directive::Conditional {
            kind: ConditionalKind::If,
            condition,
        } = directive
        else {
            return None;
        };
        let (joined, consumed) = self.join_continuation(condition, following);
        self.is_feature_condition(&joined).then_some((joined, consumed))
    }

    /// 注释是否以特性宏命名开头
    pub fn starts_with_feature(&self, comment: &str) -> bool {
        comment.trim_start().starts_with(&self.feature_prefix)
    }

    /// 以记号边界替换选择器宏
    pub fn substitute_selector<'a>(&self, line: &'a str, value: &str) -> Cow<'a, str> {
        self.selector_use.replace_all(line, regex::NoExpand(value))
    }

    /// 拼接反斜杠续行的条件，返回完整条件与额外消耗的行数
    pub fn join_continuation<S: AsRef<str>>(
        &self,
        first: &str,
        following: &[S],
    ) -> (String, usize) {
        let mut condition = first.trim().to_string();
        let mut consumed = 0;

        while condition.ends_with('\\') {
            condition.pop();
            let Some(next) = following.get(consumed) else {
                break;
            };
            consumed += 1;
            let next = strip_line_comment(next.as_ref());
            condition = format!("{} {}", condition.trim_end(), next.trim());
        }

        (condition.trim().to_string(), consumed)
    }

    /// 收集 `#endif` 注释；条件未写完（以运算符结尾或括号未闭合）时，
    /// 紧随其后、带特性前缀的纯注释行视为同一条件的续写
    pub fn collect_endif_comment<S: AsRef<str>>(
        &self,
        comment: Option<&str>,
        following: &[S],
    ) -> (Option<String>, usize) {
        let Some(first) = comment.map(str::trim).filter(|c| !c.is_empty()) else {
            return (None, 0);
        };

        let mut text = first.to_string();
        let mut consumed = 0;

        while let Some(next) = following.get(consumed) {
            let Some(part) = comment_only(next.as_ref()) else {
                break;
            };
            if !self.feature_ident.is_match(part) {
                break;
            }
            let continues_operator = part.starts_with("&&") || part.starts_with("||");
            if !(is_incomplete(&text) || continues_operator) {
                break;
            }
            text = format!("{} {}", text, part);
            consumed += 1;
        }

        (Some(text), consumed)
    }
}

/// 去掉行尾 `//` 或 `/* */` 注释
fn strip_line_comment(text: &str) -> &str {
    let cut = [text.find("//"), text.find("/*")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());
    text[..cut].trim()
}

/// 提取 `#endif` 之后的注释文本
fn trailing_comment(rest: &str) -> Option<&str> {
    let rest = rest.trim();
    if let Some(body) = rest.strip_prefix("//") {
        Some(body.trim())
    } else if let Some(body) = rest.strip_prefix("/*") {
        Some(body.trim_end_matches("*/").trim())
    } else {
        None
    }
}

/// 纯注释行（`// ...`）的注释内容
fn comment_only(line: &str) -> Option<&str> {
    line.trim().strip_prefix("//").map(str::trim)
}

fn is_incomplete(text: &str) -> bool {
    let text = text.trim_end();
    let open = text.matches('(').count();
    let close = text.matches(')').count();
    text.ends_with("&&") || text.ends_with("||") || open > close
}
