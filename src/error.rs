//! 全局错误类型定义

use std::io::Error as IoError;
use std::path::PathBuf;

use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::feature::ExprError;

#[derive(Error, Debug)]
pub enum AmalgamError {
    // 特性表达式相关错误
    #[error("{file}:{line}: {source}")]
    Expression {
        file: String,
        line: usize,
        #[source]
        source: ExprError,
    },
    #[error("未知特性：{0}")]
    UnknownFeature(String),

    // 条件块结构错误
    #[error("{file}:{line}: 特性块已在第{opened_at}行打开，不允许嵌套")]
    NestedFeatureBlock {
        file: String,
        line: usize,
        opened_at: usize,
    },
    #[error("{file}:{line}: #endif 条件 '{found}' 与第{opened_at}行的 #if 条件 '{expected}' 不一致")]
    BlockMismatch {
        file: String,
        line: usize,
        opened_at: usize,
        expected: String,
        found: String,
    },
    #[error("{file}:{line}: 特性块未打开，发现孤立的 #endif")]
    OrphanEndif { file: String, line: usize },
    #[error("{file}:{opened_at}: 特性块 '{condition}' 到文件末尾仍未关闭")]
    UnclosedBlock {
        file: String,
        opened_at: usize,
        condition: String,
    },
    #[error("{file}:{line}: 无效的特性开关定义 '{text}'，应为 '#define <FEATURE> 1'")]
    InvalidToggle {
        file: String,
        line: usize,
        text: String,
    },

    // 包含解析相关错误
    #[error("循环包含：{}", chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },
    #[error("入口文件 {0} 在 include/source 目录中均未找到")]
    MissingEntry(String),

    // 配置相关错误
    #[error("配置无效：{0}")]
    InvalidConfig(String),
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("读取文件 {} 失败：{source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
}

// 全局Result类型
pub type AmalgamResult<T> = Result<T, AmalgamError>;
