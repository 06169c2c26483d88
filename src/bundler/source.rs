//! 行来源：决定一个文件以何种形式交给包含解析器

use std::fs;
use std::path::Path;

use crate::error::{AmalgamError, AmalgamResult};

/// 行来源接口
pub trait LineSource {
    /// 读取文件，返回交给解析器的行（`rel` 为输出中使用的相对路径）
    fn read_lines(&self, path: &Path, rel: &str) -> AmalgamResult<Vec<String>>;
}

/// 原样读取（完整构建）
#[derive(Debug, Default, Clone, Copy)]
pub struct VerbatimSource;

impl LineSource for VerbatimSource {
    fn read_lines(&self, path: &Path, _rel: &str) -> AmalgamResult<Vec<String>> {
        read_trimmed_lines(path)
    }
}

/// 读取整个文件并去掉每行行尾空白
pub(crate) fn read_trimmed_lines(path: &Path) -> AmalgamResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|source| AmalgamError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(|l| l.trim_end().to_string()).collect())
}
