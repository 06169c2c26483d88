//! 路径显示工具

use std::path::Path;

/// 相对 `base` 显示路径，统一使用 `/` 分隔；不在 `base` 之下时原样显示
pub fn display_relative(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
