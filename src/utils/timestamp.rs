//! 产物时间戳
//! 优先使用版本库最近一次提交时间，失败时退回本地时钟

use std::path::Path;
use std::process::{Command, Stdio};

use chrono::Local;
use tracing::{debug, warn};

/// 时间戳获取工具类
pub struct GitTimestamp;

impl GitTimestamp {
    /// 获取 `dir` 所在仓库 HEAD 的提交时间（`git show -s --format=%ci HEAD`）
    pub fn resolve(dir: &Path) -> String {
        match Self::from_git(dir) {
            Some(ts) => {
                debug!("使用提交时间 {}", ts);
                ts
            }
            None => {
                warn!("无法读取 {} 的提交时间，使用本地时间", dir.display());
                Self::wall_clock()
            }
        }
    }

    /// 本地时钟，格式与 `%ci` 一致
    pub fn wall_clock() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string()
    }

    fn from_git(dir: &Path) -> Option<String> {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(dir)
            .args(["show", "-s", "--format=%ci", "HEAD"])
            .stdin(Stdio::null())
            .stderr(Stdio::null());
        // 不向上越过项目目录查找外层仓库
        if let Some(parent) = dir.parent() {
            cmd.env("GIT_CEILING_DIRECTORIES", parent);
        }

        let output = cmd.output().ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8(output.stdout).ok()?;
        let ts = text.trim();
        (!ts.is_empty()).then(|| ts.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_format() {
        let ts = GitTimestamp::wall_clock();
        // 2026-01-31 12:00:00 +0800
        assert_eq!(ts.len(), 25);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
    }

    #[test]
    fn test_falls_back_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let ts = GitTimestamp::resolve(dir.path());
        assert!(!ts.is_empty());
    }
}
