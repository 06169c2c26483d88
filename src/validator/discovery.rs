//! 源文件发现

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// 跳过的目录名
const SKIPPED_DIRS: &[&str] = &["build", "target"];

/// 受限扫描时的目录
const LIMITED_DIRS: &[&str] = &["src", "include"];

/// 递归收集扩展名匹配的文件，结果排序
pub fn discover_sources<S: AsRef<str>>(root: &Path, limit: bool, extensions: &[S]) -> Vec<PathBuf> {
    let roots: Vec<PathBuf> = if limit {
        LIMITED_DIRS.iter().map(|d| root.join(d)).filter(|p| p.is_dir()).collect()
    } else {
        vec![root.to_path_buf()]
    };

    let mut files = Vec::new();
    for dir in &roots {
        for entry in WalkDir::new(dir).into_iter().filter_entry(|e| !is_skipped(e)) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("遍历目录出错: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    files.dedup();
    debug!("在 {} 下发现{}个源文件", root.display(), files.len());
    files
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.as_ref() == ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discovery_skips_hidden_and_build_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for rel in [
            "src/b.cpp",
            "include/a.h",
            "tools/gen.cpp",
            "build/gen.h",
            ".git/x.h",
            "src/readme.md",
        ] {
            touch(dir.path(), rel);
        }

        let exts = ["cpp", "h"];
        let all = discover_sources(dir.path(), false, &exts);
        let rel: Vec<_> = all
            .iter()
            .map(|p| crate::utils::display_relative(p, dir.path()))
            .collect();
        assert_eq!(rel, vec!["include/a.h", "src/b.cpp", "tools/gen.cpp"]);

        let limited = discover_sources(dir.path(), true, &exts);
        assert_eq!(limited.len(), 2);
    }
}
