//! 端到端测试：在临时目录中构造一个小型库源码树，验证合并与校验行为

use std::fs;
use std::path::Path;

use rsamalgam::{
    AmalgamError, BundleConfig, BundleConfigBuilder, BundleOutput, Bundler, ConfigManager, DiagnosticKind,
    StructuralValidator, discover_sources,
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

const TREE: &[(&str, &str)] = &[
    (
        "include/simdutf.h",
        "#ifndef SIMDUTF_H
#define SIMDUTF_H
#include \"simdutf/implementation.h\"
#include \"simdutf/common.h\"
#include <cstddef>
#endif // SIMDUTF_H
",
    ),
    (
        "include/simdutf/implementation.h",
        "#define SIMDUTF_FEATURE_UTF8 1
#define SIMDUTF_FEATURE_UTF16 1
#define SIMDUTF_FEATURE_LATIN1 1
",
    ),
    ("include/simdutf/common.h", "int common;\n"),
    (
        "src/simdutf.cpp",
        "#include \"simdutf.h\"
#include \"a.cpp\"
#include \"b.cpp\"
#include \"c.cpp\"
#define SIMDUTF_IMPLEMENTATION haswell
#include \"generic/utf8.h\"
#undef SIMDUTF_IMPLEMENTATION
#define SIMDUTF_IMPLEMENTATION westmere
#include \"generic/utf8.h\"
#undef SIMDUTF_IMPLEMENTATION
#include \"generic/utf8.h\"
CALL(SIMDUTF_IMPLEMENTATION)
",
    ),
    ("src/a.cpp", "#include \"simdutf/common.h\"\n#include \"shared.h\"\nint a;\n"),
    ("src/shared.h", "int shared;\n"),
    (
        "src/b.cpp",
        "#include \"shared.h\"
#if SIMDUTF_FEATURE_UTF8 && SIMDUTF_FEATURE_UTF16
int both;
#endif // SIMDUTF_FEATURE_UTF8 && SIMDUTF_FEATURE_UTF16
#if SIMDUTF_FEATURE_UTF8 || SIMDUTF_FEATURE_LATIN1
int either;
#endif // SIMDUTF_FEATURE_UTF8 || SIMDUTF_FEATURE_LATIN1
",
    ),
    ("src/c.cpp", "#include \"../shared.h\"\nint c;\n"),
    ("src/generic/utf8.h", "namespace SIMDUTF_IMPLEMENTATION { int utf8; }\n"),
];

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}

fn write_tree(files: &[(&str, &str)]) -> TempDir {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn config(root: &Path, features: &[&str]) -> BundleConfig {
    features
        .iter()
        .fold(ConfigManager::custom().project_dir(root), |b, f| b.enable_feature(*f))
        .build()
}

fn bundle(root: &Path, features: &[&str]) -> BundleOutput {
    Bundler::new(config(root, features)).unwrap().bundle("2026-01-01 00:00:00 +0000").unwrap()
}

#[test]
fn test_bundling_is_idempotent() {
    let tree = write_tree(TREE);
    assert_eq!(bundle(tree.path(), &[]), bundle(tree.path(), &[]));
    assert_eq!(bundle(tree.path(), &["utf8"]), bundle(tree.path(), &["utf8"]));
}

#[test]
fn test_non_exempt_file_expanded_once() {
    let tree = write_tree(TREE);
    let out = bundle(tree.path(), &[]);

    assert_eq!(out.implementation.matches("int shared;").count(), 1);
    let first = out.implementation.find("int shared;").unwrap();
    let a_begin = out.implementation.find("/* begin file src/a.cpp */").unwrap();
    let a_end = out.implementation.find("/* end file src/a.cpp */").unwrap();
    assert!(a_begin < first && first < a_end);
    assert_eq!(out.header.matches("int common;").count(), 1);
}

#[test]
fn test_header_closure_not_repeated_from_nested_sources() {
    let mut files = TREE.to_vec();
    files.push((
        "src/implementation.cpp",
        "#include \"simdutf.h\"\n#include \"simdutf/implementation.h\"\nint dispatch;\n",
    ));
    files.push(("src/simdutf.cpp", "#include \"simdutf.h\"\n#include \"implementation.cpp\"\n"));
    let tree = write_tree(&files);

    let cases: [&[&str]; 2] = [&[], &["utf8"]];
    for features in cases {
        let out = bundle(tree.path(), features);
        assert!(out.implementation.contains("int dispatch;"));
        assert!(out.implementation.contains("#include \"simdutf.h\"\n"));
        assert!(!out.implementation.contains("/* begin file include/simdutf.h */"));
        assert!(!out.implementation.contains("/* begin file include/simdutf/implementation.h */"));
        assert!(!out.implementation.contains("int common;"));
    }
}

#[test]
fn test_exempt_file_expanded_each_time_with_selector() {
    let tree = write_tree(TREE);
    let out = bundle(tree.path(), &[]);

    assert_eq!(out.implementation.matches("/* begin file src/generic/utf8.h */").count(), 3);
    assert_eq!(out.implementation.matches("/* end file src/generic/utf8.h */").count(), 3);
    assert!(out.implementation.contains("namespace haswell { int utf8; }"));
    assert!(out.implementation.contains("namespace westmere { int utf8; }"));
    assert!(out.implementation.contains("namespace SIMDUTF_IMPLEMENTATION { int utf8; }"));
    assert!(out.implementation.contains("CALL(SIMDUTF_IMPLEMENTATION)"));
    assert!(out.implementation.contains("// redefining SIMDUTF_IMPLEMENTATION to \"haswell\""));
    assert!(!out.implementation.contains("#undef"));
}

#[test]
fn test_header_not_duplicated_in_implementation() {
    let tree = write_tree(TREE);
    let out = bundle(tree.path(), &[]);

    assert!(out.implementation.contains("#include \"simdutf.h\"\n"));
    assert!(!out.implementation.contains("/* begin file include/simdutf.h */"));
    assert!(out.header.contains("/* begin file include/simdutf.h */"));
    assert!(out.header.contains("#include <cstddef>\n"));
}

#[test]
fn test_block_exclusivity() {
    let tree = write_tree(TREE);
    let cases: &[(&[&str], bool, bool)] = &[
        (&["utf8"], false, true),
        (&["utf8", "utf16"], true, true),
        (&["latin1"], false, true),
        (&["utf16"], false, false),
        (&[], true, true),
    ];

    for (features, both, either) in cases {
        let out = bundle(tree.path(), features);
        assert_eq!(out.implementation.contains("int both;"), *both, "{:?}", features);
        assert_eq!(out.implementation.contains("int either;"), *either, "{:?}", features);
    }
}

#[test]
fn test_toggle_rewrite() {
    let tree = write_tree(TREE);
    let out = bundle(tree.path(), &["utf8"]);

    assert!(out.header.contains("#define SIMDUTF_FEATURE_UTF8 1\n"));
    assert!(out.header.contains("#define SIMDUTF_FEATURE_UTF16 0\n"));
    assert!(out.header.contains("#define SIMDUTF_FEATURE_LATIN1 0\n"));
    assert!(out.implementation.contains("// src/b.cpp:1\n"));
}

#[test]
fn test_mismatched_block_aborts_bundle() {
    let mut files = TREE.to_vec();
    files.push((
        "src/c.cpp",
        "int c;\n#if SIMDUTF_FEATURE_UTF8\nint x;\n#endif // SIMDUTF_FEATURE_UTF16\n",
    ));
    let tree = write_tree(&files);

    let cfg = BundleConfigBuilder::from_config(config(tree.path(), &[]))
        .debug_sources(true)
        .build();
    let err = Bundler::new(cfg).unwrap().bundle("T").unwrap_err();
    match err {
        AmalgamError::BlockMismatch {
            file,
            line,
            opened_at,
            ..
        } => {
            assert_eq!(file, "src/c.cpp");
            assert_eq!(opened_at, 2);
            assert_eq!(line, 4);
        }
        other => panic!("unexpected error: {other}"),
    }

    // 校验器批量报告同一问题
    let sources = discover_sources(tree.path(), true, &["cpp", "h"]);
    let report = StructuralValidator::new(&config(tree.path(), &[]))
        .unwrap()
        .check_files(&sources, tree.path());
    assert_eq!(report.count(DiagnosticKind::Mismatch), 1);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_validator_accepts_tree() {
    let tree = write_tree(TREE);
    let sources = discover_sources(tree.path(), false, &["cpp", "h"]);
    assert_eq!(sources.len(), TREE.len());

    let report = StructuralValidator::new(&config(tree.path(), &[]))
        .unwrap()
        .check_files(&sources, tree.path());
    assert!(report.is_success(), "{:?}", report.diagnostics);
    assert_eq!(report.stats.r#if, 2);
    assert_eq!(report.stats.ifndef, 1);
    assert_eq!(report.stats.endif, 3);
}

#[test]
fn test_run_writes_artifacts() {
    let tree = write_tree(TREE);
    let cfg = BundleConfigBuilder::from_config(config(tree.path(), &["utf8"]))
        .output_dir(tree.path().join("dist"))
        .build();
    let files = Bundler::new(cfg).unwrap().run().unwrap();

    let header = fs::read_to_string(&files.header).unwrap();
    assert!(files.header.ends_with("dist/simdutf.h"));
    assert!(header.starts_with("/* auto-generated on "));
    assert!(header.lines().next().unwrap().ends_with(". Do not edit! */"));
    assert!(files.implementation.exists());
}
