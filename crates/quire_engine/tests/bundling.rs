//! Integration tests for require-graph expansion: ordering, deduplication,
//! self placement and cycle detection.

mod common;

use common::{project, registry, source_of};
use quire_engine::{AssetDigest, AssetError, FnEngine, FnProcessor, ProcessingError};
use std::path::{Path, PathBuf};

// ===========================================================================
// Ordering and deduplication
// ===========================================================================

#[test]
fn required_file_precedes_requiring_file() {
    let dir = project(&[("a.js", "// require b.js\nA();"), ("b.js", "B();")]);
    let registry = registry(dir.path());

    let asset = registry.find_asset("a.js").unwrap().unwrap();
    let bundle = asset.as_bundled().unwrap();

    let parts: Vec<&Path> = bundle.parts().iter().map(|p| p.path()).collect();
    assert_eq!(parts, vec![dir.path().join("b.js"), dir.path().join("a.js")]);
    assert_eq!(asset.source().unwrap().as_ref(), b"B();A();");
    assert_eq!(asset.digest().unwrap(), AssetDigest::of(b"B();A();"));
    assert_eq!(asset.length().unwrap(), 8);
    assert_eq!(asset.content_type(), "application/javascript");

    let deps: Vec<&str> = asset.dependencies().iter().map(|p| p.logical_path()).collect();
    assert_eq!(deps, vec!["b.js"]);
}

#[test]
fn diamond_graph_includes_shared_file_once() {
    let dir = project(&[
        ("app.js", "//= require a\n//= require b\nAPP;"),
        ("a.js", "//= require c\nA;"),
        ("b.js", "//= require c\nB;"),
        ("c.js", "C;"),
    ]);
    let registry = registry(dir.path());
    assert_eq!(source_of(&registry, "app.js"), "C;A;B;APP;");

    let asset = registry.find_asset("app.js").unwrap().unwrap();
    let mut paths: Vec<PathBuf> = asset
        .as_bundled()
        .unwrap()
        .parts()
        .iter()
        .map(|p| p.path().to_path_buf())
        .collect();
    let total = paths.len();
    paths.dedup();
    assert_eq!(paths.len(), total);
}

#[test]
fn repeated_require_is_ignored() {
    let dir = project(&[
        ("app.js", "//= require b\n//= require b.js\nAPP;"),
        ("b.js", "B;"),
    ]);
    assert_eq!(source_of(&registry(dir.path()), "app.js"), "B;APP;");
}

#[test]
fn require_self_places_own_body() {
    let dir = project(&[
        ("app.js", "//= require a\n//= require_self\n//= require b\nAPP;"),
        ("a.js", "A;"),
        ("b.js", "B;"),
    ]);
    let registry = registry(dir.path());
    assert_eq!(source_of(&registry, "app.js"), "A;APP;B;");

    let asset = registry.find_asset("app.js").unwrap().unwrap();
    assert_eq!(asset.as_bundled().unwrap().self_index(), 1);
}

#[test]
fn require_tree_includes_directory_sorted() {
    let dir = project(&[
        ("app.js", "//= require_tree ./lib\nAPP;"),
        ("lib/b.js", "B;"),
        ("lib/a.js", "A;"),
        ("lib/nested/c.js", "C;"),
        ("lib/skip.css", "body {}"),
    ]);
    assert_eq!(source_of(&registry(dir.path()), "app.js"), "A;B;C;APP;");
}

#[test]
fn require_tree_keeps_dotted_names() {
    let dir = project(&[
        ("app.js", "//= require_tree ./vendor\nAPP;"),
        ("vendor/jquery-1.7.2.js", "JQ;"),
        ("vendor/util.js", "U;"),
    ]);
    assert_eq!(source_of(&registry(dir.path()), "app.js"), "JQ;U;APP;");
}

#[test]
fn require_tree_from_minified_name_uses_format_extension() {
    let dir = project(&[
        ("app.min.js", "//= require_tree ./lib\nAPP;"),
        ("lib/a.js", "A;"),
        ("lib/b.css", "b{}"),
    ]);
    assert_eq!(source_of(&registry(dir.path()), "app.min.js"), "A;APP;");
}

#[test]
fn relative_requires_resolve_from_requiring_file() {
    let dir = project(&[
        ("js/app.js", "//= require ./widgets/menu\n//= require ../shared/util\nAPP;"),
        ("js/widgets/menu.js", "MENU;"),
        ("shared/util.js", "UTIL;"),
    ]);
    assert_eq!(source_of(&registry(dir.path()), "js/app.js"), "MENU;UTIL;APP;");
}

#[test]
fn css_bundles_concatenate_too() {
    let dir = project(&[
        ("site.css", "/*\n *= require reset\n */\nbody{}"),
        ("reset.css", "*{margin:0}"),
    ]);
    let registry = registry(dir.path());
    let asset = registry.find_asset("site.css").unwrap().unwrap();
    assert_eq!(asset.content_type(), "text/css");
    assert_eq!(asset.source().unwrap().as_ref(), b"*{margin:0}/*\n */\nbody{}");
}

// ===========================================================================
// Cycles
// ===========================================================================

#[test]
fn mutual_require_is_circular() {
    let dir = project(&[("a.js", "//= require b\nA;"), ("b.js", "//= require a\nB;")]);
    let err = registry(dir.path()).find_asset("a.js").unwrap_err();
    match err {
        AssetError::CircularDependency { path, chain } => {
            let a = dir.path().join("a.js");
            let b = dir.path().join("b.js");
            assert_eq!(path, a);
            assert_eq!(chain, vec![a.clone(), b, a]);
        }
        other => panic!("expected circular dependency, got {other}"),
    }
}

#[test]
fn longer_cycle_is_detected() {
    let dir = project(&[
        ("a.js", "//= require b\nA;"),
        ("b.js", "//= require c\nB;"),
        ("c.js", "//= require a\nC;"),
    ]);
    assert!(matches!(
        registry(dir.path()).find_asset("a.js"),
        Err(AssetError::CircularDependency { .. })
    ));
}

#[test]
fn self_require_is_not_a_cycle() {
    let dir = project(&[("a.js", "//= require a.js\nA;")]);
    assert_eq!(source_of(&registry(dir.path()), "a.js"), "A;");
}

#[test]
fn cycle_error_does_not_poison_registry() {
    let dir = project(&[
        ("a.js", "//= require b\nA;"),
        ("b.js", "//= require a\nB;"),
        ("ok.js", "OK;"),
    ]);
    let registry = registry(dir.path());
    assert!(registry.find_asset("a.js").is_err());
    assert_eq!(source_of(&registry, "ok.js"), "OK;");
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn missing_require_is_file_not_found() {
    let dir = project(&[("a.js", "//= require missing\nA;")]);
    match registry(dir.path()).find_asset("a.js").unwrap_err() {
        AssetError::FileNotFound { logical_path } => assert_eq!(logical_path, "missing"),
        other => panic!("expected file not found, got {other}"),
    }
}

#[test]
fn missing_top_level_asset_is_none() {
    let dir = project(&[]);
    assert!(registry(dir.path()).find_asset("nope.js").unwrap().is_none());
}

#[test]
fn engine_failure_is_processing_error() {
    let dir = project(&[("a.js.broken", "A;")]);
    let registry = registry(dir.path());
    registry.register_engine(
        ".broken",
        FnEngine::new("broken", |_: &str, _: &Path| {
            Err(ProcessingError::new("unexpected token"))
        }),
    );
    match registry.find_asset("a.js").unwrap_err() {
        AssetError::Processing { path, source } => {
            assert_eq!(path, dir.path().join("a.js.broken"));
            assert_eq!(source.message, "unexpected token");
        }
        other => panic!("expected processing error, got {other}"),
    }
}

#[test]
fn bundle_processor_failure_surfaces_on_source() {
    let dir = project(&[("a.js", "A;")]);
    let registry = registry(dir.path());
    registry.register_bundle_processor(
        "application/javascript",
        FnProcessor::new("strict", |_: &str, logical: &str| {
            Err(ProcessingError::new(format!("cannot process {logical}")))
        }),
    );
    let asset = registry.find_asset("a.js").unwrap().unwrap();
    assert!(matches!(
        asset.source(),
        Err(AssetError::Processing { .. })
    ));
}

#[test]
fn engines_and_processors_apply_in_order() {
    let dir = project(&[("a.js.twice", "//= require b\na;"), ("b.js", "b;")]);
    let registry = registry(dir.path());
    registry.register_engine(
        ".twice",
        FnEngine::new("twice", |s: &str, _: &Path| Ok(s.replace("a;", "a;a;"))),
    );
    registry.register_bundle_processor(
        "application/javascript",
        FnProcessor::new("upper", |s: &str, _: &str| Ok(s.to_uppercase())),
    );
    registry.set_js_compressor(Some(std::sync::Arc::new(FnProcessor::new(
        "strip",
        |s: &str, _: &str| Ok(s.replace(';', "")),
    ))));
    assert_eq!(source_of(&registry, "a.js"), "BAA");
}
