//! Integration tests for fingerprinted lookups, the static root and
//! precompilation.

mod common;

use common::{project, registry, touch};
use quire_engine::{Asset, AssetDigest, AssetError, PrecompileManifest};

#[test]
fn matching_fingerprint_returns_asset() {
    let dir = project(&[("a.js", "// require b.js\nA();"), ("b.js", "B();")]);
    let registry = registry(dir.path());
    let digest = AssetDigest::of(b"B();A();");

    let asset = registry
        .find_asset(&format!("a-{digest}.js"))
        .unwrap()
        .unwrap();
    assert_eq!(asset.digest().unwrap(), digest);
    assert_eq!(asset.logical_path(), "a.js");
}

#[test]
fn mismatched_fingerprint_returns_none() {
    let dir = project(&[("a.js", "A();")]);
    let registry = registry(dir.path());
    let wrong = AssetDigest::of(b"something else");
    assert!(registry
        .find_asset(&format!("a-{wrong}.js"))
        .unwrap()
        .is_none());
}

#[test]
fn abbreviated_fingerprint_does_not_match() {
    let dir = project(&[("a.js", "A();")]);
    let registry = registry(dir.path());
    let digest = AssetDigest::of(b"A();").to_hex();
    assert!(registry
        .find_asset(&format!("a-{}.js", &digest[..8]))
        .unwrap()
        .is_none());
}

#[test]
fn fingerprinted_lookup_skips_freshness_check() {
    let dir = project(&[("a.js", "A();")]);
    let registry = registry(dir.path());
    let logical = format!("a-{}.js", AssetDigest::of(b"A();"));
    let before = registry.find_asset(&logical).unwrap().unwrap();

    touch(&dir.path().join("a.js"), "A2();");
    assert!(before.is_stale());
    let after = registry.find_asset(&logical).unwrap().unwrap();
    assert_eq!(after.source().unwrap().as_ref(), b"A();");
}

#[test]
fn file_named_like_a_fingerprint_is_still_found() {
    let dir = project(&[("jquery-1234567.js", "JQ;")]);
    let registry = registry(dir.path());
    let asset = registry.find_asset("jquery-1234567.js").unwrap().unwrap();
    assert_eq!(asset.source().unwrap().as_ref(), b"JQ;");
}

#[test]
fn precompiled_output_is_served_from_static_root() {
    let src = project(&[("a.js", "// require b.js\nA();"), ("b.js", "B();")]);
    let out = tempfile::tempdir().unwrap();
    let registry = registry(src.path());

    let manifest = registry.precompile(&["a.js"], out.path()).unwrap();
    let fingerprinted = manifest.assets["a.js"].clone();
    assert_eq!(fingerprinted, format!("a-{}.js", AssetDigest::of(b"B();A();")));
    assert_eq!(PrecompileManifest::load(out.path()).unwrap(), manifest);

    registry.set_static_root(Some(out.path().to_path_buf()));
    let asset = registry.find_asset(&fingerprinted).unwrap().unwrap();
    assert!(matches!(asset, Asset::Static(_)));
    assert_eq!(asset.path(), out.path().join(&fingerprinted));
    assert_eq!(asset.digest().unwrap(), AssetDigest::of(b"B();A();"));
    assert_eq!(asset.source().unwrap().as_ref(), b"B();A();");
    assert!(!asset.is_stale());
}

#[test]
fn static_root_wins_over_search_paths() {
    let src = project(&[("robots.txt", "from source")]);
    let out = project(&[("robots.txt", "from static root")]);
    let registry = registry(src.path());
    registry.set_static_root(Some(out.path().to_path_buf()));
    let asset = registry.find_asset("robots.txt").unwrap().unwrap();
    assert_eq!(asset.source().unwrap().as_ref(), b"from static root");
}

#[test]
fn precompile_of_missing_asset_fails() {
    let src = project(&[("a.js", "A();")]);
    let out = tempfile::tempdir().unwrap();
    let err = registry(src.path())
        .precompile(&["a.js", "missing.js"], out.path())
        .unwrap_err();
    assert!(matches!(err, AssetError::FileNotFound { .. }));
}

#[test]
fn literal_file_with_wrong_fingerprint_is_rejected() {
    let name = format!("app-{}.js", AssetDigest::of(b"something else"));
    let dir = project(&[(name.as_str(), "EVIL;")]);
    let registry = registry(dir.path());
    assert!(registry
        .find_asset(&name)
        .unwrap()
        .is_none());
}

#[test]
fn literal_file_with_matching_fingerprint_is_served() {
    let digest = AssetDigest::of(b"OK;");
    let name = format!("app-{digest}.js");
    let dir = project(&[(name.as_str(), "OK;")]);
    let registry = registry(dir.path());
    let asset = registry
        .find_asset(&name)
        .unwrap()
        .unwrap();
    assert_eq!(asset.digest().unwrap(), digest);
}
