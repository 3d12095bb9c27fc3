//! Writing fingerprinted copies of assets for static serving.

use std::collections::BTreeMap;
use std::path::Path;

use quire_common::with_fingerprint;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AssetError;
use crate::registry::Registry;

/// File name of the manifest written next to precompiled assets.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Maps logical paths to the fingerprinted paths written for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecompileManifest {
    /// Logical path to fingerprinted path, both relative to the target.
    pub assets: BTreeMap<String, String>,
}

impl PrecompileManifest {
    /// Reads a manifest previously written to `target`.
    pub fn load(target: &Path) -> Result<Self, AssetError> {
        let path = target.join(MANIFEST_FILE);
        let manifest_err = |reason: String| AssetError::Manifest {
            path: path.clone(),
            reason,
        };
        let content = std::fs::read_to_string(&path).map_err(|e| manifest_err(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| manifest_err(e.to_string()))
    }
}

/// Builds every asset in `logical_paths` on the rayon pool and writes each
/// to `target/<dir>/<name>-<digest><ext>`, followed by `target/manifest.json`.
///
/// Fails with [`AssetError::FileNotFound`] if any path has no asset; nothing
/// is written to the manifest in that case.
pub fn precompile(
    registry: &Registry,
    logical_paths: &[&str],
    target: &Path,
) -> Result<PrecompileManifest, AssetError> {
    let assets = logical_paths
        .par_iter()
        .map(|logical| write_asset(registry, logical, target))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    let manifest = PrecompileManifest { assets };

    let path = target.join(MANIFEST_FILE);
    let manifest_err = |reason: String| AssetError::Manifest {
        path: path.clone(),
        reason,
    };
    let json = serde_json::to_string_pretty(&manifest).map_err(|e| manifest_err(e.to_string()))?;
    std::fs::write(&path, json).map_err(|e| manifest_err(e.to_string()))?;

    info!(
        target = %target.display(),
        assets = manifest.assets.len(),
        "precompiled assets"
    );
    Ok(manifest)
}

fn write_asset(
    registry: &Registry,
    logical: &str,
    target: &Path,
) -> Result<(String, String), AssetError> {
    let logical = logical.trim_start_matches('/');
    let asset = registry
        .find_asset(logical)?
        .ok_or_else(|| AssetError::not_found(logical))?;
    let fingerprinted = with_fingerprint(logical, &asset.digest()?.to_hex());

    let out = target.join(&fingerprinted);
    let io_err = |source: std::io::Error| AssetError::Io {
        path: out.clone(),
        source,
    };
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(&out, asset.source()?).map_err(io_err)?;
    Ok((logical.to_string(), fingerprinted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_common::AssetDigest;

    #[test]
    fn writes_fingerprinted_files_and_manifest() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("js")).unwrap();
        std::fs::write(src.path().join("js/app.js"), "// require util\nA();").unwrap();
        std::fs::write(src.path().join("js/util.js"), "U();").unwrap();
        std::fs::write(src.path().join("logo.png"), "png").unwrap();

        let registry = Registry::new(src.path());
        registry.append_path(src.path());
        registry.append_path(src.path().join("js"));

        let manifest = registry
            .precompile(&["js/app.js", "/logo.png"], out.path())
            .unwrap();

        let app_digest = AssetDigest::of(b"U();A();");
        let app_name = format!("js/app-{app_digest}.js");
        assert_eq!(manifest.assets["js/app.js"], app_name);
        assert_eq!(
            std::fs::read_to_string(out.path().join(&app_name)).unwrap(),
            "U();A();"
        );
        let logo_name = format!("logo-{}.png", AssetDigest::of(b"png"));
        assert_eq!(manifest.assets["logo.png"], logo_name);

        assert_eq!(PrecompileManifest::load(out.path()).unwrap(), manifest);
    }

    #[test]
    fn missing_asset_fails() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let registry = Registry::new(src.path());
        registry.append_path(src.path());
        let err = registry.precompile(&["nope.js"], out.path()).unwrap_err();
        assert!(matches!(err, AssetError::FileNotFound { .. }));
        assert!(!out.path().join(MANIFEST_FILE).exists());
    }
}
