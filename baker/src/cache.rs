use std::{
    fs,
    hash::Hasher,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{bail, Context};
use common::{asset::Asset, MeshHierarchy, TriMesh};
use rustc_hash::FxHasher;

use crate::{build_hierarchy, BuildConfig};

/// A built hierarchy on disk, with what is needed to tell if it is stale.
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct CachedHierarchy {
    pub created_unix_secs: u64,
    /// Hash of the source asset's bytes
    pub source_hash: u64,
    pub hierarchy: MeshHierarchy,
}

impl Asset for CachedHierarchy {}

/// `<source without extension>_naniteCache/hierarchy.bin`
pub fn cache_path(source: &Path) -> anyhow::Result<PathBuf> {
    if source.extension().is_none() {
        bail!("Mesh path {} has no extension", source.display());
    }

    let mut dir = source.with_extension("").into_os_string();
    dir.push("_naniteCache");

    Ok(PathBuf::from(dir).join("hierarchy.bin"))
}

pub fn source_hash(bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(bytes);
    hasher.finish()
}

pub fn read_cache(path: &Path, expected_hash: u64) -> anyhow::Result<MeshHierarchy> {
    let cached = CachedHierarchy::load(path)
        .with_context(|| format!("Failed to read cache {}", path.display()))?;

    if cached.source_hash != expected_hash {
        bail!(
            "Cache {} was built from a different source (created at {})",
            path.display(),
            cached.created_unix_secs
        );
    }

    Ok(cached.hierarchy)
}

pub fn write_cache(path: &Path, source_hash: u64, hierarchy: &MeshHierarchy) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
    }

    let created_unix_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    CachedHierarchy {
        created_unix_secs,
        source_hash,
        hierarchy: hierarchy.clone(),
    }
    .save(path)
    .with_context(|| format!("Failed to write cache {}", path.display()))?;

    Ok(())
}

/// Load the hierarchy of `source` from its cache when the cache matches the source,
/// otherwise build it and refresh the cache.
pub fn load_or_build(source: &Path, config: &BuildConfig) -> anyhow::Result<MeshHierarchy> {
    let bytes =
        fs::read(source).with_context(|| format!("Failed to read mesh {}", source.display()))?;
    let hash = source_hash(&bytes);
    let cache = cache_path(source)?;

    if config.use_cache {
        match read_cache(&cache, hash) {
            Ok(hierarchy) => {
                log::info!("Loaded cached hierarchy from {}", cache.display());
                return Ok(hierarchy);
            }
            Err(e) => log::warn!("Rebuilding hierarchy: {e:#}"),
        }
    }

    let name = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tri_mesh = TriMesh::load(source)?;
    let hierarchy = build_hierarchy(&tri_mesh, name, config)
        .with_context(|| format!("Failed to build hierarchy for {}", source.display()))?;

    if config.use_cache {
        if let Err(e) = write_cache(&cache, hash, &hierarchy) {
            log::warn!("{e:#}");
        }
    }

    Ok(hierarchy)
}

#[cfg(test)]
pub mod test {
    use std::{error::Error, fmt::Write};

    use super::*;

    /// Write a grid as a Wavefront file into a fresh directory
    fn write_grid_obj(dir_name: &str, width: usize) -> Result<PathBuf, Box<dyn Error>> {
        let dir = std::env::temp_dir().join(dir_name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir)?;

        let mut obj = String::new();
        for y in 0..=width {
            for x in 0..=width {
                writeln!(obj, "v {x} {y} 0")?;
            }
        }
        let i = |x: usize, y: usize| y * (width + 1) + x + 1;
        for y in 0..width {
            for x in 0..width {
                writeln!(obj, "f {} {} {} {}", i(x, y), i(x + 1, y), i(x + 1, y + 1), i(x, y + 1))?;
            }
        }

        let path = dir.join("grid.obj");
        fs::write(&path, obj)?;
        Ok(path)
    }

    #[test]
    fn test_cache_path() -> anyhow::Result<()> {
        assert_eq!(
            cache_path(Path::new("assets/bunny.glb"))?,
            PathBuf::from("assets/bunny_naniteCache/hierarchy.bin")
        );
        assert!(cache_path(Path::new("assets/bunny")).is_err());
        Ok(())
    }

    #[test]
    fn test_source_hash() {
        assert_eq!(source_hash(b"mesh"), source_hash(b"mesh"));
        assert_ne!(source_hash(b"mesh"), source_hash(b"mesh2"));
    }

    #[test]
    fn test_stale_cache_rejected() -> Result<(), Box<dyn Error>> {
        let dir = std::env::temp_dir().join("baker_stale_cache_test");
        let path = dir.join("hierarchy.bin");

        let hierarchy = MeshHierarchy {
            name: "empty".to_owned(),
            lods: Vec::new(),
        };
        write_cache(&path, 7, &hierarchy)?;

        assert_eq!(read_cache(&path, 7)?, hierarchy);
        assert!(read_cache(&path, 8).is_err());
        assert!(read_cache(&dir.join("missing.bin"), 7).is_err());

        fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[test]
    fn test_load_or_build_writes_cache() -> Result<(), Box<dyn Error>> {
        let source = write_grid_obj("baker_load_or_build_test", 12)?;
        let config = BuildConfig::default();

        let built = load_or_build(&source, &config)?;
        let cache = cache_path(&source)?;
        assert!(cache.exists());

        let cached = load_or_build(&source, &config)?;
        assert_eq!(built, cached);

        // Editing the source invalidates the cache
        fs::write(&source, fs::read_to_string(&source)? + "\n")?;
        assert!(read_cache(&cache, source_hash(&fs::read(&source)?)).is_err());

        if let Some(dir) = source.parent() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
