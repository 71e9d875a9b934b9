//! gzip-compressed tar bundles

use async_trait::async_trait;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};
use tempfile::NamedTempFile;
use tokio::task;

use super::{BundleError, BundleWriter, ModuleFile, StaticAssets, STATIC_DIR};
use crate::manifest::MANIFEST_FILE;

pub const MODULES_DIR: &str = "modules";

/// Writes bundles as `.tar.gz`: the manifest at the root, compiled modules
/// under `modules/`, static files under `static/`. The archive is built in a
/// temporary file next to the destination and renamed into place.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarBundleWriter;

impl TarBundleWriter {
    pub fn new() -> Self {
        Self
    }

    fn write_sync(
        manifest: &[u8],
        modules: &[ModuleFile],
        static_assets: Option<&StaticAssets>,
        output: &Path,
    ) -> Result<(), BundleError> {
        let fail = |reason: String| BundleError::Write {
            path: output.to_path_buf(),
            reason,
        };

        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&dir).map_err(|e| fail(e.to_string()))?;

        let encoder = GzEncoder::new(BufWriter::new(temp.as_file()), Compression::default());
        let mut builder = Builder::new(encoder);

        let mut header = Header::new_gnu();
        header.set_size(manifest.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
        header.set_cksum();
        builder
            .append_data(&mut header, MANIFEST_FILE, manifest)
            .map_err(|e| fail(format!("{MANIFEST_FILE}: {e}")))?;

        for module in modules {
            builder
                .append_path_with_name(&module.path, format!("{MODULES_DIR}/{}", module.name))
                .map_err(|e| fail(format!("{}: {e}", module.path.display())))?;
        }

        if let Some(assets) = static_assets {
            for relative in &assets.files {
                let source = assets.full_path(relative);
                builder
                    .append_path_with_name(&source, format!("{STATIC_DIR}/{relative}"))
                    .map_err(|e| fail(format!("{}: {e}", source.display())))?;
            }
        }

        let encoder = builder.into_inner().map_err(|e| fail(e.to_string()))?;
        let mut writer = encoder.finish().map_err(|e| fail(e.to_string()))?;
        std::io::Write::flush(&mut writer).map_err(|e| fail(e.to_string()))?;
        drop(writer);

        temp.persist(output).map_err(|e| fail(e.error.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl BundleWriter for TarBundleWriter {
    async fn write(
        &self,
        manifest: &[u8],
        modules: &[ModuleFile],
        static_assets: Option<&StaticAssets>,
        output: &Path,
    ) -> Result<(), BundleError> {
        let manifest = manifest.to_vec();
        let modules = modules.to_vec();
        let static_assets = static_assets.cloned();
        let target = output.to_path_buf();

        task::spawn_blocking(move || {
            Self::write_sync(&manifest, &modules, static_assets.as_ref(), &target)
        })
        .await
        .map_err(|e| BundleError::Write {
            path: output.to_path_buf(),
            reason: format!("task join error: {e}"),
        })?
    }
}

/// Entries of an existing bundle, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleContents {
    pub manifest: String,
    /// Module file names, e.g. `fetch.wasm`.
    pub modules: Vec<String>,
    /// Paths relative to the static root.
    pub static_files: Vec<String>,
}

/// Read back a bundle written by [`TarBundleWriter`].
pub fn read_bundle(path: &Path) -> Result<BundleContents, BundleError> {
    let fail = |reason: String| BundleError::Read {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| fail(e.to_string()))?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut contents = BundleContents::default();

    for entry in archive.entries().map_err(|e| fail(e.to_string()))? {
        let mut entry = entry.map_err(|e| fail(e.to_string()))?;
        let name = entry
            .path()
            .map_err(|e| fail(e.to_string()))?
            .to_string_lossy()
            .to_string();

        if name == MANIFEST_FILE {
            entry
                .read_to_string(&mut contents.manifest)
                .map_err(|e| fail(e.to_string()))?;
        } else if let Some(module) = name.strip_prefix(&format!("{MODULES_DIR}/")) {
            contents.modules.push(module.to_string());
        } else if let Some(file) = name.strip_prefix(&format!("{STATIC_DIR}/")) {
            contents.static_files.push(file.to_string());
        }
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read_bundle() {
        let dir = TempDir::new().unwrap();
        let module_path = dir.path().join("fetch.wasm");
        std::fs::write(&module_path, b"\0asm\x01\0\0\0").unwrap();

        std::fs::create_dir_all(dir.path().join("static/css")).unwrap();
        std::fs::write(dir.path().join("static/css/site.css"), "body{}").unwrap();
        let assets = StaticAssets {
            root: dir.path().join("static"),
            files: vec!["css/site.css".to_string()],
        };

        let output = dir.path().join("bundle.tar.gz");
        TarBundleWriter::new()
            .write(
                b"identifier: com.example.app\n",
                &[ModuleFile {
                    name: "fetch.wasm".to_string(),
                    path: module_path,
                }],
                Some(&assets),
                &output,
            )
            .await
            .unwrap();

        let contents = read_bundle(&output).unwrap();
        assert_eq!(contents.manifest, "identifier: com.example.app\n");
        assert_eq!(contents.modules, vec!["fetch.wasm"]);
        assert_eq!(contents.static_files, vec!["css/site.css"]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_bundle() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("bundle.tar.gz");

        let err = TarBundleWriter::new()
            .write(
                b"identifier: com.example.app\n",
                &[ModuleFile {
                    name: "ghost.wasm".to_string(),
                    path: dir.path().join("ghost.wasm"),
                }],
                None,
                &output,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BundleError::Write { .. }));
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
