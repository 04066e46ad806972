//! Model assets and where they come from.
//!
//! A [`ModelSource`] is polled, not awaited: `fetch` returns
//! [`Poll::Pending`] until the asset is available. The renderer polls every
//! queued load once per frame; [`FsModelSource`] reads on helper threads, so
//! a slow disk delays the model but never the frame.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::task::Poll;
use std::thread::JoinHandle;

use vela_ecs::entity::EntityId;

use crate::components::ShadowFlags;
use crate::error::RenderError;
use crate::math::Vec3;

/// A fetched and parsed model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    /// The url the asset was fetched from.
    pub url: String,
    pub format: ModelFormat,
    /// Number of meshes declared by the asset; `1` when the format is opaque.
    pub mesh_count: usize,
    /// Size of the raw asset.
    pub byte_len: usize,
}

/// Container format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// JSON glTF.
    Gltf,
    /// Binary glTF.
    Glb,
    /// Anything else; accepted as an opaque blob.
    Other,
}

const GLB_MAGIC: &[u8; 4] = b"glTF";

impl ModelAsset {
    /// Validate `bytes` as the asset at `url`. The format is chosen by
    /// extension.
    pub fn parse(url: &str, bytes: &[u8]) -> Result<Self, RenderError> {
        let parse_err = |reason: String| RenderError::ModelParse {
            url: url.to_owned(),
            reason,
        };
        if bytes.is_empty() {
            return Err(parse_err("empty file".to_owned()));
        }

        let ext = Path::new(url)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let (format, mesh_count) = match ext.as_str() {
            "gltf" => {
                let doc: serde_json::Value =
                    serde_json::from_slice(bytes).map_err(|e| parse_err(e.to_string()))?;
                let meshes = doc
                    .get("meshes")
                    .and_then(|m| m.as_array())
                    .map_or(0, Vec::len);
                (ModelFormat::Gltf, meshes)
            }
            "glb" => {
                if bytes.len() < 12 || &bytes[..4] != GLB_MAGIC {
                    return Err(parse_err("missing glTF binary header".to_owned()));
                }
                (ModelFormat::Glb, 1)
            }
            _ => (ModelFormat::Other, 1),
        };

        Ok(Self {
            url: url.to_owned(),
            format,
            mesh_count,
            byte_len: bytes.len(),
        })
    }
}

/// Per-load parameters. The pose is the entity's transform when the load was
/// requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOptions {
    /// Uniform scale applied to the attached node.
    pub scale: f64,
    pub shadows: ShadowFlags,
    /// Initial node position.
    pub position: Vec3,
    /// Initial node rotation, XYZ Euler radians.
    pub rotation: Vec3,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            shadows: ShadowFlags::default(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        }
    }
}

/// How a queued load finished.
#[derive(Debug)]
pub struct ModelLoadOutcome {
    /// Entity the load was queued for; it may since have been removed.
    pub entity: EntityId,
    pub url: String,
    /// `Err(RenderError::Cancelled)` when the load was superseded or its
    /// mesh removed.
    pub result: Result<(), RenderError>,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Supplies model assets by url.
pub trait ModelSource {
    /// Poll for `url`. Called again every frame until it returns `Ready`.
    fn fetch(&mut self, url: &str) -> Poll<Result<ModelAsset, RenderError>>;
}

/// Reads assets from files under a root directory.
///
/// Each url is read on a helper thread. `fetch` stays pending until that
/// read has finished, then reports it once.
#[derive(Debug)]
pub struct FsModelSource {
    root: PathBuf,
    reads: HashMap<String, JoinHandle<io::Result<Vec<u8>>>>,
}

impl FsModelSource {
    /// Resolve urls against `root`. A leading `/` is ignored.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reads: HashMap::new(),
        }
    }

    /// Directory urls resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads started and not yet reported.
    pub fn in_flight(&self) -> usize {
        self.reads.len()
    }
}

impl ModelSource for FsModelSource {
    fn fetch(&mut self, url: &str) -> Poll<Result<ModelAsset, RenderError>> {
        let handle = match self.reads.remove(url) {
            Some(handle) if handle.is_finished() => handle,
            Some(handle) => {
                self.reads.insert(url.to_owned(), handle);
                return Poll::Pending;
            }
            None => {
                let path = self.root.join(url.trim_start_matches('/'));
                let spawned = std::thread::Builder::new()
                    .name("model-read".to_owned())
                    .spawn(move || std::fs::read(path));
                return match spawned {
                    Ok(handle) => {
                        self.reads.insert(url.to_owned(), handle);
                        Poll::Pending
                    }
                    Err(source) => Poll::Ready(Err(RenderError::Io {
                        url: url.to_owned(),
                        source,
                    })),
                };
            }
        };

        let read = handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("model read thread panicked")));
        let result = match read {
            Ok(bytes) => ModelAsset::parse(url, &bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RenderError::ModelNotFound {
                url: url.to_owned(),
            }),
            Err(source) => Err(RenderError::Io {
                url: url.to_owned(),
                source,
            }),
        };
        Poll::Ready(result)
    }
}

#[derive(Debug, Default)]
struct MemoryAssets {
    assets: HashMap<String, Vec<u8>>,
    held: HashSet<String>,
}

/// Serves assets from memory.
///
/// Clones share the same asset table, so a test can keep a handle after
/// giving the source to a renderer and [`release`](Self::release) a held url
/// to complete a load between frames.
#[derive(Debug, Clone, Default)]
pub struct MemoryModelSource {
    inner: Rc<RefCell<MemoryAssets>>,
}

impl MemoryModelSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.inner
            .borrow_mut()
            .assets
            .insert(url.into(), bytes.into());
    }

    /// Keep loads of `url` pending until released.
    pub fn hold(&self, url: impl Into<String>) {
        self.inner.borrow_mut().held.insert(url.into());
    }

    pub fn release(&self, url: &str) {
        self.inner.borrow_mut().held.remove(url);
    }
}

impl ModelSource for MemoryModelSource {
    fn fetch(&mut self, url: &str) -> Poll<Result<ModelAsset, RenderError>> {
        let inner = self.inner.borrow();
        if inner.held.contains(url) {
            return Poll::Pending;
        }
        Poll::Ready(match inner.assets.get(url) {
            Some(bytes) => ModelAsset::parse(url, bytes),
            None => Err(RenderError::ModelNotFound {
                url: url.to_owned(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLTF: &str = r#"{"asset":{"version":"2.0"},"meshes":[{},{}]}"#;

    #[test]
    fn parses_gltf_mesh_count() {
        let asset = ModelAsset::parse("tree.gltf", GLTF.as_bytes()).unwrap();
        assert_eq!(asset.format, ModelFormat::Gltf);
        assert_eq!(asset.mesh_count, 2);
    }

    #[test]
    fn rejects_bad_glb_header() {
        let err = ModelAsset::parse("rock.glb", b"not a binary gltf").unwrap_err();
        assert!(matches!(err, RenderError::ModelParse { .. }));
    }

    #[test]
    fn rejects_empty_asset() {
        let err = ModelAsset::parse("thing.obj", b"").unwrap_err();
        assert!(matches!(err, RenderError::ModelParse { .. }));
    }

    #[test]
    fn memory_source_hold_and_release() {
        let source = MemoryModelSource::new();
        source.insert("a.gltf", GLTF);
        source.hold("a.gltf");
        let mut handle = source.clone();
        assert!(handle.fetch("a.gltf").is_pending());
        source.release("a.gltf");
        assert!(matches!(handle.fetch("a.gltf"), Poll::Ready(Ok(_))));
    }

    #[test]
    fn memory_source_missing_url() {
        let mut source = MemoryModelSource::new();
        assert!(matches!(
            source.fetch("nope.glb"),
            Poll::Ready(Err(RenderError::ModelNotFound { .. }))
        ));
    }

    fn fetch_until_ready(source: &mut FsModelSource, url: &str) -> Result<ModelAsset, RenderError> {
        for _ in 0..2000 {
            if let Poll::Ready(result) = source.fetch(url) {
                return result;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        panic!("read of {url} never finished");
    }

    #[test]
    fn fs_source_reports_missing_file() {
        let dir = std::env::temp_dir().join("vela-model-source-missing");
        let mut source = FsModelSource::new(&dir);
        assert!(matches!(
            fetch_until_ready(&mut source, "absent.glb"),
            Err(RenderError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn fs_source_reads_off_the_calling_thread() {
        let dir = std::env::temp_dir().join(format!("vela-model-source-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("crate.gltf"), GLTF).unwrap();
        let mut source = FsModelSource::new(&dir);

        assert!(source.fetch("/crate.gltf").is_pending());
        assert_eq!(source.in_flight(), 1);
        let asset = fetch_until_ready(&mut source, "/crate.gltf").unwrap();
        assert_eq!(asset.mesh_count, 2);
        assert_eq!(source.in_flight(), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
