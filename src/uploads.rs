//! Almacenamiento de adjuntos en disco.
//!
//! Files land under `{root}/{YYYY-MM}/` with a collision-resistant name and
//! are addressed everywhere else by their public `/uploads/...` path, which
//! is also what gets persisted in `adjuntos.ruta_archivo`.

use std::io;
use std::path::{Component, Path, PathBuf};

use rand::RngCore;
use tracing::warn;

use crate::time;

pub const ALLOWED_MIME: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

pub fn is_allowed_mime(mime: &str) -> bool {
    ALLOWED_MIME.contains(&mime)
}

fn ext_for(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "bin",
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes `bytes` under the month partition of today and returns the
    /// public path to store in the database.
    pub async fn save(&self, trabajo_id: i32, bytes: &[u8], mime: &str) -> io::Result<String> {
        let now = time::now_local();
        let ym = time::month_partition(now);
        let dir = self.root.join(&ym);
        tokio::fs::create_dir_all(&dir).await?;

        let mut suffix = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut suffix);
        let file_name = format!(
            "{}_{}_{}.{}",
            trabajo_id,
            now.format("%Y%m%d_%H%M%S"),
            hex::encode(suffix),
            ext_for(mime)
        );

        tokio::fs::write(dir.join(&file_name), bytes).await?;
        Ok(format!("/uploads/{ym}/{file_name}"))
    }

    /// Best-effort removal by stored public path. Paths that do not resolve
    /// inside the managed root are refused; a missing file is not an error.
    pub async fn delete_by_ruta(&self, ruta: &str) {
        let Some(rel) = managed_relative(ruta) else {
            warn!(ruta, "refusing to delete path outside the upload root");
            return;
        };
        let abs = self.root.join(rel);
        if let Err(err) = tokio::fs::remove_file(&abs).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!(path = %abs.display(), error = %err, "could not remove upload");
            }
        }
    }
}

/// `/uploads/yyyy-mm/f.ext` -> `yyyy-mm/f.ext`. Rejects anything with parent
/// or root components so a crafted `ruta_archivo` cannot escape the root.
fn managed_relative(ruta: &str) -> Option<PathBuf> {
    let normal = ruta.replace('\\', "/");
    let rel = normal.strip_prefix("/uploads/")?;
    if rel.is_empty() {
        return None;
    }
    let path = Path::new(rel);
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn managed_relative_accepts_plain_upload_paths() {
        assert_eq!(
            managed_relative("/uploads/2024-07/9_20240703_101530_a1b2c3.jpg"),
            Some(PathBuf::from("2024-07/9_20240703_101530_a1b2c3.jpg"))
        );
    }

    #[test]
    fn managed_relative_rejects_traversal_and_foreign_paths() {
        assert_eq!(managed_relative("/uploads/../etc/passwd"), None);
        assert_eq!(managed_relative("/uploads/2024-07/../../etc/passwd"), None);
        assert_eq!(managed_relative("/uploads/"), None);
        assert_eq!(managed_relative("/etc/passwd"), None);
        assert_eq!(managed_relative("C:\\uploads\\x.jpg"), None);
    }

    #[test]
    fn mime_allow_list() {
        assert!(is_allowed_mime("image/png"));
        assert!(is_allowed_mime("image/jpeg"));
        assert!(is_allowed_mime("image/webp"));
        assert!(!is_allowed_mime("application/pdf"));
        assert!(!is_allowed_mime("text/html"));
    }

    #[actix_web::test]
    async fn save_writes_under_month_partition() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let ruta = store.save(42, b"png-bytes", "image/png").await.unwrap();
        assert!(ruta.starts_with("/uploads/"));
        assert!(ruta.ends_with(".png"));
        assert!(ruta.contains("/42_"));

        let rel = managed_relative(&ruta).unwrap();
        let on_disk = dir.path().join(rel);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"png-bytes");
    }

    #[actix_web::test]
    async fn delete_by_ruta_removes_the_file_and_tolerates_misses() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let ruta = store.save(7, b"x", "image/jpeg").await.unwrap();
        let on_disk = dir.path().join(managed_relative(&ruta).unwrap());
        assert!(on_disk.exists());

        store.delete_by_ruta(&ruta).await;
        assert!(!on_disk.exists());

        // second delete and traversal attempts are silent no-ops
        store.delete_by_ruta(&ruta).await;
        store.delete_by_ruta("/uploads/../Cargo.toml").await;
    }
}
