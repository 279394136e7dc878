use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Storage backend for uploaded documents, namespaced by owner
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn save(&self, owner: i64, name: &str, data: &[u8]) -> io::Result<()>;

    async fn open(&self, owner: i64, name: &str) -> io::Result<Box<dyn AsyncRead + Send + Unpin>>;

    async fn remove(&self, owner: i64, name: &str) -> io::Result<()>;
}

/// Files under `<root>/<owner>/<name>`
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, owner: i64, name: &str) -> io::Result<PathBuf> {
        if !is_safe_filename(name) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid stored file name: {}", name),
            ));
        }
        Ok(self.root.join(owner.to_string()).join(name))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, owner: i64, name: &str, data: &[u8]) -> io::Result<()> {
        let path = self.path_for(owner, name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a temp name and rename so readers never see a partial file
        let tmp_path = path.with_extension("uploading");
        let mut file = fs::File::create(&tmp_path).await?;
        if let Err(e) = file.write_all(data).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        file.flush().await?;
        drop(file);

        fs::rename(&tmp_path, &path).await
    }

    async fn open(&self, owner: i64, name: &str) -> io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let path = self.path_for(owner, name)?;
        let file = fs::File::open(path).await?;
        Ok(Box::new(file))
    }

    async fn remove(&self, owner: i64, name: &str) -> io::Result<()> {
        let path = self.path_for(owner, name)?;
        match fs::remove_file(path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Check if a filename is safe (no path separators)
pub fn is_safe_filename(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    // Windows restricted characters
    if name.chars().any(|c| "<>:\"/\\|?*".contains(c)) {
        return false;
    }

    if name.chars().any(|c| c.is_control()) {
        return false;
    }

    // Ban names consisting entirely of dots (., .., ...)
    if name.chars().all(|c| c == '.') {
        return false;
    }

    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(std::path::Component::Normal(c)), None) => c == name,
        _ => false,
    }
}

/// Random storage name keeping a short alphanumeric extension of the original
pub fn stored_name_for(original_name: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) => format!("{}.{}", id, ext),
        None => id,
    }
}

/// SHA-256 of `data`, hex encoded
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn safe_filename_rejects_invalid_names() {
        assert!(!is_safe_filename(""));
        assert!(!is_safe_filename("."));
        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename("a/b"));
        assert!(!is_safe_filename(r"a\b"));
        assert!(!is_safe_filename("a\nb"));
        assert!(is_safe_filename("certificate.pdf"));
    }

    #[test]
    fn stored_name_keeps_clean_extension() {
        let name = stored_name_for("My CV.PDF");
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), 32 + 4);
        assert!(!stored_name_for("archive.tar.g$z").contains('$'));
        assert_eq!(stored_name_for("noext").len(), 32);
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn local_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.save(7, "doc.pdf", b"%PDF-1.7").await.unwrap();
        assert!(dir.path().join("7").join("doc.pdf").is_file());
        assert!(!dir.path().join("7").join("doc.uploading").exists());

        let mut reader = store.open(7, "doc.pdf").await.unwrap();
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"%PDF-1.7");

        store.remove(7, "doc.pdf").await.unwrap();
        // removing again is not an error
        store.remove(7, "doc.pdf").await.unwrap();
        assert!(store.open(7, "doc.pdf").await.is_err());
        assert!(store.save(7, "../escape", b"x").await.is_err());
    }
}
