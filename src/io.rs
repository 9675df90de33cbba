use std::path::{Path, PathBuf};

use anyhow::bail;
use tokio::fs::{create_dir_all, remove_file, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use uuid::Uuid;

/// Prefix of the `file` column values; uploads are served under `/uploads/`.
pub const UPLOAD_PREFIX: &str = "uploads/";

/// Directory holding uploaded student files.
#[derive(Debug, Clone)]
pub struct Uploads {
    root: PathBuf,
}

impl Uploads {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub async fn prepare(&self) -> anyhow::Result<()> {
        create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Writes `bytes` under a fresh `file_<uuid>.<ext>` name and returns the
    /// stored reference (`uploads/<name>`).
    pub async fn store(&self, extension: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let name = format!("file_{}.{}", Uuid::new_v4().simple(), extension);
        let file = create_io_file(self.root.join(&name)).await?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(format!("{}{}", UPLOAD_PREFIX, name))
    }

    pub async fn read(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        read_io_file(self.resolve(name)?).await
    }

    /// Removes a stored upload given its `uploads/<name>` reference.
    pub async fn remove(&self, reference: &str) -> anyhow::Result<()> {
        let name = reference.strip_prefix(UPLOAD_PREFIX).unwrap_or(reference);
        remove_file(self.resolve(name)?).await?;
        Ok(())
    }

    fn resolve(&self, name: &str) -> anyhow::Result<PathBuf> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            bail!("Invalid upload name `{}`", name)
        }
        Ok(self.root.join(name))
    }
}

async fn create_io_file<P: AsRef<Path>>(path: P) -> anyhow::Result<File> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    if path.exists() {
        bail!("File already exists!")
    }
    File::create(path).await.map_err(anyhow::Error::from)
}

async fn read_io_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<u8>> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("Tried to read nonexistent file!")
    }
    let mut bytes = Vec::new();
    BufReader::new(File::open(path).await?)
        .read_to_end(&mut bytes)
        .await?;
    Ok(bytes)
}

/// Lowercased text after the last `.` of a file name, or the whole name when
/// it has no dot.
pub fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

pub fn content_type_for(name: &str) -> &'static str {
    match extension_of(name).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
