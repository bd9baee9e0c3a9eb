//! Request path resolution and content typing for the asset server

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Why an asset could not be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    NotFound,
    /// The request resolved outside the served root
    Forbidden,
    Io(io::ErrorKind),
}

impl From<io::Error> for AssetError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => AssetError::NotFound,
            kind => AssetError::Io(kind),
        }
    }
}

impl IntoResponse for AssetError {
    fn into_response(self) -> Response {
        match self {
            AssetError::NotFound => (StatusCode::NOT_FOUND, "File not found").into_response(),
            AssetError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            AssetError::Io(kind) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server error: {:?}", kind),
            )
                .into_response(),
        }
    }
}

/// A file read from the root, ready to send
pub struct Asset {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

/// Content type by file extension; anything unknown is served as bytes
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" => "text/html",
        "js" => "text/javascript",
        "css" => "text/css",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Percent-decode a request path; undecodable or NUL-carrying paths are refused
fn decode_path(request_path: &str) -> Result<String, AssetError> {
    let decoded = percent_decode_str(request_path)
        .decode_utf8()
        .map_err(|_| AssetError::NotFound)?;
    if decoded.contains('\0') {
        return Err(AssetError::Forbidden);
    }
    Ok(decoded.into_owned())
}

/// Map a request path onto a file under `root`
///
/// `root` must already be canonical. The path is percent-decoded before its
/// components are checked, and the empty path maps to `index`. Any path
/// whose canonical form leaves `root` (through `..` or a symlink) is rejected
/// as `Forbidden`.
pub async fn resolve(root: &Path, index: &str, request_path: &str) -> Result<PathBuf, AssetError> {
    let decoded = decode_path(request_path)?;
    let trimmed = decoded.trim_start_matches('/');
    let relative = if trimmed.is_empty() { index } else { trimmed };

    let mut candidate = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => candidate.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AssetError::Forbidden)
            }
        }
    }

    let mut canonical = tokio::fs::canonicalize(&candidate).await?;
    if !canonical.starts_with(root) {
        return Err(AssetError::Forbidden);
    }

    if tokio::fs::metadata(&canonical).await?.is_dir() {
        canonical = tokio::fs::canonicalize(canonical.join(index)).await?;
        if !canonical.starts_with(root) {
            return Err(AssetError::Forbidden);
        }
    }

    Ok(canonical)
}

/// Resolve and read an asset
pub async fn load(root: &Path, index: &str, request_path: &str) -> Result<Asset, AssetError> {
    let path = resolve(root, index, request_path).await?;
    let body = tokio::fs::read(&path).await?;
    Ok(Asset {
        content_type: content_type_for(&path),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_root(dir: &tempfile::TempDir) -> PathBuf {
        std::fs::canonicalize(dir.path()).unwrap()
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Path::new("index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("app.js")), "text/javascript");
        assert_eq!(content_type_for(Path::new("style.CSS")), "text/css");
        assert_eq!(content_type_for(Path::new("sample.mp3")), "audio/mpeg");
        assert_eq!(content_type_for(Path::new("out.wav")), "audio/wav");
        assert_eq!(
            content_type_for(Path::new("archive.tar.gz")),
            "application/octet-stream"
        );
        assert_eq!(content_type_for(Path::new("LICENSE")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("og-image.png")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("data.json")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_empty_path_is_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let root = canonical_root(&dir);

        let resolved = resolve(&root, "index.html", "/").await.unwrap();
        assert_eq!(resolved, root.join("index.html"));
    }

    #[tokio::test]
    async fn test_parent_components_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();
        let root = std::fs::canonicalize(dir.path().join("site")).unwrap();

        assert_eq!(
            resolve(&root, "index.html", "/../secret.txt").await,
            Err(AssetError::Forbidden)
        );
        assert_eq!(
            resolve(&root, "index.html", "/a/../../secret.txt").await,
            Err(AssetError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_percent_encoded_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("site").join("my sample.mp3"), b"ID3").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();
        let root = std::fs::canonicalize(dir.path().join("site")).unwrap();

        let resolved = resolve(&root, "index.html", "/my%20sample.mp3").await.unwrap();
        assert_eq!(resolved, root.join("my sample.mp3"));

        assert_eq!(
            resolve(&root, "index.html", "/%2e%2e/secret.txt").await,
            Err(AssetError::Forbidden)
        );
        assert_eq!(
            resolve(&root, "index.html", "/..%2Fsecret.txt").await,
            Err(AssetError::Forbidden)
        );
        assert_eq!(
            resolve(&root, "index.html", "/a%00.mp3").await,
            Err(AssetError::Forbidden)
        );
        assert_eq!(
            resolve(&root, "index.html", "/%FF.mp3").await,
            Err(AssetError::NotFound)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("site")).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("secret.txt"),
            dir.path().join("site").join("link.txt"),
        )
        .unwrap();
        let root = std::fs::canonicalize(dir.path().join("site")).unwrap();

        assert_eq!(
            resolve(&root, "index.html", "/link.txt").await,
            Err(AssetError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_missing_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = canonical_root(&dir);
        assert_eq!(
            resolve(&root, "index.html", "/missing.js").await,
            Err(AssetError::NotFound)
        );
        assert!(matches!(
            load(&root, "index.html", "/").await,
            Err(AssetError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_directory_serves_its_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs").join("index.html"), "docs").unwrap();
        let root = canonical_root(&dir);

        let asset = load(&root, "index.html", "/docs/").await.unwrap();
        assert_eq!(asset.content_type, "text/html");
        assert_eq!(asset.body, b"docs");
    }

    #[test]
    fn test_io_error_classified() {
        let err = AssetError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err, AssetError::Io(io::ErrorKind::PermissionDenied));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let missing = AssetError::from(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
    }
}
