//! Create a version for each file and push its content to storage.

use futures::future::try_join_all;
use tracing::debug;

use crate::api::ServerlessApi;
use crate::error::{StratusError, StratusResult};
use crate::types::{FileResource, FileSource, ResourceKind};

/// Read the bytes to upload for a resource.
///
/// Function sources (`.js`) must be valid UTF-8; everything else is sent as is.
pub async fn read_content(resource: &FileResource) -> StratusResult<Vec<u8>> {
    match &resource.source {
        FileSource::Content(bytes) => Ok(bytes.clone()),
        FileSource::Path(path) => {
            let is_script = path.extension().is_some_and(|ext| ext == "js");
            if is_script {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| StratusError::io(path, e))?;
                Ok(text.into_bytes())
            } else {
                tokio::fs::read(path)
                    .await
                    .map_err(|e| StratusError::io(path, e))
            }
        }
    }
}

/// Upload one resource and return the sid of the new version.
///
/// A fresh version is created on every call, even when the content is unchanged.
pub async fn upload(
    api: &dyn ServerlessApi,
    service_sid: &str,
    kind: ResourceKind,
    resource: &FileResource,
) -> StratusResult<String> {
    let content = read_content(resource).await?;

    let version = api
        .create_version(
            service_sid,
            kind,
            &resource.sid,
            &resource.route_path,
            resource.visibility,
        )
        .await
        .map_err(|source| StratusError::Upload {
            name: resource.name.clone(),
            source: Box::new(source),
        })?;

    debug!(
        name = %resource.name,
        version = %version.sid,
        bytes = content.len(),
        "uploading content"
    );
    api.upload_content(&version.pre_signed_upload_url, content)
        .await?;

    Ok(version.sid)
}

/// Upload every resource of one kind concurrently, preserving input order.
pub async fn upload_all(
    api: &dyn ServerlessApi,
    service_sid: &str,
    kind: ResourceKind,
    resources: &[FileResource],
) -> StratusResult<Vec<String>> {
    try_join_all(
        resources
            .iter()
            .map(|resource| upload(api, service_sid, kind, resource)),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Visibility;
    use tempfile::TempDir;

    fn resource(name: &str, source: FileSource) -> FileResource {
        FileResource {
            name: name.to_string(),
            source,
            route_path: format!("/{}", name),
            visibility: Visibility::Public,
            sid: "ZH1".to_string(),
        }
    }

    #[tokio::test]
    async fn in_memory_content_is_used_verbatim() {
        let res = resource("a.txt", FileSource::Content(vec![0xff, 0x00]));
        assert_eq!(read_content(&res).await.unwrap(), vec![0xff, 0x00]);
    }

    #[tokio::test]
    async fn binary_assets_are_read_raw() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logo.png");
        std::fs::write(&path, [0x89, 0x50, 0xff]).unwrap();

        let res = resource("logo.png", FileSource::Path(path));
        assert_eq!(read_content(&res).await.unwrap(), vec![0x89, 0x50, 0xff]);
    }

    #[tokio::test]
    async fn scripts_must_be_utf8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.js");
        std::fs::write(&path, [0xff, 0xfe]).unwrap();

        let res = resource("broken.js", FileSource::Path(path));
        let err = read_content(&res).await.unwrap_err();
        assert!(matches!(err, StratusError::Io { .. }));
    }

    #[tokio::test]
    async fn missing_file_reports_its_path() {
        let res = resource("gone.js", FileSource::Path("/nonexistent/gone.js".into()));
        match read_content(&res).await.unwrap_err() {
            StratusError::Io { path, .. } => assert!(path.ends_with("gone.js")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
