//! Match local files against the resources already registered on a service.

use futures::future::try_join_all;
use tracing::debug;

use crate::api::{RemoteResource, ServerlessApi};
use crate::error::{StratusError, StratusResult};
use crate::types::{FileInfo, FileResource, ResourceKind};

/// A local file that still needs a remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResource {
    pub file: FileInfo,
    pub route_path: String,
}

/// Result of matching local files against remote resources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub to_create: Vec<PendingResource>,
    pub reused: Vec<FileResource>,
}

/// URL path a file is served under.
///
/// Whitespace becomes `-`. Functions lose the final extension of their last
/// path component; assets keep it so `styles.css` stays `/styles.css`.
pub fn route_path(name: &str, kind: ResourceKind) -> String {
    let normalised = name.replace('\\', "/");
    let trimmed = normalised.trim_start_matches('/');

    let stem = match kind {
        ResourceKind::Function => strip_extension(trimmed),
        ResourceKind::Asset => trimmed,
    };

    let dashed: String = stem
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    format!("/{}", dashed)
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        // A leading dot marks a hidden file, not an extension.
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}

/// Split local files into those already registered and those to create.
pub fn reconcile(
    local: Vec<FileInfo>,
    existing: &[RemoteResource],
    kind: ResourceKind,
) -> Reconciliation {
    let mut result = Reconciliation::default();

    for file in local {
        let route_path = route_path(&file.name, kind);
        match existing.iter().find(|r| r.friendly_name == file.name) {
            Some(remote) => result.reused.push(FileResource {
                name: file.name,
                source: file.source,
                route_path,
                visibility: file.visibility,
                sid: remote.sid.clone(),
            }),
            None => result.to_create.push(PendingResource { file, route_path }),
        }
    }

    result
}

/// Create the missing resources and return every file with its remote sid.
///
/// Creations are issued concurrently. The first failure aborts the whole kind.
pub async fn register(
    api: &dyn ServerlessApi,
    service_sid: &str,
    kind: ResourceKind,
    reconciliation: Reconciliation,
) -> StratusResult<Vec<FileResource>> {
    let Reconciliation { to_create, reused } = reconciliation;
    debug!(
        %kind,
        create = to_create.len(),
        reuse = reused.len(),
        "registering resources"
    );

    let created = try_join_all(to_create.into_iter().map(|pending| async move {
        let remote = api
            .create_resource(service_sid, kind, &pending.file.name)
            .await
            .map_err(|source| StratusError::ResourceCreation {
                kind,
                name: pending.file.name.clone(),
                source: Box::new(source),
            })?;
        Ok::<_, StratusError>(FileResource {
            name: pending.file.name,
            source: pending.file.source,
            route_path: pending.route_path,
            visibility: pending.file.visibility,
            sid: remote.sid,
        })
    }))
    .await?;

    let mut resources = reused;
    resources.extend(created);
    Ok(resources)
}

/// List remote resources, reconcile and register in one step.
pub async fn get_or_create_resources(
    api: &dyn ServerlessApi,
    service_sid: &str,
    kind: ResourceKind,
    files: Vec<FileInfo>,
) -> StratusResult<Vec<FileResource>> {
    let existing = api.list_resources(service_sid, kind).await?;
    let reconciliation = reconcile(files, &existing, kind);
    register(api, service_sid, kind, reconciliation).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(sid: &str, name: &str) -> RemoteResource {
        RemoteResource {
            sid: sid.to_string(),
            service_sid: "ZS1".to_string(),
            friendly_name: name.to_string(),
            date_created: None,
            date_updated: None,
        }
    }

    #[test]
    fn route_path_strips_final_extension_and_dashes_whitespace() {
        assert_eq!(route_path("My File.js", ResourceKind::Function), "/My-File");
        assert_eq!(route_path("a.b.js", ResourceKind::Function), "/a.b");
        assert_eq!(route_path("example.js", ResourceKind::Function), "/example");
    }

    #[test]
    fn route_path_never_duplicates_leading_separator() {
        assert_eq!(route_path("/hello.js", ResourceKind::Function), "/hello");
        assert_eq!(route_path("//api/v1.js", ResourceKind::Function), "/api/v1");
        assert_eq!(route_path("api\\v2.js", ResourceKind::Function), "/api/v2");
    }

    #[test]
    fn route_path_keeps_asset_extension() {
        assert_eq!(route_path("styles.css", ResourceKind::Asset), "/styles.css");
        assert_eq!(
            route_path("img/My Logo.png", ResourceKind::Asset),
            "/img/My-Logo.png"
        );
    }

    #[test]
    fn route_path_ignores_dots_in_directories() {
        assert_eq!(route_path("v1.2/handler", ResourceKind::Function), "/v1.2/handler");
        assert_eq!(route_path(".well-known", ResourceKind::Function), "/.well-known");
    }

    #[test]
    fn reconcile_reuses_exact_matches_only() {
        let local = vec![
            FileInfo::from_content("example.js", "a"),
            FileInfo::from_content("Example.js", "b"),
        ];
        let existing = vec![remote("ZH1", "example.js")];

        let result = reconcile(local, &existing, ResourceKind::Function);
        assert_eq!(result.reused.len(), 1);
        assert_eq!(result.reused[0].sid, "ZH1");
        assert_eq!(result.reused[0].route_path, "/example");
        assert_eq!(result.to_create.len(), 1);
        assert_eq!(result.to_create[0].file.name, "Example.js");
        assert_eq!(result.to_create[0].route_path, "/Example");
    }

    #[test]
    fn reconcile_is_idempotent_once_registered() {
        let local = vec![
            FileInfo::from_content("a.js", "a"),
            FileInfo::from_content("b.js", "b"),
        ];
        let first = reconcile(local.clone(), &[], ResourceKind::Function);
        assert_eq!(first.to_create.len(), 2);

        let registered: Vec<_> = first
            .to_create
            .iter()
            .enumerate()
            .map(|(i, p)| remote(&format!("ZH{}", i), &p.file.name))
            .collect();

        let second = reconcile(local.clone(), &registered, ResourceKind::Function);
        let third = reconcile(local, &registered, ResourceKind::Function);
        assert!(second.to_create.is_empty());
        assert_eq!(second, third);
        assert_eq!(second.reused.len(), 2);
    }
}
