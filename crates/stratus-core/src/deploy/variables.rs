//! Environment variables of a deployed environment.

use std::collections::BTreeMap;

use futures::future::try_join_all;
use tracing::debug;

use crate::api::{ServerlessApi, VariableResource};
use crate::error::StratusResult;

/// Variables keyed by name.
pub type EnvVars = BTreeMap<String, String>;

/// Overwrite or create every variable in `vars`.
///
/// Keys that exist remotely but not in `vars` are left untouched.
pub async fn set_all(
    api: &dyn ServerlessApi,
    service_sid: &str,
    environment_sid: &str,
    vars: &EnvVars,
) -> StratusResult<()> {
    if vars.is_empty() {
        return Ok(());
    }
    let existing = api.list_variables(service_sid, environment_sid).await?;

    try_join_all(vars.iter().map(|(key, value)| {
        let current = existing.iter().find(|v| &v.key == key);
        async move {
            match current {
                Some(variable) => {
                    debug!(%key, "updating variable");
                    api.update_variable(service_sid, environment_sid, &variable.sid, value)
                        .await
                }
                None => {
                    debug!(%key, "creating variable");
                    api.create_variable(service_sid, environment_sid, key, value)
                        .await
                }
            }
        }
    }))
    .await?;

    Ok(())
}

/// Delete the named variables, returning the keys that existed.
pub async fn unset(
    api: &dyn ServerlessApi,
    service_sid: &str,
    environment_sid: &str,
    keys: &[String],
) -> StratusResult<Vec<String>> {
    let existing = api.list_variables(service_sid, environment_sid).await?;
    let doomed: Vec<&VariableResource> = existing
        .iter()
        .filter(|v| keys.contains(&v.key))
        .collect();

    try_join_all(
        doomed
            .iter()
            .map(|v| api.delete_variable(service_sid, environment_sid, &v.sid)),
    )
    .await?;

    Ok(doomed.into_iter().map(|v| v.key.clone()).collect())
}

/// All variables of an environment.
pub async fn list(
    api: &dyn ServerlessApi,
    service_sid: &str,
    environment_sid: &str,
) -> StratusResult<EnvVars> {
    let variables = api.list_variables(service_sid, environment_sid).await?;
    Ok(variables.into_iter().map(|v| (v.key, v.value)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiCall, MemoryApi};

    async fn environment(api: &MemoryApi) -> (String, String) {
        let service = api.create_service("demo").await.unwrap();
        let env = api
            .create_environment(&service.sid, "dev-environment", "dev")
            .await
            .unwrap();
        (service.sid, env.sid)
    }

    fn vars(pairs: &[(&str, &str)]) -> EnvVars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn updates_existing_and_creates_missing() {
        let api = MemoryApi::new();
        let (service, env) = environment(&api).await;
        set_all(&api, &service, &env, &vars(&[("A", "1"), ("KEEP", "x")]))
            .await
            .unwrap();
        api.clear_calls();

        set_all(&api, &service, &env, &vars(&[("A", "2"), ("B", "3")]))
            .await
            .unwrap();

        assert_eq!(
            list(&api, &service, &env).await.unwrap(),
            vars(&[("A", "2"), ("B", "3"), ("KEEP", "x")])
        );
        assert_eq!(api.count(|c| matches!(c, ApiCall::UpdateVariable { .. })), 1);
        assert_eq!(api.count(|c| matches!(c, ApiCall::CreateVariable { .. })), 1);
    }

    #[tokio::test]
    async fn empty_set_makes_no_calls() {
        let api = MemoryApi::new();
        let (service, env) = environment(&api).await;
        api.clear_calls();

        set_all(&api, &service, &env, &EnvVars::new()).await.unwrap();
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn unset_reports_removed_keys_only() {
        let api = MemoryApi::new();
        let (service, env) = environment(&api).await;
        set_all(&api, &service, &env, &vars(&[("A", "1"), ("B", "2")]))
            .await
            .unwrap();

        let removed = unset(
            &api,
            &service,
            &env,
            &["A".to_string(), "MISSING".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(removed, vec!["A".to_string()]);
        assert_eq!(list(&api, &service, &env).await.unwrap(), vars(&[("B", "2")]));
    }
}
