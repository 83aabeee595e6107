use std::env;

use uuid::Uuid;

use crate::consts::DEFAULT_NAMESPACE;

#[derive(Clone, Debug, Default)]
pub struct DownwardAPI {
    pub pod_name: Option<String>,
    pub pod_namespace: Option<String>,
}

impl DownwardAPI {
    pub fn from_env() -> Self {
        let pod_name = get_env_var("POD_NAME");
        let pod_namespace = get_env_var("POD_NAMESPACE");
        Self {
            pod_name,
            pod_namespace,
        }
    }

    /// Namespace of the leader election lease.
    pub fn lease_namespace(&self) -> &str {
        self.pod_namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Unique per process, so a restarted pod with the same name never inherits a stale lease.
    pub fn holder_identity(&self) -> String {
        let name = self
            .pod_name
            .clone()
            .or_else(|| {
                hostname::get()
                    .ok()
                    .and_then(|hostname| hostname.into_string().ok())
            })
            .unwrap_or_else(|| String::from("unknown"));

        format!("{name}_{}", Uuid::new_v4())
    }
}

fn get_env_var(key: &str) -> Option<String> {
    let var = env::var(key).ok()?;
    if var.is_empty() {
        return None;
    }

    Some(var)
}
