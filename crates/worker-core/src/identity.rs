use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persistent worker identity: generated once, then reused across
/// restarts so the pool sees a stable `worker_id` instead of a fresh
/// registration every time the process is started. Adapted from the
/// teacher's on-disk submitter identity, which persists a reward address
/// and display name the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerIdentity {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl WorkerIdentity {
    fn normalize(&mut self) {
        self.id = self.id.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.name = self.name.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    }
}

fn xdg_config_home() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        let dir = PathBuf::from(dir);
        if dir.as_os_str().is_empty() {
            anyhow::bail!("XDG_CONFIG_HOME is set but empty");
        }
        return Ok(dir);
    }

    let home = std::env::var_os("HOME").ok_or_else(|| anyhow::anyhow!("HOME is not set"))?;
    let home = PathBuf::from(home);
    if home.as_os_str().is_empty() {
        anyhow::bail!("HOME is set but empty");
    }
    Ok(home.join(".config"))
}

pub fn identity_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_home()?.join("fabric-worker").join("identity.json"))
}

pub fn load_identity() -> anyhow::Result<Option<WorkerIdentity>> {
    let path = identity_path()?;
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    let mut identity: WorkerIdentity = serde_json::from_str(&raw)?;
    identity.normalize();
    Ok(Some(identity))
}

pub fn save_identity(identity: &WorkerIdentity) -> anyhow::Result<()> {
    let path = identity_path()?;
    let dir = path.parent().ok_or_else(|| anyhow::anyhow!("invalid identity path: {}", path.display()))?;
    std::fs::create_dir_all(dir)?;

    let mut identity = identity.clone();
    identity.normalize();

    let json = serde_json::to_string_pretty(&identity)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(tmp, path)?;
    Ok(())
}

/// Load the persisted identity, generating and saving a fresh one on
/// first run. CLI-provided `id`/`name` always take precedence when set.
pub fn ensure_identity(cli_id: Option<String>, cli_name: Option<String>) -> anyhow::Result<WorkerIdentity> {
    let mut identity = load_identity()?.unwrap_or_default();
    let mut changed = identity.id.is_none();

    if let Some(id) = cli_id {
        identity.id = Some(id);
        changed = true;
    } else if identity.id.is_none() {
        identity.id = Some(Uuid::new_v4().to_string());
    }

    if let Some(name) = cli_name {
        identity.name = Some(name);
        changed = true;
    }

    if changed {
        save_identity(&identity)?;
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_persists_an_id_on_first_run() {
        let dir = std::env::temp_dir().join(format!("fabric-worker-identity-test-{}", Uuid::new_v4()));
        std::env::set_var("XDG_CONFIG_HOME", &dir);

        let first = ensure_identity(None, None).unwrap();
        assert!(first.id.is_some());

        let second = ensure_identity(None, None).unwrap();
        assert_eq!(first.id, second.id);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn cli_id_overrides_and_persists() {
        let dir = std::env::temp_dir().join(format!("fabric-worker-identity-test-{}", Uuid::new_v4()));
        std::env::set_var("XDG_CONFIG_HOME", &dir);

        let overridden = ensure_identity(Some("explicit-id".into()), Some("rig-1".into())).unwrap();
        assert_eq!(overridden.id.as_deref(), Some("explicit-id"));

        let reloaded = load_identity().unwrap().unwrap();
        assert_eq!(reloaded.id.as_deref(), Some("explicit-id"));
        assert_eq!(reloaded.name.as_deref(), Some("rig-1"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
