// Backup job endpoints: filesystem (rsync), S3 and Git.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumString, VariantNames};
use tracing::debug;

use crate::client::RoxyClient;
use crate::error::Error;
use crate::wire;

const FS_PATH: &str = "/api/server/backup/fs";
const S3_PATH: &str = "/api/server/backup/s3";
const GIT_PATH: &str = "/api/server/backup/git";

/// How often a backup job runs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum BackupSchedule {
    Daily,
    Weekly,
    Monthly,
}

/// What a filesystem job does with the remote copy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum BackupKind {
    Backup,
    Synchronization,
}

/// Services whose configuration can be pushed to Git, by numeric service ID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum GitService {
    Haproxy,
    Nginx,
    Keepalived,
    Apache,
}

impl GitService {
    pub fn id(self) -> i64 {
        match self {
            Self::Haproxy => 1,
            Self::Nginx => 2,
            Self::Keepalived => 3,
            Self::Apache => 4,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Haproxy),
            2 => Some(Self::Nginx),
            3 => Some(Self::Keepalived),
            4 => Some(Self::Apache),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsBackup {
    #[serde(default, with = "wire::flex_int")]
    pub server_id: i64,
    #[serde(default, with = "wire::flex_int")]
    pub cred_id: i64,
    #[serde(default, with = "wire::flex_string")]
    pub rserver: String,
    #[serde(default, with = "wire::flex_string")]
    pub rpath: String,
    #[serde(default, with = "wire::flex_string")]
    pub time: String,
    #[serde(default, rename = "type", with = "wire::flex_string")]
    pub kind: String,
    #[serde(default, with = "wire::quoted_text")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Backup {
    #[serde(default, with = "wire::flex_int")]
    pub server_id: i64,
    #[serde(default, with = "wire::flex_string")]
    pub s3_server: String,
    #[serde(default, with = "wire::flex_string")]
    pub bucket: String,
    #[serde(default, with = "wire::flex_string")]
    pub access_key: String,
    #[serde(default, with = "wire::flex_string")]
    pub secret_key: String,
    #[serde(default, with = "wire::flex_string")]
    pub time: String,
    #[serde(default, with = "wire::quoted_text")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitBackup {
    #[serde(default, with = "wire::flex_int")]
    pub server_id: i64,
    #[serde(default, with = "wire::flex_int")]
    pub service_id: i64,
    #[serde(default, with = "wire::flex_int")]
    pub cred_id: i64,
    #[serde(default, with = "wire::flex_string")]
    pub repo: String,
    #[serde(default, with = "wire::flex_string")]
    pub branch: String,
    #[serde(default, with = "wire::flex_string")]
    pub time: String,
    #[serde(default, with = "wire::quoted_text")]
    pub description: String,
}

impl RoxyClient {
    // ── Filesystem ───────────────────────────────────────────────────

    pub async fn create_fs_backup(&self, backup: &FsBackup) -> Result<String, Error> {
        debug!(server_id = backup.server_id, rserver = %backup.rserver, "creating fs backup");
        self.create(FS_PATH, backup).await
    }

    pub async fn get_fs_backup(&self, id: &str) -> Result<FsBackup, Error> {
        self.get(&format!("{FS_PATH}/{id}")).await
    }

    pub async fn update_fs_backup(&self, id: &str, backup: &FsBackup) -> Result<(), Error> {
        let _: Value = self.put(&format!("{FS_PATH}/{id}"), backup).await?;
        Ok(())
    }

    /// The API wants the owning server and credential in the delete body.
    pub async fn delete_fs_backup(
        &self,
        id: &str,
        server_id: i64,
        cred_id: i64,
    ) -> Result<(), Error> {
        debug!(id, "deleting fs backup");
        self.delete_with_body(
            &format!("{FS_PATH}/{id}"),
            &json!({ "server_id": server_id, "cred_id": cred_id }),
        )
        .await
    }

    // ── S3 ───────────────────────────────────────────────────────────

    pub async fn create_s3_backup(&self, backup: &S3Backup) -> Result<String, Error> {
        debug!(server_id = backup.server_id, bucket = %backup.bucket, "creating s3 backup");
        self.create(S3_PATH, backup).await
    }

    pub async fn get_s3_backup(&self, id: &str) -> Result<S3Backup, Error> {
        self.get(&format!("{S3_PATH}/{id}")).await
    }

    pub async fn update_s3_backup(&self, id: &str, backup: &S3Backup) -> Result<(), Error> {
        let _: Value = self.put(&format!("{S3_PATH}/{id}"), backup).await?;
        Ok(())
    }

    pub async fn delete_s3_backup(&self, id: &str, server_id: i64, bucket: &str) -> Result<(), Error> {
        debug!(id, "deleting s3 backup");
        self.delete_with_body(
            &format!("{S3_PATH}/{id}"),
            &json!({ "server_id": server_id, "bucket": bucket }),
        )
        .await
    }

    // ── Git ──────────────────────────────────────────────────────────

    pub async fn create_git_backup(&self, backup: &GitBackup) -> Result<String, Error> {
        debug!(server_id = backup.server_id, repo = %backup.repo, "creating git backup");
        self.create(GIT_PATH, backup).await
    }

    pub async fn get_git_backup(&self, id: &str) -> Result<GitBackup, Error> {
        self.get(&format!("{GIT_PATH}/{id}")).await
    }

    pub async fn update_git_backup(&self, id: &str, backup: &GitBackup) -> Result<(), Error> {
        let _: Value = self.put(&format!("{GIT_PATH}/{id}"), backup).await?;
        Ok(())
    }

    pub async fn delete_git_backup(
        &self,
        id: &str,
        server_id: i64,
        cred_id: i64,
    ) -> Result<(), Error> {
        debug!(id, "deleting git backup");
        self.delete_with_body(
            &format!("{GIT_PATH}/{id}"),
            &json!({ "server_id": server_id, "cred_id": cred_id }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_backup_uses_type_on_the_wire() {
        let backup = FsBackup {
            server_id: 1,
            cred_id: 2,
            rserver: "10.0.0.9".into(),
            rpath: "/srv/backup".into(),
            time: "daily".into(),
            kind: "backup".into(),
            description: "it's nightly".into(),
        };
        let body = serde_json::to_value(&backup).unwrap();
        assert_eq!(body["type"], "backup");
        assert_eq!(body["description"], "its nightly");
        assert!(body.get("kind").is_none());
    }

    #[test]
    fn git_service_ids() {
        assert_eq!(GitService::from_id(2), Some(GitService::Nginx));
        assert_eq!(GitService::Apache.id(), 4);
        assert_eq!(GitService::from_id(9), None);
    }
}
