// Backup jobs: rsync to a remote host, S3 upload, and Git push of
// service configs. Deletes must repeat the owning server (and the
// credential or bucket) in the request body.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use tf_provider::map;
use tf_provider::schema::Block;

use roxywi_api::RoxyClient;
use roxywi_api::backups::{self, BackupKind, BackupSchedule, GitService};

use crate::error::ProviderError;
use crate::resource::ResourceKind;
use crate::schema::{block, number, optional, required, sensitive, string};
use crate::validate::Validator;
use crate::value::{Int, Str, as_str, int, known, refreshed, text};

const SCHEDULE: &str = "How often the job runs: daily, weekly or monthly";

// ── Filesystem ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsBackupState {
    pub id: Str,
    pub server_id: Int,
    pub cred_id: Int,
    pub rserver: Str,
    pub rpath: Str,
    pub time: Str,
    #[serde(rename = "type")]
    pub kind: Str,
    pub description: Str,
}

impl FsBackupState {
    fn request(&self) -> backups::FsBackup {
        backups::FsBackup {
            server_id: int(&self.server_id),
            cred_id: int(&self.cred_id),
            rserver: text(&self.rserver),
            rpath: text(&self.rpath),
            time: text(&self.time),
            kind: text(&self.kind),
            description: text(&self.description),
        }
    }
}

pub struct FsBackup;

#[async_trait]
impl ResourceKind for FsBackup {
    type State = FsBackupState;
    const NAME: &'static str = "roxywi_backup_fs";

    fn schema(&self) -> Block {
        block(
            "Copies a server's configs to a remote host with rsync",
            map! {
                "server_id" => required(number(), "Server whose configs are backed up"),
                "cred_id" => required(number(), "SSH credential for the remote host"),
                "rserver" => required(string(), "Remote host"),
                "rpath" => required(string(), "Path on the remote host"),
                "time" => required(string(), SCHEDULE),
                "type" => required(string(), "backup or synchronization"),
                "description" => optional(string(), "Free text"),
            },
        )
    }

    fn validate(&self, state: &FsBackupState, checks: &mut Validator) {
        checks.one_of("time", &state.time, BackupSchedule::VARIANTS);
        checks.one_of("type", &state.kind, BackupKind::VARIANTS);
    }

    fn id<'s>(&self, state: &'s FsBackupState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut FsBackupState, id: Str) {
        state.id = id;
    }

    async fn create(&self, client: &RoxyClient, plan: &FsBackupState) -> Result<String, ProviderError> {
        Ok(client.create_fs_backup(&plan.request()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &FsBackupState,
    ) -> Result<Option<FsBackupState>, ProviderError> {
        let job = client.get_fs_backup(id).await?;
        Ok(Some(FsBackupState {
            id: prior.id.clone(),
            server_id: refreshed(&prior.server_id, job.server_id),
            cred_id: refreshed(&prior.cred_id, job.cred_id),
            rserver: refreshed(&prior.rserver, job.rserver),
            rpath: refreshed(&prior.rpath, job.rpath),
            time: refreshed(&prior.time, job.time),
            kind: refreshed(&prior.kind, job.kind),
            description: refreshed(&prior.description, job.description),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &FsBackupState,
        plan: &FsBackupState,
    ) -> Result<(), ProviderError> {
        Ok(client.update_fs_backup(id, &plan.request()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, state: &FsBackupState) -> Result<(), ProviderError> {
        Ok(client
            .delete_fs_backup(id, int(&state.server_id), int(&state.cred_id))
            .await?)
    }
}

// ── S3 ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3BackupState {
    pub id: Str,
    pub server_id: Int,
    pub s3_server: Str,
    pub bucket: Str,
    pub access_key: Str,
    pub secret_key: Str,
    pub time: Str,
    pub description: Str,
}

impl S3BackupState {
    fn request(&self) -> backups::S3Backup {
        backups::S3Backup {
            server_id: int(&self.server_id),
            s3_server: text(&self.s3_server),
            bucket: text(&self.bucket),
            access_key: text(&self.access_key),
            secret_key: text(&self.secret_key),
            time: text(&self.time),
            description: text(&self.description),
        }
    }
}

pub struct S3Backup;

#[async_trait]
impl ResourceKind for S3Backup {
    type State = S3BackupState;
    const NAME: &'static str = "roxywi_backup_s3";

    fn schema(&self) -> Block {
        block(
            "Uploads a server's configs to an S3 bucket",
            map! {
                "server_id" => required(number(), "Server whose configs are backed up"),
                "s3_server" => required(string(), "S3 endpoint"),
                "bucket" => required(string(), "Bucket name"),
                "access_key" => sensitive(required(string(), "S3 access key")),
                "secret_key" => sensitive(required(string(), "S3 secret key")),
                "time" => required(string(), SCHEDULE),
                "description" => optional(string(), "Free text"),
            },
        )
    }

    fn validate(&self, state: &S3BackupState, checks: &mut Validator) {
        checks.one_of("time", &state.time, BackupSchedule::VARIANTS);
    }

    fn id<'s>(&self, state: &'s S3BackupState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut S3BackupState, id: Str) {
        state.id = id;
    }

    async fn create(&self, client: &RoxyClient, plan: &S3BackupState) -> Result<String, ProviderError> {
        Ok(client.create_s3_backup(&plan.request()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &S3BackupState,
    ) -> Result<Option<S3BackupState>, ProviderError> {
        let job = client.get_s3_backup(id).await?;
        // Keys are write-only.
        Ok(Some(S3BackupState {
            server_id: refreshed(&prior.server_id, job.server_id),
            s3_server: refreshed(&prior.s3_server, job.s3_server),
            bucket: refreshed(&prior.bucket, job.bucket),
            time: refreshed(&prior.time, job.time),
            description: refreshed(&prior.description, job.description),
            ..prior.clone()
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &S3BackupState,
        plan: &S3BackupState,
    ) -> Result<(), ProviderError> {
        Ok(client.update_s3_backup(id, &plan.request()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, state: &S3BackupState) -> Result<(), ProviderError> {
        Ok(client
            .delete_s3_backup(id, int(&state.server_id), as_str(&state.bucket))
            .await?)
    }
}

// ── Git ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitBackupState {
    pub id: Str,
    pub server_id: Int,
    pub service_id: Int,
    pub cred_id: Int,
    pub repo: Str,
    pub branch: Str,
    pub time: Str,
    pub description: Str,
}

impl GitBackupState {
    fn request(&self) -> backups::GitBackup {
        backups::GitBackup {
            server_id: int(&self.server_id),
            service_id: int(&self.service_id),
            cred_id: int(&self.cred_id),
            repo: text(&self.repo),
            branch: text(&self.branch),
            time: text(&self.time),
            description: text(&self.description),
        }
    }
}

pub struct GitBackup;

#[async_trait]
impl ResourceKind for GitBackup {
    type State = GitBackupState;
    const NAME: &'static str = "roxywi_backup_git";

    fn schema(&self) -> Block {
        block(
            "Pushes a service's configs to a Git repository",
            map! {
                "server_id" => required(number(), "Server whose configs are pushed"),
                "service_id" => required(number(), "1 HAProxy, 2 NGINX, 3 Keepalived, 4 Apache"),
                "cred_id" => required(number(), "SSH credential used for the push"),
                "repo" => required(string(), "Repository URL"),
                "branch" => required(string(), "Branch to push to"),
                "time" => required(string(), SCHEDULE),
                "description" => optional(string(), "Free text"),
            },
        )
    }

    fn validate(&self, state: &GitBackupState, checks: &mut Validator) {
        checks.one_of("time", &state.time, BackupSchedule::VARIANTS);
        if let Some(service) = known(&state.service_id) {
            if GitService::from_id(*service).is_none() {
                checks.reject(
                    "service_id",
                    format!("service_id must be 1 (HAProxy), 2 (NGINX), 3 (Keepalived) or 4 (Apache), got {service}"),
                );
            }
        }
    }

    fn id<'s>(&self, state: &'s GitBackupState) -> &'s Str {
        &state.id
    }

    fn set_id(&self, state: &mut GitBackupState, id: Str) {
        state.id = id;
    }

    async fn create(&self, client: &RoxyClient, plan: &GitBackupState) -> Result<String, ProviderError> {
        Ok(client.create_git_backup(&plan.request()).await?)
    }

    async fn read(
        &self,
        client: &RoxyClient,
        id: &str,
        prior: &GitBackupState,
    ) -> Result<Option<GitBackupState>, ProviderError> {
        let job = client.get_git_backup(id).await?;
        Ok(Some(GitBackupState {
            id: prior.id.clone(),
            server_id: refreshed(&prior.server_id, job.server_id),
            service_id: refreshed(&prior.service_id, job.service_id),
            cred_id: refreshed(&prior.cred_id, job.cred_id),
            repo: refreshed(&prior.repo, job.repo),
            branch: refreshed(&prior.branch, job.branch),
            time: refreshed(&prior.time, job.time),
            description: refreshed(&prior.description, job.description),
        }))
    }

    async fn update(
        &self,
        client: &RoxyClient,
        id: &str,
        _prior: &GitBackupState,
        plan: &GitBackupState,
    ) -> Result<(), ProviderError> {
        Ok(client.update_git_backup(id, &plan.request()).await?)
    }

    async fn delete(&self, client: &RoxyClient, id: &str, state: &GitBackupState) -> Result<(), ProviderError> {
        Ok(client
            .delete_git_backup(id, int(&state.server_id), int(&state.cred_id))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn schedules_and_kinds_are_checked() {
        let state = FsBackupState {
            time: Value::Value("hourly".into()),
            kind: Value::Value("synchronization".into()),
            ..FsBackupState::default()
        };
        let mut checks = Validator::new();
        FsBackup.validate(&state, &mut checks);
        let attrs: Vec<&str> = checks.violations().iter().map(|v| v.attribute.as_str()).collect();
        assert_eq!(attrs, ["time"]);
    }

    #[test]
    fn git_service_ids() {
        let mut checks = Validator::new();
        let state = GitBackupState {
            service_id: Value::Value(5),
            time: Value::Value("weekly".into()),
            ..GitBackupState::default()
        };
        GitBackup.validate(&state, &mut checks);
        assert_eq!(checks.violations().len(), 1);
        assert_eq!(checks.violations()[0].attribute, "service_id");
    }
}
