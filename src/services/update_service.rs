use std::cmp::Ordering;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::UpdateConfig;
use crate::error::{Error, Result};
use crate::utils::crypto;

const CHECKSUM_SUFFIX: &str = ".sha256";

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub name: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub current_version: String,
    pub latest_version: String,
    pub update_available: bool,
    pub release_name: Option<String>,
    pub release_notes: Option<String>,
    pub asset_name: Option<String>,
    pub checked_at: DateTime<Local>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallOutcome {
    pub installed_version: String,
    pub executable: String,
    pub backup: String,
    pub checksum_verified: bool,
    pub restart_required: bool,
}

/// Release tag without surrounding whitespace and at most one leading `v`/`V`.
pub fn display_version(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
}

fn parse_version(raw: &str) -> Option<Vec<u64>> {
    let trimmed = display_version(raw);
    if trimmed.is_empty() {
        return None;
    }
    trimmed.split('.').map(|part| part.parse::<u64>().ok()).collect()
}

/// Dotted numeric comparison; a leading `v` is ignored and missing parts count as zero.
/// Anything unparsable is never newer.
pub fn is_newer_version(latest: &str, current: &str) -> bool {
    let (Some(latest), Some(current)) = (parse_version(latest), parse_version(current)) else {
        return false;
    };
    let len = latest.len().max(current.len());
    for idx in 0..len {
        let l = latest.get(idx).copied().unwrap_or(0);
        let c = current.get(idx).copied().unwrap_or(0);
        match l.cmp(&c) {
            Ordering::Greater => return true,
            Ordering::Less => return false,
            Ordering::Equal => {}
        }
    }
    false
}

/// First asset ending in `suffix`; checksum files are never installable.
pub fn select_asset<'a>(release: &'a Release, suffix: &str) -> Option<&'a ReleaseAsset> {
    release.assets.iter().find(|asset| {
        let name = asset.name.to_ascii_lowercase();
        !name.ends_with(CHECKSUM_SUFFIX) && name.ends_with(&suffix.to_ascii_lowercase())
    })
}

fn checksum_asset<'a>(release: &'a Release, asset: &ReleaseAsset) -> Option<&'a ReleaseAsset> {
    let wanted = format!("{}{}", asset.name, CHECKSUM_SUFFIX);
    release.assets.iter().find(|a| a.name.eq_ignore_ascii_case(&wanted))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Swaps `new_binary` in at `target`, keeping the previous file at `<target>.backup`.
/// On failure the original is put back.
pub fn replace_executable(target: &Path, new_binary: &[u8]) -> Result<PathBuf> {
    let staged = with_suffix(target, ".new");
    let backup = with_suffix(target, ".backup");

    std::fs::write(&staged, new_binary)?;
    if let Ok(meta) = std::fs::metadata(target) {
        std::fs::set_permissions(&staged, meta.permissions())?;
    }
    if backup.exists() {
        std::fs::remove_file(&backup)?;
    }

    if let Err(e) = std::fs::rename(target, &backup) {
        let _ = std::fs::remove_file(&staged);
        return Err(Error::Io(e));
    }
    if let Err(e) = std::fs::rename(&staged, target) {
        tracing::error!(error = %e, "failed to move new executable in place, restoring backup");
        std::fs::rename(&backup, target)?;
        let _ = std::fs::remove_file(&staged);
        return Err(Error::Io(e));
    }
    Ok(backup)
}

#[derive(Clone)]
pub struct UpdateService {
    client: Client,
    config: UpdateConfig,
    latest: Arc<RwLock<Option<UpdateStatus>>>,
}

impl UpdateService {
    pub fn new(config: UpdateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("exam-generator/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            config,
            latest: Arc::new(RwLock::new(None)),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.feed_url.is_some()
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    async fn fetch_release(&self) -> Result<Release> {
        let url = self.config.feed_url.as_deref().ok_or_else(|| {
            Error::BadRequest("Update checks are disabled: UPDATE_FEED_URL is not set".to_string())
        })?;
        let release = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json::<Release>()
            .await?;
        Ok(release)
    }

    fn status_for(&self, release: &Release) -> UpdateStatus {
        let latest_version = display_version(&release.tag_name).to_string();
        UpdateStatus {
            current_version: self.config.current_version.clone(),
            update_available: is_newer_version(&latest_version, &self.config.current_version),
            latest_version,
            release_name: release.name.clone(),
            release_notes: release.body.clone(),
            asset_name: select_asset(release, &self.config.asset_suffix).map(|a| a.name.clone()),
            checked_at: Local::now(),
        }
    }

    /// Queries the feed and caches the result.
    pub async fn check(&self) -> Result<UpdateStatus> {
        let release = self.fetch_release().await?;
        let status = self.status_for(&release);
        if status.update_available {
            tracing::info!(
                current = %status.current_version,
                latest = %status.latest_version,
                "update available"
            );
        } else {
            tracing::debug!(current = %status.current_version, "no update available");
        }
        *self.latest.write().await = Some(status.clone());
        Ok(status)
    }

    /// Last cached check result, if any.
    pub async fn status(&self) -> Option<UpdateStatus> {
        self.latest.read().await.clone()
    }

    pub async fn install(&self) -> Result<InstallOutcome> {
        let target = std::env::current_exe()?;
        self.install_to(&target).await
    }

    /// Downloads the newest release asset and replaces `target` with it.
    pub async fn install_to(&self, target: &Path) -> Result<InstallOutcome> {
        let release = self.fetch_release().await?;
        let status = self.status_for(&release);
        if !status.update_available {
            return Err(Error::BadRequest(format!(
                "Already running the latest version ({})",
                status.current_version
            )));
        }
        let asset = select_asset(&release, &self.config.asset_suffix).ok_or_else(|| {
            Error::NotFound(format!(
                "Release {} has no asset ending in '{}'",
                status.latest_version, self.config.asset_suffix
            ))
        })?;

        tracing::info!(asset = %asset.name, size = ?asset.size, "downloading update");
        let bytes = self
            .client
            .get(&asset.browser_download_url)
            .timeout(Duration::from_secs(300))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        if bytes.is_empty() {
            return Err(Error::Internal("Downloaded update is empty".to_string()));
        }

        let checksum_verified = match checksum_asset(&release, asset) {
            Some(sum) => {
                let expected = self
                    .client
                    .get(&sum.browser_download_url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;
                let expected = expected.split_whitespace().next().unwrap_or_default();
                let actual = crypto::sha256_hex(&bytes);
                if !expected.eq_ignore_ascii_case(&actual) {
                    tracing::error!(expected, actual = %actual, "update checksum mismatch");
                    return Err(Error::Internal(
                        "Downloaded update failed checksum verification".to_string(),
                    ));
                }
                true
            }
            None => false,
        };

        let target_path = target.to_path_buf();
        let backup = tokio::task::spawn_blocking(move || replace_executable(&target_path, &bytes))
            .await
            .map_err(|e| Error::Internal(format!("Update task failed: {}", e)))??;

        tracing::info!(
            version = %status.latest_version,
            backup = %backup.display(),
            "update installed, restart required"
        );
        Ok(InstallOutcome {
            installed_version: status.latest_version,
            executable: target.to_string_lossy().into_owned(),
            backup: backup.to_string_lossy().into_owned(),
            checksum_verified,
            restart_required: true,
        })
    }
}
