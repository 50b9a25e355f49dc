//! Command-line and environment configuration.

use crate::gateway::GatewayConfig;
use crate::notify::{LogSink, NotificationSink, NotifyResult, WebhookSink};
use clap::{Parser, ValueEnum};
use hwgate_license::{DEFAULT_LEDGER_KEY, LedgerConfig};
use hwgate_store::{
    DurableStore, FileStore, FileStoreConfig, GitHubStore, GitHubStoreConfig, MemoryStore,
    StoreError, StoreResult,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on each notification delivery.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the ledger file is kept.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// In process memory; lost on exit
    Memory,
    /// A file under `--data-dir`
    File,
    /// A file in a GitHub repository
    Github,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "hwgate-server")]
#[command(about = "Hardware-id entitlement and liveness service")]
#[command(version)]
pub struct Args {
    /// HTTP port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Shared secret required by authorize and revoke
    #[arg(long, env = "ADMIN_KEY", hide_env_values = true)]
    pub admin_key: String,

    /// Seconds without a heartbeat before an instance counts as gone
    #[arg(
        long,
        env = "INACTIVITY_THRESHOLD_SECS",
        default_value = "900",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub inactivity_threshold_secs: u64,

    /// Grant length used when an authorize request gives no `days`
    #[arg(long, env = "DEFAULT_VALIDITY_DAYS", default_value = "30")]
    pub default_validity_days: u32,

    /// Ledger storage backend
    #[arg(long, env = "HWGATE_STORE", value_enum, default_value_t = StoreKind::File)]
    pub store: StoreKind,

    /// Directory for the file store
    #[arg(long, env = "HWGATE_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Name of the ledger file within the store
    #[arg(long, env = "HWGATE_LEDGER_KEY", default_value = DEFAULT_LEDGER_KEY)]
    pub ledger_key: String,

    /// Repository (`owner/name`) for the GitHub store
    #[arg(long, env = "GITHUB_REPO", required_if_eq("store", "github"))]
    pub github_repo: Option<String>,

    /// Branch for the GitHub store
    #[arg(long, env = "GITHUB_BRANCH", default_value = "main")]
    pub github_branch: String,

    /// Token for the GitHub store
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Upper bound on each ledger store call, in seconds
    #[arg(long, env = "HWGATE_STORE_TIMEOUT_SECS", default_value = "10")]
    pub store_timeout_secs: u64,

    /// Webhook receiving `{"text": ...}` notifications; logged only if unset
    #[arg(long, env = "HWGATE_NOTIFY_URL")]
    pub notify_url: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    #[must_use]
    pub fn inactivity_threshold(&self) -> Duration {
        Duration::from_secs(self.inactivity_threshold_secs)
    }

    #[must_use]
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            store_key: self.ledger_key.clone(),
            store_timeout: Duration::from_secs(self.store_timeout_secs),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            admin_key: self.admin_key.clone(),
            default_validity_days: i64::from(self.default_validity_days),
            notify_timeout: NOTIFY_TIMEOUT,
        }
    }

    /// Builds the configured ledger store.
    pub fn build_store(&self) -> StoreResult<Arc<dyn DurableStore>> {
        let store: Arc<dyn DurableStore> = match self.store {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::File => Arc::new(FileStore::new(FileStoreConfig {
                root: self.data_dir.clone(),
            })),
            StoreKind::Github => {
                let repository = self.github_repo.clone().ok_or_else(|| {
                    StoreError::Unavailable("--github-repo is required for the GitHub store".into())
                })?;
                Arc::new(GitHubStore::new(GitHubStoreConfig {
                    repository,
                    branch: self.github_branch.clone(),
                    token: self.github_token.clone().unwrap_or_default(),
                    api_base_url: self.github_api_url.clone(),
                    request_timeout_secs: self.store_timeout_secs,
                    ..Default::default()
                })?)
            }
        };
        Ok(store)
    }

    /// Builds the notification sink: a webhook if a URL is configured,
    /// otherwise the log.
    pub fn build_sink(&self) -> NotifyResult<Arc<dyn NotificationSink>> {
        Ok(match &self.notify_url {
            Some(url) => Arc::new(WebhookSink::new(url.clone(), NOTIFY_TIMEOUT)?),
            None => Arc::new(LogSink),
        })
    }
}
