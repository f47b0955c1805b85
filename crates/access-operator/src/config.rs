use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use access_common::telemetry::LogFormat;
use access_okta::OktaConfig;

/// access-manager - keeps Okta groups in sync with OktaGroup resources
#[derive(Parser, Debug)]
#[command(name = "access-manager", version, about, long_about = None)]
pub struct Cli {
    /// Print the OktaGroup CRD manifest and exit
    #[arg(long)]
    pub crd: bool,

    /// Okta org URL, e.g. https://example.okta.com
    #[arg(long, env = "OKTA_CLIENT_ORGURL", required_unless_present = "crd")]
    pub okta_org_url: Option<String>,

    /// Okta API token
    #[arg(
        long,
        env = "OKTA_CLIENT_TOKEN",
        hide_env_values = true,
        required_unless_present = "crd"
    )]
    pub okta_api_token: Option<String>,

    /// Timeout applied to every Okta API request, in seconds
    #[arg(long, env = "OKTA_CLIENT_TIMEOUT_SECS", default_value_t = 30)]
    pub okta_timeout_secs: u64,

    /// Re-sync settled OktaGroups after this many seconds; 0 disables
    #[arg(long, env = "ACCESS_MANAGER_RESYNC_SECS", default_value_t = 300)]
    pub resync_interval_secs: u64,

    /// Log output format: json or text
    #[arg(long, env = "ACCESS_MANAGER_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Path to a kubeconfig; in-cluster or default config otherwise
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,
}

impl Cli {
    /// Okta connection settings, validated
    pub fn okta_config(&self) -> anyhow::Result<OktaConfig> {
        let org_url = self
            .okta_org_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--okta-org-url is required"))?;
        let api_token = self
            .okta_api_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("--okta-api-token is required"))?;

        let config = OktaConfig::new(org_url, api_token)
            .with_timeout(Duration::from_secs(self.okta_timeout_secs));
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid Okta configuration: {}", e))?;
        Ok(config)
    }

    /// Resync interval, `None` when disabled
    pub fn resync_interval(&self) -> Option<Duration> {
        match self.resync_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
