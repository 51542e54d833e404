//! Deployment version polling.
//!
//! Polls a version manifest on an interval and publishes changes over a
//! watch channel. The checker owns its polling task; callers construct
//! one, start it, and stop it on shutdown. Nothing here is global.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::UpdateConfig;

/// Version manifest served by the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub build_time: Option<String>,
}

pub struct UpdateChecker {
    client: Client,
    version_url: Option<String>,
    interval: Duration,
    latest: watch::Sender<Option<VersionInfo>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl UpdateChecker {
    pub fn new(config: &UpdateConfig) -> Self {
        let (latest, _) = watch::channel(None);
        UpdateChecker {
            client: Client::new(),
            version_url: config.version_url.clone(),
            interval: Duration::from_secs(config.interval_secs.max(1)),
            latest,
            task: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.version_url.is_some()
    }

    /// Latest manifest seen, if any poll has succeeded yet.
    pub fn latest(&self) -> Option<VersionInfo> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<VersionInfo>> {
        self.latest.subscribe()
    }

    /// Start the polling task. No-op when no version URL is configured or
    /// the task is already running.
    pub fn start(&self) {
        let Some(url) = self.version_url.clone() else {
            return;
        };
        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if task.is_some() {
            return;
        }

        let client = self.client.clone();
        let interval = self.interval;
        let latest = self.latest.clone();
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match fetch_version(&client, &url).await {
                    Ok(info) => {
                        latest.send_if_modified(|current| {
                            if current.as_ref() == Some(&info) {
                                return false;
                            }
                            tracing::info!(version = %info.version, "new deployment version");
                            *current = Some(info.clone());
                            true
                        });
                    }
                    Err(e) => {
                        tracing::debug!("version poll failed: {}", e);
                    }
                }
            }
        }));
    }

    /// Stop the polling task if it is running.
    pub fn stop(&self) {
        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

impl Drop for UpdateChecker {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn fetch_version(client: &Client, url: &str) -> Result<VersionInfo, reqwest::Error> {
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: Option<String>, interval_secs: u64) -> UpdateConfig {
        UpdateConfig {
            version_url: url,
            interval_secs,
        }
    }

    #[tokio::test]
    async fn unconfigured_checker_never_starts() {
        let checker = UpdateChecker::new(&config(None, 1));
        assert!(!checker.is_configured());
        checker.start();
        assert!(checker.task.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn polling_publishes_manifest_changes_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/version.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "version": "1.2.3",
                "build_time": "2026-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let checker = UpdateChecker::new(&config(Some(format!("{}/version.json", server.uri())), 1));
        let mut rx = checker.subscribe();
        checker.start();

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        let info = rx.borrow().clone().unwrap();
        assert_eq!(info.version, "1.2.3");

        checker.stop();
        assert!(checker.task.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_polls_leave_latest_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let checker = UpdateChecker::new(&config(Some(server.uri()), 1));
        checker.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(checker.latest().is_none());
        checker.stop();
    }
}
