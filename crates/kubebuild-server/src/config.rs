use kubebuild_controller::{
    BuiltinTemplateSource, ControllerConfig, DirectoryTemplateSource, Preset, ReconcileOptions,
    Renderer, TemplateSource,
};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub controller: ControllerSettings,
    #[serde(default)]
    pub templates: TemplateSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        self.controller
            .preset
            .parse::<Preset>()
            .map_err(|e| format!("controller.preset: {e}"))?;
        if self.controller.workers == 0 {
            return Err("controller.workers must be > 0".into());
        }
        if self.controller.requeue_after_secs == 0 {
            return Err("controller.requeue_after_secs must be > 0".into());
        }
        if self.controller.pod_grace_period_seconds < 0 {
            return Err("controller.pod_grace_period_seconds must be >= 0".into());
        }
        if self.controller.field_manager.trim().is_empty() {
            return Err("controller.field_manager must not be empty".into());
        }
        if let Some(dir) = &self.templates.dir {
            if dir.as_os_str().is_empty() {
                return Err("templates.dir must not be empty when set".into());
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn preset(&self) -> Preset {
        self.controller.preset.parse().unwrap_or_default()
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions::from_preset(self.preset())
            .with_requeue_after(Duration::from_secs(self.controller.requeue_after_secs))
            .with_pod_grace_period(self.controller.pod_grace_period_seconds)
            .with_field_manager(self.controller.field_manager.clone())
    }

    pub fn controller_config(&self) -> ControllerConfig {
        let resync = self.controller.resync_interval_secs;
        ControllerConfig {
            workers: self.controller.workers,
            resync_interval: (resync > 0).then(|| Duration::from_secs(resync)),
            error_requeue_after: Duration::from_secs(self.controller.requeue_after_secs),
        }
    }

    /// Renderer over `templates.dir`, or the built-in templates when unset.
    pub fn renderer(&self) -> Renderer {
        let source: Arc<dyn TemplateSource> = match &self.templates.dir {
            Some(dir) => Arc::new(DirectoryTemplateSource::new(dir.clone())),
            None => Arc::new(BuiltinTemplateSource),
        };
        Renderer::new(source)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    9443
}
fn default_body_limit() -> usize {
    3 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// `minimal` or `full`.
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// 0 disables periodic resync.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,
    #[serde(default = "default_requeue_after_secs")]
    pub requeue_after_secs: u64,
    #[serde(default = "default_pod_grace_period_seconds")]
    pub pod_grace_period_seconds: i64,
    #[serde(default = "default_field_manager")]
    pub field_manager: String,
}

fn default_preset() -> String {
    Preset::default().to_string()
}
fn default_workers() -> usize {
    2
}
fn default_resync_interval_secs() -> u64 {
    300
}
fn default_requeue_after_secs() -> u64 {
    kubebuild_controller::reconcile::DEFAULT_REQUEUE_AFTER.as_secs()
}
fn default_pod_grace_period_seconds() -> i64 {
    kubebuild_controller::reconcile::DEFAULT_POD_GRACE_PERIOD_SECONDS
}
fn default_field_manager() -> String {
    kubebuild_controller::reconcile::DEFAULT_FIELD_MANAGER.into()
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            workers: default_workers(),
            resync_interval_secs: default_resync_interval_secs(),
            requeue_after_secs: default_requeue_after_secs(),
            pod_grace_period_seconds: default_pod_grace_period_seconds(),
            field_manager: default_field_manager(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TemplateSettings {
    /// Directory holding `deployment.yaml`, `service.yaml` and `ingress.yaml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "kubebuild.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., KUBEBUILD__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("KUBEBUILD")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
