//! User-facing WiFi operations built on top of [`NetshExecutor`].
//!
//! Every operation returns `Ok(message)` or an error whose `Display` is the
//! message to show; nothing here panics on bad input.

use crate::config;
use crate::error::{WifiError, WifiResult};
use crate::wifi::netsh::NetshExecutor;
use crate::wifi::profile::{create_profile_xml, parse_profile_xml};
use crate::wifi::types::{ConnectionMode, InterfaceStatus, WifiNetworkList, WifiProfile};
use directories_next::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{error, info, warn};

/// Callback receiving progress lines, registered by the front end
pub type StatusObserver = Box<dyn Fn(&str) + Send + Sync>;

pub struct WifiService {
    executor: NetshExecutor,
    scratch_dir: PathBuf,
    export_dir: Option<PathBuf>,
    observer: Option<StatusObserver>,
}

impl std::fmt::Debug for WifiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiService")
            .field("executor", &self.executor)
            .field("scratch_dir", &self.scratch_dir)
            .field("export_dir", &self.export_dir)
            .finish()
    }
}

/// The user's desktop, or `<home>/Desktop` when the platform has no
/// registered desktop folder
fn desktop_dir() -> Option<PathBuf> {
    let dirs = UserDirs::new()?;
    Some(
        dirs.desktop_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| dirs.home_dir().join("Desktop")),
    )
}

/// Replace characters Windows does not allow in file names
fn scratch_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{stem}{}", config::SCRATCH_FILE_SUFFIX)
}

impl WifiService {
    /// Service backed by the real `netsh`, with its scratch directory under
    /// the system temp folder
    pub fn new(executor: NetshExecutor) -> WifiResult<Self> {
        let scratch_dir = std::env::temp_dir().join(config::SCRATCH_DIR_NAME);
        Self::with_scratch_dir(executor, scratch_dir)
    }

    pub fn with_scratch_dir(executor: NetshExecutor, scratch_dir: PathBuf) -> WifiResult<Self> {
        fs::create_dir_all(&scratch_dir).map_err(|e| WifiError::io(&scratch_dir, e))?;
        Ok(Self {
            executor,
            scratch_dir,
            export_dir: desktop_dir(),
            observer: None,
        })
    }

    pub fn with_export_dir(mut self, dir: PathBuf) -> Self {
        self.export_dir = Some(dir);
        self
    }

    pub fn on_status(mut self, observer: StatusObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.executor.cancel_handle()
    }

    fn notify(&self, message: &str) {
        if let Some(observer) = &self.observer {
            observer(message);
        }
    }

    pub fn interface_status(&self) -> InterfaceStatus {
        self.executor.interface_status()
    }

    pub fn get_saved_networks(&self) -> WifiResult<WifiNetworkList> {
        self.executor
            .show_profiles()
            .inspect_err(|e| error!("Failed to list saved networks: {e}"))
    }

    /// Validate, encode and register a new profile
    pub fn add_wifi_network(
        &self,
        name: &str,
        password: &str,
        auto_connect: bool,
    ) -> WifiResult<String> {
        let mode = if auto_connect {
            ConnectionMode::Auto
        } else {
            ConnectionMode::Manual
        };
        let profile = WifiProfile::new(name, password)
            .inspect_err(|e| error!("{e}"))?
            .with_connection_mode(mode);
        self.add_profile(&profile)
    }

    /// Re-register a profile from a previously exported XML file
    pub fn import_wifi_network(&self, path: &Path) -> WifiResult<String> {
        let xml = fs::read_to_string(path).map_err(|e| WifiError::io(path, e))?;
        let profile = parse_profile_xml(&xml)?;
        self.add_profile(&profile)
    }

    fn add_profile(&self, profile: &WifiProfile) -> WifiResult<String> {
        let name = profile.name();
        self.notify(&format!("Adding {name}"));

        let xml = create_profile_xml(profile);
        let path = self.scratch_dir.join(scratch_file_name(name));
        fs::write(&path, xml).map_err(|e| WifiError::io(&path, e))?;

        match self.executor.add_profile(&path) {
            Ok(_) => {
                let message = format!("Added WiFi network {name}");
                info!("{message}");
                Ok(message)
            }
            Err(e) => {
                error!("Failed to add WiFi network {name}");
                Err(e)
            }
        }
    }

    pub fn delete_wifi_network(&self, name: &str) -> WifiResult<String> {
        self.executor.delete_profile(name)?;
        let message = format!("Deleted WiFi network {name}");
        info!("{message}");
        Ok(message)
    }

    pub fn delete_all_networks(&self) -> WifiResult<String> {
        self.executor.delete_all_profiles()?;
        let message = "Deleted all WiFi profiles".to_string();
        info!("{message}");
        Ok(message)
    }

    /// Export a profile to the desktop
    pub fn export_wifi_network(&self, name: &str, clear_key: bool) -> WifiResult<String> {
        let dir = self.export_dir.as_deref().ok_or(WifiError::NoDesktop)?;
        self.executor.export_profile(name, dir, clear_key)?;

        let file = dir.join(format!("{}{name}.xml", config::EXPORT_FILE_PREFIX));
        let message = format!("Exported profile to {}", file.display());
        info!("{message}");
        Ok(message)
    }

    /// Drop the current association, then connect to `name`
    pub fn connect_wifi(&self, name: &str) -> WifiResult<String> {
        self.notify("Disconnecting");
        if let Err(e) = self.executor.disconnect() {
            warn!("Ignoring disconnect failure: {e}");
        }

        self.notify(&format!("Connecting to {name}"));
        match self.executor.connect(name) {
            Ok(_) => {
                let message = format!("Connected to {name}");
                info!("{message}");
                Ok(message)
            }
            Err(e) => {
                error!("Failed to connect to {name}");
                Err(e)
            }
        }
    }

    pub fn disconnect(&self) -> WifiResult<String> {
        self.executor.disconnect()
    }
}
