//! WiFi profile management for netshui
//!
//! This module drives `netsh wlan` to list, add, delete, export and connect
//! saved wireless profiles, and converts profiles to and from the WLAN
//! profile XML format.

mod command;
mod netsh;
mod profile;
mod service;
mod status;
mod types;

// Re-export public API
pub use netsh::{ConnectTiming, NetshExecutor};
pub use profile::create_profile_xml;
pub use service::WifiService;
pub use types::{ConnectionMode, InterfaceStatus, WifiNetworkList, WifiProfile};
