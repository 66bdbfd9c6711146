use crate::config;
use crate::error::{WifiError, WifiResult};
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;

/// Whether Windows joins the network on its own
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    #[default]
    Auto,
    Manual,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Auto => "auto",
            ConnectionMode::Manual => "manual",
        }
    }
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ConnectionMode::Auto),
            "manual" => Ok(ConnectionMode::Manual),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationType {
    Open,
    #[default]
    Wpa2Psk,
    Wpa3Sae,
}

impl AuthenticationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticationType::Open => "open",
            AuthenticationType::Wpa2Psk => "WPA2PSK",
            AuthenticationType::Wpa3Sae => "WPA3SAE",
        }
    }
}

impl FromStr for AuthenticationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(AuthenticationType::Open),
            "WPA2PSK" => Ok(AuthenticationType::Wpa2Psk),
            "WPA3SAE" => Ok(AuthenticationType::Wpa3Sae),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    None,
    #[default]
    Aes,
    Tkip,
}

impl EncryptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionType::None => "none",
            EncryptionType::Aes => "AES",
            EncryptionType::Tkip => "TKIP",
        }
    }
}

impl FromStr for EncryptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(EncryptionType::None),
            "AES" => Ok(EncryptionType::Aes),
            "TKIP" => Ok(EncryptionType::Tkip),
            other => Err(other.to_string()),
        }
    }
}

/// A saved wireless network configuration
#[derive(Debug)]
pub struct WifiProfile {
    name: String,
    password: SecretString,
    pub connection_mode: ConnectionMode,
    pub authentication_type: AuthenticationType,
    pub encryption_type: EncryptionType,
    pub auto_switch: bool,
    pub enable_randomization: bool,
}

impl WifiProfile {
    /// Build a profile with default security settings.
    ///
    /// Fails when the name is blank or the password is shorter than
    /// [`config::MIN_PASSWORD_LEN`] characters.
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> WifiResult<Self> {
        let name = name.into();
        let password = password.into();

        if name.trim().is_empty() {
            return Err(WifiError::EmptyName);
        }
        if password.chars().count() < config::MIN_PASSWORD_LEN {
            return Err(WifiError::PasswordTooShort {
                min: config::MIN_PASSWORD_LEN,
            });
        }

        Ok(Self {
            name,
            password: SecretString::from(password),
            connection_mode: ConnectionMode::default(),
            authentication_type: AuthenticationType::default(),
            encryption_type: EncryptionType::default(),
            auto_switch: false,
            enable_randomization: true,
        })
    }

    pub fn with_connection_mode(mut self, mode: ConnectionMode) -> Self {
        self.connection_mode = mode;
        self
    }

    pub fn with_authentication(mut self, auth: AuthenticationType) -> Self {
        self.authentication_type = auth;
        self
    }

    pub fn with_encryption(mut self, cipher: EncryptionType) -> Self {
        self.encryption_type = cipher;
        self
    }

    pub fn with_auto_switch(mut self, enable: bool) -> Self {
        self.auto_switch = enable;
        self
    }

    pub fn with_randomization(mut self, enable: bool) -> Self {
        self.enable_randomization = enable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Uppercase hex of the UTF-8 bytes of the name
    pub fn ssid_hex(&self) -> String {
        self.name.bytes().map(|b| format!("{b:02X}")).collect()
    }

    /// Compare every user-visible setting, password included
    #[cfg(test)]
    pub fn same_settings(&self, other: &WifiProfile) -> bool {
        use secrecy::ExposeSecret;
        self.name == other.name
            && self.password.expose_secret() == other.password.expose_secret()
            && self.connection_mode == other.connection_mode
            && self.authentication_type == other.authentication_type
            && self.encryption_type == other.encryption_type
            && self.auto_switch == other.auto_switch
            && self.enable_randomization == other.enable_randomization
    }
}

/// Coarse connection state derived from the localized state text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Unknown,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Snapshot of `netsh wlan show interfaces`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InterfaceStatus {
    pub interface_name: Option<String>,
    pub state: Option<String>,
    pub ssid: Option<String>,
    pub profile: Option<String>,
}

impl InterfaceStatus {
    pub fn is_connected(&self) -> bool {
        super::status::is_connected_state(self.state.as_deref())
    }

    pub fn connection_state(&self) -> ConnectionState {
        super::status::connection_state(self.state.as_deref())
    }

    /// Connected, and either the active profile or the SSID is `name`
    pub fn is_connected_to(&self, name: &str) -> bool {
        self.is_connected()
            && (self.profile.as_deref() == Some(name) || self.ssid.as_deref() == Some(name))
    }

    /// One-line diagnostic with `unknown` for missing fields
    pub fn summary(&self) -> String {
        fn or_unknown(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("unknown")
        }
        format!(
            "interface={}, state={}, SSID={}, profile={}",
            or_unknown(&self.interface_name),
            or_unknown(&self.state),
            or_unknown(&self.ssid),
            or_unknown(&self.profile),
        )
    }
}

/// Saved profile names, in the order netsh listed them
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WifiNetworkList {
    pub profiles: Vec<String>,
}

impl WifiNetworkList {
    pub fn new(profiles: Vec<String>) -> Self {
        Self { profiles }
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.iter().any(|p| p == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(String::as_str)
    }
}
