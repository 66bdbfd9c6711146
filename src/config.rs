/// Centralized configuration constants for netshui

// External tool
pub const NETSH: &str = "netsh";

// Timing
pub const CONNECT_SETTLE_MS: u64 = 1500;
pub const CONNECT_POLL_MS: u64 = 400;
pub const CONNECT_TIMEOUT_SECS: u64 = 15;

// Profiles
pub const MIN_PASSWORD_LEN: usize = 8;
pub const SCRATCH_DIR_NAME: &str = "NetshTool";
pub const SCRATCH_FILE_SUFFIX: &str = "_profile.xml";
pub const EXPORT_FILE_PREFIX: &str = "无线网络-";

// Profile XML namespaces
pub const WLAN_PROFILE_NS_V1: &str = "http://www.microsoft.com/networking/WLAN/profile/v1";
pub const WLAN_PROFILE_NS_V3: &str = "http://www.microsoft.com/networking/WLAN/profile/v3";

// netsh output is localized; these are tried in order before a lossy decode
pub const OUTPUT_ENCODINGS: [&str; 4] = ["gbk", "gb2312", "utf-8", "cp936"];

// Labels recognized in `netsh wlan show ...` output
pub mod labels {
    pub const INTERFACE_NAME: [&str; 2] = ["name", "名称"];
    pub const STATE: [&str; 2] = ["state", "状态"];
    pub const SSID_PREFIX: &str = "ssid";
    pub const PROFILE: [&str; 2] = ["profile", "配置文件"];
    pub const ALL_USER_PROFILE: [&str; 2] = ["All User Profile", "所有用户配置文件"];

    pub const CONNECTED: &str = "connected";
    pub const CONNECTED_ZH: &str = "已连接";
    pub const DISCONNECTED: &str = "disconnected";
    pub const DISCONNECTED_ZH: &str = "断开";
}
