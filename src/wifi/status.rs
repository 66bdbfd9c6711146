//! Parsers for the loosely structured `netsh wlan show ...` output.
//!
//! netsh prints `label : value` lines whose labels follow the console
//! locale. English and Simplified Chinese labels are recognized; any other
//! locale leaves fields unset and the connection state [`Unknown`].
//!
//! [`Unknown`]: ConnectionState::Unknown

use crate::config::labels;
use crate::wifi::types::{ConnectionState, InterfaceStatus};

/// Split a line on its first colon into a lower-cased label and a value.
/// Lines without a colon or with a blank value yield `None`.
fn split_label(line: &str) -> Option<(String, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (left, right) = line.split_once(':')?;
    let value = right.trim();
    if value.is_empty() {
        return None;
    }
    Some((left.trim().to_lowercase(), value))
}

/// Parse `netsh wlan show interfaces` output
pub fn parse_interface_status(output: &str) -> InterfaceStatus {
    let mut status = InterfaceStatus::default();

    for (label, value) in output.lines().filter_map(split_label) {
        let label = label.as_str();
        if labels::INTERFACE_NAME.contains(&label) {
            status.interface_name = Some(value.to_string());
        } else if labels::STATE.contains(&label) {
            status.state = Some(value.to_string());
        } else if label.starts_with(labels::SSID_PREFIX) {
            status.ssid = Some(value.to_string());
        } else if labels::PROFILE.contains(&label) {
            status.profile = Some(value.to_string());
        }
    }

    status
}

fn is_disconnected(state: &str) -> bool {
    state.to_lowercase().contains(labels::DISCONNECTED) || state.contains(labels::DISCONNECTED_ZH)
}

/// Whether a localized state text means "connected".
///
/// Texts naming a disconnected state (`disconnected`, `断开`) are excluded even
/// though they contain the English word.
pub fn is_connected_state(state: Option<&str>) -> bool {
    let Some(state) = state else {
        return false;
    };
    if is_disconnected(state) {
        return false;
    }
    state.trim().to_lowercase().contains(labels::CONNECTED) || state.contains(labels::CONNECTED_ZH)
}

pub fn connection_state(state: Option<&str>) -> ConnectionState {
    match state {
        Some(s) if is_disconnected(s) => ConnectionState::Disconnected,
        s if is_connected_state(s) => ConnectionState::Connected,
        _ => ConnectionState::Unknown,
    }
}

/// Extract profile names from `netsh wlan show profiles` output
pub fn parse_profile_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| labels::ALL_USER_PROFILE.iter().any(|m| line.contains(m)))
        .filter_map(|line| line.split_once(':'))
        .map(|(_, name)| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
