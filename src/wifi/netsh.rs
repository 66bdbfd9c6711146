use crate::config;
use crate::error::{WifiError, WifiResult};
use crate::wifi::command::{CommandOutput, CommandRunner, SystemCommandRunner};
use crate::wifi::status::{parse_interface_status, parse_profile_names};
use crate::wifi::types::{InterfaceStatus, WifiNetworkList};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Delays used while waiting for `netsh wlan connect` to take effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectTiming {
    /// Pause after issuing the connect command, before the first poll
    pub settle: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConnectTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(config::CONNECT_SETTLE_MS),
            poll_interval: Duration::from_millis(config::CONNECT_POLL_MS),
            timeout: Duration::from_secs(config::CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Granularity of cancellable sleeps
const CANCEL_CHECK: Duration = Duration::from_millis(100);

/// Format a `key=value` argument, quoting values that contain whitespace
fn kv_arg(key: &str, value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("{key}=\"{value}\"")
    } else {
        format!("{key}={value}")
    }
}

/// Runs `netsh wlan` subcommands and interprets their output
pub struct NetshExecutor {
    runner: Box<dyn CommandRunner>,
    timing: ConnectTiming,
    cancelled: Arc<AtomicBool>,
}

impl std::fmt::Debug for NetshExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetshExecutor")
            .field("timing", &self.timing)
            .finish()
    }
}

impl Default for NetshExecutor {
    fn default() -> Self {
        Self::new(Box::new(SystemCommandRunner))
    }
}

impl NetshExecutor {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self {
            runner,
            timing: ConnectTiming::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timing(mut self, timing: ConnectTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Flag that aborts a running [`connect`](Self::connect) wait when set.
    /// The flag is cleared once the wait observes it.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn netsh<I, S>(&self, args: I) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.runner.run(config::NETSH, args)
    }

    /// Sleep for `duration`, waking early with [`WifiError::Cancelled`]
    fn pause(&self, duration: Duration) -> WifiResult<()> {
        let deadline = deadline_after(duration);
        loop {
            if self.cancelled.swap(false, Ordering::SeqCst) {
                return Err(WifiError::Cancelled);
            }
            let now = Instant::now();
            let remaining = match deadline {
                Some(deadline) if now >= deadline => return Ok(()),
                Some(deadline) => deadline - now,
                None => CANCEL_CHECK,
            };
            std::thread::sleep(remaining.min(CANCEL_CHECK));
        }
    }

    /// Current state of the wireless interface.
    ///
    /// An empty status is returned when netsh failed without printing anything.
    pub fn interface_status(&self) -> InterfaceStatus {
        let output = self.netsh(["wlan", "show", "interfaces"]);
        if !output.success && output.text.is_empty() {
            return InterfaceStatus::default();
        }
        parse_interface_status(&output.text)
    }

    /// Whether the interface is connected to `name` (profile or SSID)
    pub fn is_connected_to(&self, name: &str) -> bool {
        self.interface_status().is_connected_to(name)
    }

    /// List saved profiles
    pub fn show_profiles(&self) -> WifiResult<WifiNetworkList> {
        let output = self.netsh(["wlan", "show", "profiles"]);
        if !output.success {
            return Err(WifiError::CommandFailed {
                action: "Listing profiles",
                output: output.text,
            });
        }

        let profiles = WifiNetworkList::new(parse_profile_names(&output.text));
        if !profiles.is_empty() {
            info!("Found {} saved networks", profiles.len());
        }
        Ok(profiles)
    }

    /// Export a profile as XML into `folder`; `clear_key` includes the
    /// passphrase in plain text.
    pub fn export_profile(&self, name: &str, folder: &Path, clear_key: bool) -> WifiResult<String> {
        let mut args = vec![
            "wlan".to_string(),
            "export".to_string(),
            "profile".to_string(),
            format!("name={name}"),
            format!("folder={}", folder.display()),
        ];
        if clear_key {
            args.push("key=clear".to_string());
        }

        let output = self.netsh(args);
        if output.success {
            info!("Exported profile {name}");
            Ok(format!("Exported profile to {}", folder.display()))
        } else {
            error!("Failed to export profile {name}");
            Err(WifiError::CommandFailed {
                action: "Export",
                output: output.text,
            })
        }
    }

    /// Add a profile from an XML file
    pub fn add_profile(&self, xml_path: &Path) -> WifiResult<String> {
        let output = self.netsh([
            "wlan".to_string(),
            "add".to_string(),
            "profile".to_string(),
            format!("filename={}", xml_path.display()),
        ]);
        if output.success {
            info!("Added profile from {}", xml_path.display());
            Ok("Profile added".to_string())
        } else {
            error!("Failed to add profile from {}", xml_path.display());
            Err(WifiError::CommandFailed {
                action: "Add",
                output: output.text,
            })
        }
    }

    pub fn delete_profile(&self, name: &str) -> WifiResult<String> {
        let output = self.netsh([
            "wlan".to_string(),
            "delete".to_string(),
            "profile".to_string(),
            format!("name={name}"),
        ]);
        if output.success {
            info!("Deleted profile {name}");
            Ok(format!("Deleted profile {name}"))
        } else {
            error!("Failed to delete profile {name}");
            Err(WifiError::CommandFailed {
                action: "Delete",
                output: output.text,
            })
        }
    }

    pub fn delete_all_profiles(&self) -> WifiResult<String> {
        let output = self.netsh(["wlan", "delete", "profile", "*"]);
        if output.success {
            info!("Deleted all profiles");
            Ok("Deleted all profiles".to_string())
        } else {
            error!("Failed to delete all profiles");
            Err(WifiError::CommandFailed {
                action: "Delete",
                output: output.text,
            })
        }
    }

    pub fn disconnect(&self) -> WifiResult<String> {
        let output = self.netsh(["wlan", "disconnect"]);
        if output.success {
            Ok("Disconnected".to_string())
        } else {
            error!("Failed to disconnect");
            Err(WifiError::CommandFailed {
                action: "Disconnect",
                output: output.text,
            })
        }
    }

    /// Connect to a saved profile and wait for the interface to report it.
    ///
    /// Already being connected to `name` is a no-op. When the wait times out
    /// the result follows the exit code of `netsh wlan connect`, since Windows
    /// may finish associating after the polling window.
    pub fn connect(&self, name: &str) -> WifiResult<String> {
        let connected = || format!("Connected to {name}");

        let before = self.interface_status();
        if before.is_connected_to(name) {
            info!("Already connected to {name}");
            return Ok(connected());
        }

        let mut args = vec![
            "wlan".to_string(),
            "connect".to_string(),
            kv_arg("name", name),
        ];
        if let Some(interface) = &before.interface_name {
            args.push(kv_arg("interface", interface));
        }
        let output = self.netsh(args);

        self.pause(self.timing.settle)?;

        let deadline = deadline_after(self.timing.timeout);
        while deadline.is_none_or(|deadline| Instant::now() < deadline) {
            if self.is_connected_to(name) {
                info!("Connected to {name}");
                return Ok(connected());
            }
            self.pause(self.timing.poll_interval)?;
        }

        if output.success {
            warn!("Timed out waiting for {name}, but netsh accepted the request");
            return Ok(connected());
        }

        error!("Failed to connect to {name}");
        let status = self.interface_status();
        Err(WifiError::ConnectFailed {
            output: output.text,
            detail: status.summary(),
        })
    }
}

/// `None` when `duration` reaches past what [`Instant`] can represent
fn deadline_after(duration: Duration) -> Option<Instant> {
    Instant::now().checked_add(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wifi::command::MockCommandRunner;
    use std::sync::atomic::AtomicUsize;

    const CONNECTED_HOME: &str = "    Name    : Wi-Fi\n    State   : connected\n    SSID    : Home\n    Profile : Home\n";
    const DISCONNECTED: &str = "    Name    : Wi-Fi\n    State   : disconnected\n";
    const CONNECTED_CAFE: &str =
        "    Name    : Wi-Fi\n    State   : connected\n    SSID    : Coffee Shop\n    Profile : Coffee Shop\n";

    fn is_status_query(args: &[String]) -> bool {
        args == ["wlan", "show", "interfaces"]
    }

    fn is_connect(args: &[String]) -> bool {
        args.get(1).is_some_and(|a| a == "connect")
    }

    fn instant_timing(timeout: Duration) -> ConnectTiming {
        ConnectTiming {
            settle: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
            timeout,
        }
    }

    mod should {
        use super::*;
        use test_log::test;

        #[test]
        fn quote_values_with_whitespace() {
            assert_eq!(kv_arg("name", "Home"), "name=Home");
            assert_eq!(kv_arg("name", "Coffee Shop"), "name=\"Coffee Shop\"");
            assert_eq!(kv_arg("interface", "Wi-Fi 2"), "interface=\"Wi-Fi 2\"");
        }

        #[test]
        fn skip_connect_when_already_connected() {
            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|cmd, args| cmd == "netsh" && is_status_query(args))
                .times(1)
                .returning(|_, _| CommandOutput::new(true, CONNECTED_HOME));

            let executor = NetshExecutor::new(Box::new(mock));
            assert_eq!(executor.connect("Home").unwrap(), "Connected to Home");
        }

        #[test]
        fn poll_until_target_is_reported() {
            let polls = Arc::new(AtomicUsize::new(0));
            let polls_seen = Arc::clone(&polls);

            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|_, args| is_status_query(args))
                .returning(move |_, _| {
                    let text = match polls.fetch_add(1, Ordering::SeqCst) {
                        0 | 1 => DISCONNECTED,
                        _ => CONNECTED_CAFE,
                    };
                    CommandOutput::new(true, text)
                });
            mock.expect_run()
                .withf(|_, args| {
                    is_connect(args)
                        && args[2] == "name=\"Coffee Shop\""
                        && args[3] == "interface=Wi-Fi"
                })
                .times(1)
                .returning(|_, _| CommandOutput::new(true, ""));

            let executor =
                NetshExecutor::new(Box::new(mock)).with_timing(instant_timing(Duration::from_secs(5)));
            assert!(executor.connect("Coffee Shop").is_ok());
            assert_eq!(polls_seen.load(Ordering::SeqCst), 3);
        }

        #[test]
        fn wait_without_deadline_for_huge_timeout() {
            let polls = Arc::new(AtomicUsize::new(0));

            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|_, args| is_status_query(args))
                .returning(move |_, _| {
                    let text = match polls.fetch_add(1, Ordering::SeqCst) {
                        0 => DISCONNECTED,
                        _ => CONNECTED_HOME,
                    };
                    CommandOutput::new(true, text)
                });
            mock.expect_run()
                .withf(|_, args| is_connect(args))
                .times(1)
                .returning(|_, _| CommandOutput::new(true, ""));

            let executor = NetshExecutor::new(Box::new(mock))
                .with_timing(instant_timing(Duration::from_secs(u64::MAX)));
            assert_eq!(executor.connect("Home").unwrap(), "Connected to Home");
        }

        #[test]
        fn cancel_pause_past_instant_range() {
            let executor = NetshExecutor::new(Box::new(MockCommandRunner::new()));
            executor.cancel_handle().store(true, Ordering::SeqCst);
            assert!(matches!(executor.pause(Duration::MAX), Err(WifiError::Cancelled)));
        }

        #[test]
        fn trust_exit_code_after_timeout() {
            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|_, args| is_status_query(args))
                .returning(|_, _| CommandOutput::new(true, DISCONNECTED));
            mock.expect_run()
                .withf(|_, args| is_connect(args))
                .times(1)
                .returning(|_, _| {
                    CommandOutput::new(true, "Connection request was completed successfully.")
                });

            let executor = NetshExecutor::new(Box::new(mock)).with_timing(instant_timing(Duration::ZERO));
            assert_eq!(executor.connect("Home").unwrap(), "Connected to Home");
        }

        #[test]
        fn report_failure_with_diagnostics() {
            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|_, args| is_status_query(args))
                .returning(|_, _| CommandOutput::new(true, DISCONNECTED));
            mock.expect_run()
                .withf(|_, args| is_connect(args))
                .times(1)
                .returning(|_, _| {
                    CommandOutput::new(false, "There is no profile \"Home\" assigned to the specified interface.")
                });

            let executor = NetshExecutor::new(Box::new(mock)).with_timing(instant_timing(Duration::ZERO));
            match executor.connect("Home") {
                Err(WifiError::ConnectFailed { output, detail }) => {
                    assert!(output.contains("There is no profile"));
                    assert_eq!(
                        detail,
                        "interface=Wi-Fi, state=disconnected, SSID=unknown, profile=unknown"
                    );
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[test]
        fn omit_interface_when_unknown() {
            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|_, args| is_status_query(args))
                .returning(|_, _| CommandOutput::new(false, ""));
            mock.expect_run()
                .withf(|_, args| is_connect(args) && args.len() == 3 && args[2] == "name=Home")
                .times(1)
                .returning(|_, _| CommandOutput::new(true, ""));

            let executor = NetshExecutor::new(Box::new(mock)).with_timing(instant_timing(Duration::ZERO));
            assert!(executor.connect("Home").is_ok());
        }

        #[test]
        fn stop_waiting_when_cancelled() {
            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|_, args| is_status_query(args))
                .returning(|_, _| CommandOutput::new(true, DISCONNECTED));
            mock.expect_run()
                .withf(|_, args| is_connect(args))
                .returning(|_, _| CommandOutput::new(true, ""));

            let executor =
                NetshExecutor::new(Box::new(mock)).with_timing(instant_timing(Duration::from_secs(30)));
            executor.cancel_handle().store(true, Ordering::SeqCst);
            assert!(matches!(executor.connect("Home"), Err(WifiError::Cancelled)));
            assert!(!executor.cancel_handle().load(Ordering::SeqCst));
        }

        #[test]
        fn list_saved_profiles() {
            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|_, args| args.as_slice() == ["wlan", "show", "profiles"])
                .times(1)
                .returning(|_, _| {
                    CommandOutput::new(
                        true,
                        "User profiles\n-------------\n    All User Profile     : Home  \n    All User Profile     : Coffee Shop\n",
                    )
                });

            let executor = NetshExecutor::new(Box::new(mock));
            let profiles = executor.show_profiles().unwrap();
            assert_eq!(profiles.profiles, ["Home", "Coffee Shop"]);
        }

        #[test]
        fn fail_listing_when_netsh_fails() {
            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .returning(|_, _| CommandOutput::new(false, "The Wireless AutoConfig Service (wlansvc) is not running."));

            let executor = NetshExecutor::new(Box::new(mock));
            assert!(matches!(
                executor.show_profiles(),
                Err(WifiError::CommandFailed { .. })
            ));
        }

        #[test]
        fn build_profile_management_commands() {
            let mut mock = MockCommandRunner::new();
            mock.expect_run()
                .withf(|_, args| args.as_slice() == ["wlan", "add", "profile", "filename=C:\\tmp\\Home_profile.xml"])
                .times(1)
                .returning(|_, _| CommandOutput::new(true, ""));
            mock.expect_run()
                .withf(|_, args| args.as_slice() == ["wlan", "delete", "profile", "name=Home"])
                .times(1)
                .returning(|_, _| CommandOutput::new(true, ""));
            mock.expect_run()
                .withf(|_, args| args.as_slice() == ["wlan", "delete", "profile", "*"])
                .times(1)
                .returning(|_, _| CommandOutput::new(true, ""));
            mock.expect_run()
                .withf(|_, args| {
                    args.as_slice() == ["wlan", "export", "profile", "name=Home", "folder=C:\\Desktop", "key=clear"]
                })
                .times(1)
                .returning(|_, _| CommandOutput::new(true, ""));
            mock.expect_run()
                .withf(|_, args| args.as_slice() == ["wlan", "disconnect"])
                .times(1)
                .returning(|_, _| CommandOutput::new(false, "no interface"));

            let executor = NetshExecutor::new(Box::new(mock));
            assert!(executor.add_profile(Path::new("C:\\tmp\\Home_profile.xml")).is_ok());
            assert!(executor.delete_profile("Home").is_ok());
            assert!(executor.delete_all_profiles().is_ok());
            assert!(executor.export_profile("Home", Path::new("C:\\Desktop"), true).is_ok());
            let err = executor.disconnect().unwrap_err();
            assert_eq!(err.to_string(), "Disconnect failed: no interface");
        }
    }
}
