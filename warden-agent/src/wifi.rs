//! WiFi SSID and signal-strength sampling.
//!
//! The OS offers no portable API for this, so each platform shells out to
//! its native tool (`netsh` / `airport` / `iwgetid`+`iwconfig`) and a pure
//! parser extracts the SSID and a 0-100 signal percentage. The parsers are
//! what the tests exercise; the sampling entry point just wires them to the
//! commands.

use std::process::Command;

/// One WiFi observation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WifiSample {
    pub ssid: Option<String>,
    pub signal_percent: Option<i32>,
}

/// RSSI (dBm, roughly -100..-30) to an approximate percentage.
fn rssi_to_percent(rssi: i32) -> i32 {
    ((rssi + 100) * 100 / 70).clamp(0, 100)
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        None
    }
}

/// Parse `netsh wlan show interfaces` output (Windows).
#[allow(dead_code)]
fn parse_netsh(output: &str) -> WifiSample {
    let mut sample = WifiSample::default();
    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("SSID") && !line.starts_with("BSSID") {
            if let Some(value) = line.split(':').nth(1) {
                let ssid = value.trim();
                if !ssid.is_empty() && !ssid.eq_ignore_ascii_case("not connected") {
                    sample.ssid = Some(ssid.to_string());
                }
            }
        } else if line.starts_with("Signal") {
            if let Some(value) = line.split(':').nth(1) {
                if let Ok(percent) = value.trim().trim_end_matches('%').parse() {
                    sample.signal_percent = Some(percent);
                }
            }
        }
    }
    // Connected with no signal line: assume good signal
    if sample.ssid.is_some() && sample.signal_percent.is_none() {
        sample.signal_percent = Some(100);
    }
    sample
}

/// Parse `airport -I` output (macOS), converting RSSI to a percentage.
#[allow(dead_code)]
fn parse_airport(output: &str) -> WifiSample {
    let mut sample = WifiSample::default();
    let mut rssi = None;
    for line in output.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("SSID:") {
            let ssid = value.trim();
            if !ssid.is_empty() {
                sample.ssid = Some(ssid.to_string());
            }
        } else if let Some(value) = line.strip_prefix("agrCtlRSSI:") {
            rssi = value.trim().parse::<i32>().ok();
        }
    }
    if sample.ssid.is_some() {
        sample.signal_percent = Some(rssi.map_or(100, rssi_to_percent));
    }
    sample
}

/// Parse `iwconfig` output (Linux) for the signal level.
#[allow(dead_code)]
fn parse_iwconfig_signal(output: &str) -> Option<i32> {
    for line in output.lines() {
        if let Some(idx) = line.find("Signal level=") {
            let rest = &line[idx + "Signal level=".len()..];
            let token: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '-')
                .collect();
            if let Ok(value) = token.parse::<i32>() {
                // Negative values are dBm; some drivers report a percentage
                return Some(if value < 0 { rssi_to_percent(value) } else { value.clamp(0, 100) });
            }
        }
    }
    None
}

/// Take one sample from the running host.
pub fn sample() -> WifiSample {
    #[cfg(target_os = "windows")]
    {
        run("netsh", &["wlan", "show", "interfaces"])
            .map(|out| parse_netsh(&out))
            .unwrap_or_default()
    }

    #[cfg(target_os = "macos")]
    {
        run(
            "/System/Library/PrivateFrameworks/Apple80211.framework/Versions/Current/Resources/airport",
            &["-I"],
        )
        .map(|out| parse_airport(&out))
        .unwrap_or_default()
    }

    #[cfg(target_os = "linux")]
    {
        let ssid = run("iwgetid", &["-r"])
            .map(|out| out.trim().to_string())
            .filter(|s| !s.is_empty());
        if ssid.is_none() {
            return WifiSample::default();
        }
        let signal_percent = run("iwconfig", &[]).and_then(|out| parse_iwconfig_signal(&out));
        WifiSample { ssid, signal_percent: signal_percent.or(Some(100)) }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        WifiSample::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSH_CONNECTED: &str = "\
    Name                   : Wi-Fi\n\
    Description            : Intel(R) Wi-Fi 6 AX201\n\
    State                  : connected\n\
    SSID                   : HomeNet\n\
    BSSID                  : aa:bb:cc:dd:ee:ff\n\
    Radio type             : 802.11ax\n\
    Signal                 : 87%\n\
    ";

    const NETSH_DISCONNECTED: &str = "\
    Name                   : Wi-Fi\n\
    State                  : disconnected\n\
    SSID                   : Not connected\n\
    ";

    const AIRPORT_OUTPUT: &str = "\
         agrCtlRSSI: -58\n\
         agrExtRSSI: 0\n\
              SSID: HomeNet\n\
     ";

    const IWCONFIG_OUTPUT: &str = "\
    wlan0     IEEE 802.11  ESSID:\"HomeNet\"\n\
              Link Quality=54/70  Signal level=-56 dBm\n\
    ";

    #[test]
    fn test_parse_netsh_connected() {
        let sample = parse_netsh(NETSH_CONNECTED);
        assert_eq!(sample.ssid.as_deref(), Some("HomeNet"));
        assert_eq!(sample.signal_percent, Some(87));
    }

    #[test]
    fn test_parse_netsh_disconnected() {
        let sample = parse_netsh(NETSH_DISCONNECTED);
        assert_eq!(sample, WifiSample::default());
    }

    #[test]
    fn test_parse_netsh_bssid_not_mistaken_for_ssid() {
        let sample = parse_netsh("    BSSID : aa:bb:cc\n    SSID : Net\n    Signal : 10%\n");
        assert_eq!(sample.ssid.as_deref(), Some("Net"));
    }

    #[test]
    fn test_parse_airport_rssi_conversion() {
        let sample = parse_airport(AIRPORT_OUTPUT);
        assert_eq!(sample.ssid.as_deref(), Some("HomeNet"));
        // (-58 + 100) * 100 / 70 = 60
        assert_eq!(sample.signal_percent, Some(60));
    }

    #[test]
    fn test_parse_iwconfig_signal_dbm() {
        // (-56 + 100) * 100 / 70 = 62
        assert_eq!(parse_iwconfig_signal(IWCONFIG_OUTPUT), Some(62));
    }

    #[test]
    fn test_rssi_to_percent_clamps() {
        assert_eq!(rssi_to_percent(-30), 100);
        assert_eq!(rssi_to_percent(-100), 0);
        assert_eq!(rssi_to_percent(-130), 0);
        assert_eq!(rssi_to_percent(-65), 50);
    }
}
