//! Text parsers for the socket tools each platform shells out to.
//!
//! These are pure so they can be tested on any host.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{RawListener, Transport};

static NETSTAT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(TCP|UDP)\s+(?:\[[0-9a-f:%.]*\]|[\d.]+|\*):(\d+)\s+\S+\s+LISTENING\s+(\d+)\s*$",
    )
    .expect("netstat pattern compiles")
});

static SS_USERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"users:\(\("([^"]*)",pid=(\d+)"#).expect("ss users pattern compiles")
});

/// Parse Windows `netstat -ano` output. Only `LISTENING` rows are kept.
///
/// ```text
///   TCP    0.0.0.0:3000           0.0.0.0:0              LISTENING       1234
///   TCP    [::]:3000              [::]:0                 LISTENING       1234
/// ```
///
/// PID 0 (System Idle Process) rows are dropped.
pub fn parse_netstat(output: &str) -> Vec<RawListener> {
    let mut rows = Vec::new();
    for line in output.lines() {
        let Some(caps) = NETSTAT_LINE.captures(line) else {
            continue;
        };
        let Some(transport) = Transport::parse(&caps[1]) else {
            continue;
        };
        let (Ok(port), Ok(pid)) = (caps[2].parse::<u16>(), caps[3].parse::<u32>()) else {
            continue;
        };
        if pid == 0 {
            continue;
        }
        rows.push(RawListener {
            transport,
            port,
            pid,
            command: None,
        });
    }
    rows
}

/// Parse Linux `ss -H -l -n -t -u -p` output.
///
/// ```text
/// tcp   LISTEN 0      4096   127.0.0.1:5432   0.0.0.0:*   users:(("postgres",pid=812,fd=6))
/// udp   UNCONN 0      0      0.0.0.0:5353     0.0.0.0:*   users:(("avahi-daemon",pid=600,fd=12))
/// ```
///
/// Rows without a `users:` column (socket owned by another user while not
/// running as root) are still listeners; they come back with pid 0.
pub fn parse_ss(output: &str) -> Vec<RawListener> {
    let mut rows = Vec::new();
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            continue;
        }
        let Some(transport) = Transport::parse(parts[0]) else {
            continue;
        };
        if parts[1] != "LISTEN" && parts[1] != "UNCONN" {
            continue;
        }
        let Some(port) = parse_port_from_address(parts[4]) else {
            continue;
        };
        let process = parts[6..].join(" ");
        let (pid, command) = match SS_USERS.captures(&process) {
            Some(caps) => match caps[2].parse::<u32>() {
                Ok(pid) => (pid, Some(caps[1].to_string())),
                Err(_) => (0, None),
            },
            None => (0, None),
        };
        rows.push(RawListener {
            transport,
            port,
            pid,
            command,
        });
    }
    rows
}

/// Parse macOS `lsof -nP -iTCP -sTCP:LISTEN -FpcnP` field output.
pub fn parse_lsof(output: &str) -> Vec<RawListener> {
    let mut current_pid: Option<u32> = None;
    let mut current_cmd: Option<String> = None;
    let mut current_proto = Transport::Tcp;
    let mut rows = Vec::new();

    for line in output.lines() {
        if line.is_empty() {
            continue;
        }
        let (tag, val) = line.split_at(1);
        match tag {
            "p" => {
                current_pid = val.trim().parse::<u32>().ok();
                current_cmd = None;
            }
            "c" => current_cmd = Some(val.trim().to_string()),
            "f" => current_proto = Transport::Tcp,
            "P" => {
                if let Some(proto) = Transport::parse(val.trim()) {
                    current_proto = proto;
                }
            }
            "n" => {
                let Some(pid) = current_pid else {
                    continue;
                };
                if let Some(port) = parse_port_from_lsof(val.trim()) {
                    rows.push(RawListener {
                        transport: current_proto,
                        port,
                        pid,
                        command: current_cmd.clone(),
                    });
                }
            }
            _ => {}
        }
    }
    rows
}

/// Port from "0.0.0.0:3000", "[::]:3000", "*:68" or "127.0.0.53%lo:53".
pub fn parse_port_from_address(addr: &str) -> Option<u16> {
    if addr.starts_with('[') {
        let bracket_pos = addr.rfind(']')?;
        return addr[bracket_pos + 1..].strip_prefix(':')?.parse().ok();
    }
    addr.rsplit_once(':')?.1.parse().ok()
}

/// Port from an lsof name field. Connected flows ("a->b") are rejected.
pub fn parse_port_from_lsof(name: &str) -> Option<u16> {
    if name.contains("->") {
        return None;
    }
    let (_, port) = name.rsplit_once(':')?;
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    port.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSTAT: &str = "
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1000
  TCP    0.0.0.0:3000           0.0.0.0:0              LISTENING       4321
  TCP    127.0.0.1:3000         127.0.0.1:52011        ESTABLISHED     4321
  TCP    192.168.1.5:52011      140.82.112.4:443       ESTABLISHED     900
  TCP    [::]:3000              [::]:0                 LISTENING       4321
  TCP    [::1]:9000             [::]:0                 LISTENING       77
  UDP    0.0.0.0:5353           *:*                                    1500
";

    #[test]
    fn netstat_keeps_only_listening_rows() {
        let rows = parse_netstat(NETSTAT);
        let ports: Vec<(u16, u32)> = rows.iter().map(|r| (r.port, r.pid)).collect();
        assert_eq!(
            ports,
            vec![(135, 1000), (3000, 4321), (3000, 4321), (9000, 77)]
        );
        assert!(rows.iter().all(|r| r.transport == Transport::Tcp));
    }

    #[test]
    fn ss_keeps_owner_less_listener() {
        let rows = parse_ss("tcp LISTEN 0 4096 127.0.0.1:5432 0.0.0.0:*");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].port, 5432);
        assert_eq!(rows[0].pid, 0);
        assert_eq!(rows[0].command, None);
    }

    #[test]
    fn netstat_drops_idle_process_rows() {
        let rows = parse_netstat("  TCP    0.0.0.0:135    0.0.0.0:0    LISTENING    0");
        assert!(rows.is_empty());
    }

    #[test]
    fn netstat_is_case_insensitive() {
        let rows = parse_netstat("  tcp    0.0.0.0:8080    0.0.0.0:0    listening    12");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].port, 8080);
    }

    #[test]
    fn netstat_ignores_garbage() {
        assert!(parse_netstat("").is_empty());
        assert!(parse_netstat("The requested operation requires elevation.").is_empty());
        assert!(parse_netstat("  TCP  0.0.0.0:99999  0.0.0.0:0  LISTENING  1").is_empty());
    }

    const SS: &str = r#"tcp   LISTEN 0      4096   127.0.0.53%lo:53        0.0.0.0:*    users:(("systemd-resolve",pid=512,fd=14))
tcp   LISTEN 0      128    [::]:22                [::]:*       users:(("sshd",pid=700,fd=4),("sshd",pid=701,fd=4))
tcp   LISTEN 0      511    0.0.0.0:8080           0.0.0.0:*
udp   UNCONN 0      0      *:5353                 *:*          users:(("avahi-daemon",pid=600,fd=12))
tcp   ESTAB  0      0      10.0.0.2:41000         1.1.1.1:443  users:(("curl",pid=900,fd=3))
"#;

    #[test]
    fn ss_parses_listeners_with_and_without_owner() {
        let rows = parse_ss(SS);
        let summary: Vec<(Transport, u16, u32, &str)> = rows
            .iter()
            .map(|r| (r.transport, r.port, r.pid, r.command.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Transport::Tcp, 53, 512, "systemd-resolve"),
                (Transport::Tcp, 22, 700, "sshd"),
                (Transport::Tcp, 8080, 0, ""),
                (Transport::Udp, 5353, 600, "avahi-daemon"),
            ]
        );
    }

    const LSOF: &str = "p4321
cnode
f23
PTCP
n*:3000
f24
PTCP
n[::1]:3000
p88
cpostgres
f7
PTCP
n127.0.0.1:5432
f8
PTCP
n127.0.0.1:5432->127.0.0.1:60000
";

    #[test]
    fn lsof_groups_files_under_process() {
        let rows = parse_lsof(LSOF);
        let summary: Vec<(u16, u32, &str)> = rows
            .iter()
            .map(|r| (r.port, r.pid, r.command.as_deref().unwrap_or("")))
            .collect();
        assert_eq!(
            summary,
            vec![(3000, 4321, "node"), (3000, 4321, "node"), (5432, 88, "postgres")]
        );
    }

    #[test]
    fn parses_addresses() {
        assert_eq!(parse_port_from_address("0.0.0.0:3000"), Some(3000));
        assert_eq!(parse_port_from_address("127.0.0.1:5173"), Some(5173));
        assert_eq!(parse_port_from_address("[::]:8000"), Some(8000));
        assert_eq!(parse_port_from_address("[::1]:9000"), Some(9000));
        assert_eq!(parse_port_from_address("*:68"), Some(68));
        assert_eq!(parse_port_from_address("127.0.0.53%lo:53"), Some(53));
        assert_eq!(parse_port_from_address("0.0.0.0:*"), None);
    }

    #[test]
    fn lsof_names() {
        assert_eq!(parse_port_from_lsof("*:3000"), Some(3000));
        assert_eq!(parse_port_from_lsof("[::1]:8000"), Some(8000));
        assert_eq!(parse_port_from_lsof("127.0.0.1:abcd"), None);
        assert_eq!(parse_port_from_lsof("127.0.0.1->192.168.0.1:1234"), None);
        assert_eq!(parse_port_from_lsof("garbage"), None);
    }
}
