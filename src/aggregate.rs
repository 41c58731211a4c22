//! Joins the registry against the latest socket scan.

use crate::model::{PortEntry, PortViewRecord};
use crate::scanner::SocketFacts;

/// Produce one record per registry entry, in registry order.
pub fn aggregate(entries: &[PortEntry], facts: &SocketFacts) -> Vec<PortViewRecord> {
    entries
        .iter()
        .map(|entry| match facts.get(&entry.port) {
            Some(fact) => PortViewRecord {
                port: entry.port,
                label: entry.label.clone(),
                is_custom: entry.is_custom,
                in_use: true,
                pid: fact.pid,
                process_name: fact.process_name.clone(),
                protocol: Some(fact.transport),
            },
            None => PortViewRecord {
                port: entry.port,
                label: entry.label.clone(),
                is_custom: entry.is_custom,
                in_use: false,
                pid: 0,
                process_name: String::new(),
                protocol: None,
            },
        })
        .collect()
}

/// Case-insensitive substring match on port, label and process name.
pub fn filter(records: &[PortViewRecord], query: &str) -> Vec<PortViewRecord> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| matches(r, &needle))
        .cloned()
        .collect()
}

fn matches(record: &PortViewRecord, needle: &str) -> bool {
    record.port.to_string().contains(needle)
        || record.label.to_lowercase().contains(needle)
        || record.process_name.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActiveSocketFact, Transport};

    fn entry(port: u16, label: &str) -> PortEntry {
        PortEntry {
            port,
            label: label.to_string(),
            is_custom: false,
        }
    }

    fn facts_with(port: u16, pid: u32, name: &str) -> SocketFacts {
        let mut facts = SocketFacts::new();
        facts.insert(
            port,
            ActiveSocketFact {
                port,
                transport: Transport::Tcp,
                pid,
                process_name: name.to_string(),
            },
        );
        facts
    }

    fn sample() -> Vec<PortViewRecord> {
        let entries = vec![entry(80, "HTTP"), entry(443, "HTTPS"), entry(8080, "Tomcat")];
        aggregate(&entries, &facts_with(443, 10, "nginx"))
    }

    #[test]
    fn aggregate_is_total_and_ordered() {
        let records = sample();
        let ports: Vec<u16> = records.iter().map(|r| r.port).collect();
        assert_eq!(ports, vec![80, 443, 8080]);

        let busy: Vec<&PortViewRecord> = records.iter().filter(|r| r.in_use).collect();
        assert_eq!(busy.len(), 1);
        assert_eq!(busy[0].port, 443);
        assert_eq!(busy[0].pid, 10);
        assert_eq!(busy[0].process_name, "nginx");
        assert_eq!(busy[0].protocol, Some(Transport::Tcp));

        let idle = &records[0];
        assert_eq!(idle.pid, 0);
        assert!(idle.process_name.is_empty());
        assert_eq!(idle.protocol, None);
    }

    #[test]
    fn aggregate_keeps_entries_with_no_sockets() {
        let entries = vec![entry(1, "a"), entry(2, "b")];
        let records = aggregate(&entries, &SocketFacts::new());
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.in_use));
    }

    #[test]
    fn aggregate_ignores_unregistered_sockets() {
        let entries = vec![entry(80, "HTTP")];
        let records = aggregate(&entries, &facts_with(22, 1, "sshd"));
        assert_eq!(records.len(), 1);
        assert!(!records[0].in_use);
    }

    #[test]
    fn empty_query_returns_everything() {
        let records = sample();
        assert_eq!(filter(&records, ""), records);
        assert_eq!(filter(&records, "   "), records);
    }

    #[test]
    fn query_matches_port_label_and_process() {
        let records = sample();
        let by_port: Vec<u16> = filter(&records, "443").iter().map(|r| r.port).collect();
        assert_eq!(by_port, vec![443]);

        let by_label: Vec<u16> = filter(&records, "tomCAT").iter().map(|r| r.port).collect();
        assert_eq!(by_label, vec![8080]);

        let by_process: Vec<u16> = filter(&records, "NGINX").iter().map(|r| r.port).collect();
        assert_eq!(by_process, vec![443]);

        let by_substring: Vec<u16> = filter(&records, "http").iter().map(|r| r.port).collect();
        assert_eq!(by_substring, vec![80, 443]);

        assert!(filter(&records, "postgres").is_empty());
    }

    #[test]
    fn filter_does_not_touch_input() {
        let records = sample();
        let copy = records.clone();
        let _ = filter(&records, "80");
        assert_eq!(records, copy);
    }
}
