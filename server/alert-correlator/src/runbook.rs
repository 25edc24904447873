//! Built-in runbooks and keyword matching of alert messages to them.

use serde::Serialize;

/// Symptom categories detected from alert text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
  HighCpu,
  MemoryPressure,
  DiskSpace,
  NetworkConnectivity,
}

impl Symptom {
  const ALL: [Symptom; 4] = [
    Symptom::HighCpu,
    Symptom::MemoryPressure,
    Symptom::DiskSpace,
    Symptom::NetworkConnectivity,
  ];

  fn keywords(self) -> &'static [&'static str] {
    match self {
      Self::HighCpu => &["cpu"],
      Self::MemoryPressure => &["memory", "oom"],
      Self::DiskSpace => &["disk", "space"],
      Self::NetworkConnectivity => &["network", "connectivity"],
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Runbook {
  pub key: &'static str,
  pub symptom: Symptom,
  pub title: &'static str,
  pub symptoms: &'static [&'static str],
  pub steps: &'static [&'static str],
  pub commands: &'static [&'static str],
}

pub static CATALOGUE: [Runbook; 4] = [
  Runbook {
    key: "high_cpu",
    symptom: Symptom::HighCpu,
    title: "High CPU Usage",
    symptoms: &["CPU usage > 80%", "Slow response times"],
    steps: &[
      "Check top processes: top -c",
      "Identify CPU-intensive processes",
      "Check for runaway processes",
      "Review application logs",
      "Consider scaling resources",
    ],
    commands: &["top -c", "ps aux --sort=-%cpu | head -10", "iostat 1 5", "df -h"],
  },
  Runbook {
    key: "memory_pressure",
    symptom: Symptom::MemoryPressure,
    title: "Memory Pressure",
    symptoms: &["Memory usage > 80%", "OOM killer events"],
    steps: &[
      "Check memory usage: free -h",
      "Identify memory-intensive processes",
      "Check for memory leaks",
      "Review swap usage",
      "Consider adding memory",
    ],
    commands: &["free -h", "ps aux --sort=-%mem | head -10", "vmstat 1 5", "cat /proc/meminfo"],
  },
  Runbook {
    key: "disk_space",
    symptom: Symptom::DiskSpace,
    title: "Disk Space Issues",
    symptoms: &["Disk usage > 85%", "Write failures"],
    steps: &[
      "Check disk usage: df -h",
      "Find large files: find / -size +1G",
      "Clear log files if needed",
      "Archive old data",
      "Add storage capacity",
    ],
    commands: &[
      "df -h",
      "du -sh /* | sort -hr | head -10",
      "find /var/log -name '*.log' -size +100M",
      "ls -la /tmp",
    ],
  },
  Runbook {
    key: "network_connectivity",
    symptom: Symptom::NetworkConnectivity,
    title: "Network Connectivity Issues",
    symptoms: &["Packet loss", "High latency", "Connection timeouts"],
    steps: &[
      "Test basic connectivity: ping",
      "Check network interfaces: ip addr",
      "Review firewall rules",
      "Check DNS resolution",
      "Test port connectivity",
    ],
    commands: &[
      "ping -c 4 8.8.8.8",
      "ip addr show",
      "iptables -L",
      "nslookup example.com",
      "nc -vz target-host 80",
    ],
  },
];

/// First action when no runbook matches.
pub const GENERIC_ACTION: &str = "Review the alert timeline on the host and check recent changes";

pub fn get(key: &str) -> Option<&'static Runbook> {
  CATALOGUE.iter().find(|r| r.key == key)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunbookMatch {
  pub runbook: &'static Runbook,
  /// Share of detected symptoms this runbook covers (0..=1).
  pub relevance: f64,
  pub matched: usize,
}

/// One symptom per (message, category) hit, in message order.
pub fn detect_symptoms<'a>(messages: impl IntoIterator<Item = &'a str>) -> Vec<Symptom> {
  let mut found = Vec::new();
  for message in messages {
    let lower = message.to_ascii_lowercase();
    for symptom in Symptom::ALL {
      if symptom.keywords().iter().any(|k| lower.contains(k)) {
        found.push(symptom);
      }
    }
  }
  found
}

/// Runbooks ranked by relevance descending, catalogue order on ties.
pub fn search(symptoms: &[Symptom]) -> Vec<RunbookMatch> {
  if symptoms.is_empty() {
    return Vec::new();
  }
  let mut matches: Vec<RunbookMatch> = CATALOGUE
    .iter()
    .filter_map(|runbook| {
      let matched = symptoms.iter().filter(|s| **s == runbook.symptom).count();
      (matched > 0).then(|| RunbookMatch {
        runbook,
        relevance: matched as f64 / symptoms.len() as f64,
        matched,
      })
    })
    .collect();
  // Stable sort keeps catalogue order for equal relevance.
  matches.sort_by(|a, b| b.matched.cmp(&a.matched));
  matches
}

pub fn recommend<'a>(messages: impl IntoIterator<Item = &'a str>) -> Option<RunbookMatch> {
  search(&detect_symptoms(messages)).into_iter().next()
}

/// Recommended first actions: the best runbook's steps, or a generic triage step.
pub fn first_actions<'a>(messages: impl IntoIterator<Item = &'a str>) -> Vec<String> {
  match recommend(messages) {
    Some(m) => {
      let mut actions = vec![format!("Follow runbook: {}", m.runbook.title)];
      actions.extend(m.runbook.steps.iter().map(|s| s.to_string()));
      actions
    }
    None => vec![GENERIC_ACTION.to_string()],
  }
}
