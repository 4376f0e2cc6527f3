// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logical queue name to physical broker address

/// Where a message for a logical queue actually goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueAddress {
    /// Physical queue on the broker
    pub queue: String,
    /// Multiplexing key within the physical queue
    pub group: Option<String>,
}

impl QueueAddress {
    /// Resolve a logical queue name.
    ///
    /// With multiplexing on, a name containing exactly one `.` splits into a
    /// base queue and a group key, so `workers.italian` becomes queue
    /// `workers` with group `italian`. Any other name is used as-is.
    pub fn parse(name: &str, multiplexed: bool) -> Self {
        if multiplexed {
            let mut parts = name.split('.');
            if let (Some(base), Some(group), None) = (parts.next(), parts.next(), parts.next()) {
                return Self {
                    queue: base.to_string(),
                    group: Some(group.to_string()),
                };
            }
        }
        Self {
            queue: name.to_string(),
            group: None,
        }
    }
}

impl std::fmt::Display for QueueAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}[{}]", self.queue, group),
            None => f.write_str(&self.queue),
        }
    }
}

#[cfg(test)]
#[path = "address_tests.rs"]
mod tests;
