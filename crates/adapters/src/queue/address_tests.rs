// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    single_dot = { "workers.italian", "workers", Some("italian") },
    no_dot = { "workers", "workers", None },
    two_dots = { "jobs.italian.extra", "jobs.italian.extra", None },
    empty_group = { "jobs.", "jobs", Some("") },
)]
fn multiplexed_names(name: &str, queue: &str, group: Option<&str>) {
    let address = QueueAddress::parse(name, true);
    assert_eq!(address.queue, queue);
    assert_eq!(address.group.as_deref(), group);
}

#[test]
fn plain_names_are_never_split() {
    let address = QueueAddress::parse("workers.italian", false);
    assert_eq!(address.queue, "workers.italian");
    assert_eq!(address.group, None);
}

#[test]
fn display_shows_the_group() {
    assert_eq!(
        QueueAddress::parse("jobs.italian", true).to_string(),
        "jobs[italian]"
    );
    assert_eq!(QueueAddress::parse("jobs", true).to_string(), "jobs");
}
