// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn defaults_apply_when_unset() {
    std::env::remove_var("CONVOY_KUBECTL_TIMEOUT_MS");
    std::env::remove_var("CONVOY_QUEUE_CONNECT_ATTEMPTS");
    std::env::remove_var("CONVOY_QUEUE_CONNECT_BACKOFF_MS");
    assert_eq!(kubectl_timeout(), Duration::from_secs(30));
    assert_eq!(queue_connect_attempts(), 10);
    assert_eq!(queue_connect_backoff(), Duration::from_secs(10));
}

#[test]
#[serial]
fn overrides_are_read_from_the_environment() {
    std::env::set_var("CONVOY_KUBECTL_TIMEOUT_MS", "1500");
    std::env::set_var("CONVOY_QUEUE_CONNECT_ATTEMPTS", "3");
    std::env::set_var("CONVOY_QUEUE_CONNECT_BACKOFF_MS", "250");
    assert_eq!(kubectl_timeout(), Duration::from_millis(1500));
    assert_eq!(queue_connect_attempts(), 3);
    assert_eq!(queue_connect_backoff(), Duration::from_millis(250));
    std::env::remove_var("CONVOY_KUBECTL_TIMEOUT_MS");
    std::env::remove_var("CONVOY_QUEUE_CONNECT_ATTEMPTS");
    std::env::remove_var("CONVOY_QUEUE_CONNECT_BACKOFF_MS");
}

#[test]
#[serial]
fn zero_attempts_falls_back_to_default() {
    std::env::set_var("CONVOY_QUEUE_CONNECT_ATTEMPTS", "0");
    assert_eq!(queue_connect_attempts(), 10);
    std::env::remove_var("CONVOY_QUEUE_CONNECT_ATTEMPTS");
}
