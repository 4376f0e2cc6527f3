// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn credentials_are_applied_to_the_uri() {
    let settings = AmqpSettings {
        address: "amqp://broker.local:5672/%2f".to_string(),
        username: "convoy".to_string(),
        password: "hunter2".to_string(),
    };
    let uri = settings.uri().unwrap();
    assert_eq!(uri.authority.host, "broker.local");
    assert_eq!(uri.authority.port, 5672);
    assert_eq!(uri.authority.userinfo.username, "convoy");
    assert_eq!(uri.authority.userinfo.password, "hunter2");
}

#[test]
fn invalid_address_is_a_connect_error() {
    let settings = AmqpSettings {
        address: "not a uri".to_string(),
        ..Default::default()
    };
    assert!(matches!(settings.uri(), Err(QueueError::Connect(_))));
}

#[test]
fn debug_hides_the_password() {
    let settings = AmqpSettings {
        address: "amqp://localhost".to_string(),
        username: "convoy".to_string(),
        password: "hunter2".to_string(),
    };
    assert!(!format!("{:?}", settings).contains("hunter2"));
}

#[test]
fn messages_are_persistent() {
    let props = message_properties(&QueueAddress::parse("workers", true));
    assert_eq!(props.delivery_mode(), &Some(PERSISTENT));
    assert!(props.headers().is_none());
}

#[test]
fn group_key_travels_as_a_header() {
    let props = message_properties(&QueueAddress::parse("jobs.italian", true));
    let headers = props.headers().as_ref().unwrap();
    let (_, value) = headers
        .inner()
        .iter()
        .find(|(key, _)| key.as_str() == GROUP_HEADER)
        .unwrap();
    assert_eq!(value, &AMQPValue::LongString("italian".to_string().into()));
}
