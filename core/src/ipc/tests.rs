//! Unit tests for IPC parsing and command handling.

use std::sync::Arc;

use super::*;
use crate::storage::{MemoryStore, ProfileConfig};
use crate::system::FixedFacts;

fn context(root: &Path, facts: FixedFacts) -> IpcContext<MemoryStore, FixedFacts> {
    let store = MemoryStore::with_record("pack", ProfileConfig::default());
    IpcContext::new(
        root.to_path_buf(),
        MemoryOverrideManager::new(store, facts, Arc::new(())),
    )
}

const HOST_64: FixedFacts = FixedFacts {
    total_mb: 16384,
    is_64bit: true,
};

#[test]
fn parse_message_valid_ping() {
    let raw = r#"{"id":"abc-123","name":"Ping"}"#;
    let env = parse_message(raw).expect("valid");
    assert_eq!(env.id, "abc-123");
    assert!(matches!(env.command, Command::Ping));
}

#[test]
fn parse_message_camel_case_args() {
    let raw = r#"{"id":"1","name":"SetOverrideEnabled","profileId":"pack","enabled":true,"defaultValue":2048}"#;
    let env = parse_message(raw).expect("valid");
    match env.command {
        Command::SetOverrideEnabled {
            profile_id,
            enabled,
            default_value,
        } => {
            assert_eq!(profile_id, "pack");
            assert!(enabled);
            assert_eq!(default_value, Some(2048));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn parse_message_invalid_returns_none() {
    assert!(parse_message("").is_none());
    assert!(parse_message("{}").is_none());
    assert!(parse_message("not json").is_none());
    assert!(parse_message(r#"{"id":"1","name":"SetMemoryValue","profileId":"p"}"#).is_none());
    assert!(parse_message(r#"{"id":"1","name":"SetMemoryValue","profileId":"p","value":-5}"#).is_none());
}

#[test]
fn is_blocking_command_identifies_blocking_commands() {
    assert!(is_blocking_command(&Command::GetMemoryBounds));
    assert!(is_blocking_command(&Command::SetMemoryValue {
        profile_id: "p".to_string(),
        value: 2048
    }));
    assert!(is_blocking_command(&Command::SelectJava {
        path: "java".to_string()
    }));
    assert!(!is_blocking_command(&Command::Ping));
    assert!(!is_blocking_command(&Command::GetVersion));
    assert!(!is_blocking_command(&Command::InvalidateProfile { profile_id: None }));
}

#[test]
fn memory_bounds_payload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(
        dir.path(),
        FixedFacts {
            total_mb: 8192,
            is_64bit: true,
        },
    );
    let v = handle_command(&ctx, &Command::GetMemoryBounds).expect("bounds");
    assert_eq!(
        v,
        serde_json::json!({
            "min": 1024,
            "max": 8192,
            "step": 512,
            "marks": [2048, 4096, 8192],
            "positions": [1024, 1536, 2048, 2560, 3072, 3584, 4096, 4608, 5120, 5632, 6144, 6656, 7168, 7680, 8192],
            "is64Bit": true,
        })
    );
}

#[test]
fn toggle_without_default_uses_settings_memory() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"java":{"memory":3072,"args":""}}"#,
    )
    .expect("settings");
    let ctx = context(dir.path(), HOST_64);
    let cmd = Command::SetOverrideEnabled {
        profile_id: "pack".to_string(),
        enabled: true,
        default_value: None,
    };
    let v = handle_command(&ctx, &cmd).expect("toggle");
    assert_eq!(v, serde_json::json!({ "enabled": true, "overrideMemory": 3072 }));
}

#[test]
fn toggle_off_reports_cleared_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(dir.path(), HOST_64);
    ctx.manager.store().insert(
        "pack",
        ProfileConfig {
            override_memory: Some(6144),
            ..ProfileConfig::default()
        },
    );
    let cmd = Command::SetOverrideEnabled {
        profile_id: "pack".to_string(),
        enabled: false,
        default_value: None,
    };
    let v = handle_command(&ctx, &cmd).expect("toggle");
    assert_eq!(v, serde_json::json!({ "enabled": false, "overrideMemory": null }));
}

#[test]
fn toggle_without_default_pulls_global_into_32bit_range() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(
        dir.path(),
        FixedFacts {
            total_mb: 16384,
            is_64bit: false,
        },
    );
    let cmd = Command::SetOverrideEnabled {
        profile_id: "pack".to_string(),
        enabled: true,
        default_value: None,
    };
    let v = handle_command(&ctx, &cmd).expect("toggle");
    assert_eq!(v["overrideMemory"], serde_json::json!(1536));
}

#[test]
fn set_memory_errors_carry_kind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(dir.path(), HOST_64);

    let err = handle_command(
        &ctx,
        &Command::SetMemoryValue {
            profile_id: "pack".to_string(),
            value: 2048,
        },
    )
    .unwrap_err();
    assert_eq!(err.kind, "preconditionViolation");

    let err = handle_command(
        &ctx,
        &Command::SetMemoryValue {
            profile_id: "pack".to_string(),
            value: 512,
        },
    )
    .unwrap_err();
    assert_eq!(err.kind, "outOfRange");

    let err = handle_command(
        &ctx,
        &Command::IsOverrideEnabled {
            profile_id: "missing".to_string(),
        },
    )
    .unwrap_err();
    assert_eq!(err.kind, "configUnavailable");
}

#[test]
fn java_arguments_follow_override() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("settings.json"),
        r#"{"java":{"memory":4096,"args":"-XX:+UseG1GC -Xmx1G"}}"#,
    )
    .expect("settings");
    let ctx = context(dir.path(), HOST_64);
    let get = Command::GetJavaArguments {
        profile_id: "pack".to_string(),
    };

    let v = handle_command(&ctx, &get).expect("args");
    assert_eq!(v["rendered"], serde_json::json!("-Xmx4096m -XX:+UseG1GC"));
    assert_eq!(v["source"], serde_json::json!("global"));

    ctx.manager
        .set_override_enabled("pack", true, 2048)
        .expect("enable");
    let v = handle_command(&ctx, &get).expect("args");
    assert_eq!(v["rendered"], serde_json::json!("-Xmx2048m -XX:+UseG1GC"));
    assert_eq!(v["source"], serde_json::json!("override"));
    assert_eq!(v["withinBounds"], serde_json::json!(true));
}

#[test]
fn java_arguments_flag_override_outside_current_bounds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(
        dir.path(),
        FixedFacts {
            total_mb: 16384,
            is_64bit: false,
        },
    );
    ctx.manager.store().insert(
        "pack",
        ProfileConfig {
            override_memory: Some(8192),
            ..ProfileConfig::default()
        },
    );
    let v = handle_command(
        &ctx,
        &Command::GetJavaArguments {
            profile_id: "pack".to_string(),
        },
    )
    .expect("args");
    assert_eq!(v["memory"], serde_json::json!(8192));
    assert_eq!(v["withinBounds"], serde_json::json!(false));
}

#[test]
fn select_java_persists_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(dir.path(), HOST_64);
    handle_command(
        &ctx,
        &Command::SelectJava {
            path: "/opt/jdk/bin/java".to_string(),
        },
    )
    .expect("select");
    assert_eq!(
        storage::load_settings(dir.path()).java.path,
        Some(PathBuf::from("/opt/jdk/bin/java"))
    );
}

#[test]
fn error_response_serializes_kind_and_message() {
    let resp = IpcResponse::err(
        "7".to_string(),
        ProfileError::OutOfRange {
            value: 512,
            min: 1024,
            max: 1536,
        }
        .into(),
    );
    let v = serde_json::to_value(&resp).expect("json");
    assert_eq!(v["id"], serde_json::json!("7"));
    assert_eq!(v["err"]["kind"], serde_json::json!("outOfRange"));
    assert!(v.get("ok").is_none());
}

#[test]
fn effective_memory_reports_slider_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = context(dir.path(), HOST_64);
    ctx.manager
        .set_override_enabled("pack", true, 3000)
        .expect("enable");
    let v = handle_command(
        &ctx,
        &Command::GetEffectiveMemory {
            profile_id: "pack".to_string(),
        },
    )
    .expect("effective");
    assert_eq!(
        v,
        serde_json::json!({ "memory": 3000, "source": "override", "sliderValue": 3072 })
    );
}
