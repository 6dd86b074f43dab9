//! Integration tests for the session registry, using fake shells injected
//! through the profile table so no interactive bash is needed.

#![cfg(unix)]

use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use webterm_config::ShellProfile;
use webterm_server::registry::{Forwarded, SessionRegistry};

/// A "shell" that just echoes stdin back on stdout.
fn cat_profile() -> ShellProfile {
    ShellProfile {
        program: "cat".to_string(),
        args: vec![],
        env: vec![],
    }
}

/// Prints a PID-derived banner, then echoes. `exec` keeps the banner PID and
/// the running process the same so the kill sentinel is observable.
fn banner_profile() -> ShellProfile {
    ShellProfile {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "echo started-$$; exec cat".to_string()],
        env: vec![],
    }
}

/// Accumulate output chunks until `needle` appears (or panic after 5s).
async fn collect_until(output: &mut UnboundedReceiver<String>, needle: &str) -> String {
    let mut acc = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !acc.contains(needle) {
            match output.recv().await {
                Some(chunk) => acc.push_str(&chunk),
                None => break,
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}, got {acc:?}"));
    assert!(acc.contains(needle), "expected {needle:?} in {acc:?}");
    acc
}

fn banner_pid(output: &str) -> &str {
    let start = output.find("started-").expect("banner present") + "started-".len();
    let rest = &output[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    &rest[..end]
}

#[tokio::test]
async fn test_echo_round_trip() {
    let registry = SessionRegistry::new(cat_profile(), 5000);
    let mut handle = registry.attach("echo", None).unwrap();

    assert_eq!(registry.forward("echo", "hello\n").await, Forwarded::Written);
    collect_until(&mut handle.output, "hello").await;
}

#[tokio::test]
async fn test_replay_is_complete_and_ordered() {
    let registry = SessionRegistry::new(cat_profile(), 5000);
    let mut first = registry.attach("replay", None).unwrap();

    for line in ["one\n", "two\n", "three\n"] {
        registry.forward("replay", line).await;
    }
    collect_until(&mut first.output, "three").await;

    // A fresh socket sees the whole history, in emission order, before any
    // newly produced chunk.
    let mut second = registry.attach("replay", None).unwrap();
    let replay = collect_until(&mut second.output, "three").await;
    let one = replay.find("one").unwrap();
    let two = replay.find("two").unwrap();
    let three = replay.find("three").unwrap();
    assert!(one < two && two < three, "out of order: {replay:?}");

    assert!(!replay.contains("four"));
    registry.forward("replay", "four\n").await;
    collect_until(&mut second.output, "four").await;
}

#[tokio::test]
async fn test_session_survives_full_detach() {
    let registry = SessionRegistry::new(banner_profile(), 5000);
    let mut first = registry.attach("persist", None).unwrap();
    let banner = collect_until(&mut first.output, "started-").await;
    let pid = banner_pid(&banner).to_string();

    registry.detach("persist", first.socket_id);
    assert_eq!(registry.socket_count("persist"), 0);
    assert!(registry.contains("persist"));

    // Re-attach: same process, evidenced by the replayed banner PID and by
    // the shell still answering.
    let mut second = registry.attach("persist", None).unwrap();
    let replay = collect_until(&mut second.output, "started-").await;
    assert_eq!(banner_pid(&replay), pid);
    assert_eq!(replay.matches("started-").count(), 1);

    registry.forward("persist", "ping\n").await;
    collect_until(&mut second.output, "ping").await;
}

#[tokio::test]
async fn test_unattended_session_keeps_accumulating_history() {
    let profile = ShellProfile {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            "echo early; sleep 1; echo late; exec cat".to_string(),
        ],
        env: vec![],
    };
    let registry = SessionRegistry::new(profile, 5000);
    let first = registry.attach("bg", None).unwrap();
    registry.detach("bg", first.socket_id);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let mut second = registry.attach("bg", None).unwrap();
    let replay = collect_until(&mut second.output, "late").await;
    assert!(replay.contains("early"));
}

#[tokio::test]
async fn test_kill_sentinel_destroys_and_respawns() {
    let registry = SessionRegistry::new(banner_profile(), 5000);
    let mut first = registry.attach("kill", None).unwrap();
    let banner = collect_until(&mut first.output, "started-").await;
    let old_pid = banner_pid(&banner).to_string();

    let outcome = registry
        .forward("kill", webterm_protocol::KILL_SESSION)
        .await;
    assert_eq!(outcome, Forwarded::Killed);
    assert!(!registry.contains("kill"));

    // Same id now spawns a fresh shell with an empty history.
    let mut second = registry.attach("kill", None).unwrap();
    let fresh = collect_until(&mut second.output, "started-").await;
    assert_ne!(banner_pid(&fresh), old_pid);
    assert_eq!(fresh.matches("started-").count(), 1);
}

#[tokio::test]
async fn test_spawn_failure_registers_nothing() {
    let profile = ShellProfile {
        program: "/nonexistent/definitely-missing-shell".to_string(),
        args: vec![],
        env: vec![],
    };
    let registry = SessionRegistry::new(profile, 5000);
    assert!(registry.attach("broken", None).is_err());
    assert!(!registry.contains("broken"));
}

#[tokio::test]
async fn test_stdout_and_stderr_both_reach_history() {
    let profile = ShellProfile {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            "echo from-out; echo from-err >&2; exec cat".to_string(),
        ],
        env: vec![],
    };
    let registry = SessionRegistry::new(profile, 5000);
    let mut handle = registry.attach("streams", None).unwrap();

    // The two streams race; assert presence only, never interleaving order.
    let seen = collect_until(&mut handle.output, "from-out").await;
    if !seen.contains("from-err") {
        collect_until(&mut handle.output, "from-err").await;
    }
}

#[tokio::test]
async fn test_broadcast_reaches_every_attached_socket() {
    let registry = SessionRegistry::new(cat_profile(), 5000);
    let mut a = registry.attach("fanout", None).unwrap();
    let mut b = registry.attach("fanout", None).unwrap();
    assert_eq!(registry.socket_count("fanout"), 2);

    registry.forward("fanout", "shared\n").await;
    collect_until(&mut a.output, "shared").await;
    collect_until(&mut b.output, "shared").await;
}
