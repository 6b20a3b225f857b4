//! Sockets orchestration: all-or-nothing connect, routing and config dumps.

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use common::FakeDaemon;
use tempfile::TempDir;
use vty_core::{Daemon, Sockets, StatusCode, VtyError};

/// One fake daemon per socket, each reporting its own running config.
fn spawn_all(run_dir: &Path) -> Vec<FakeDaemon> {
    Daemon::ALL
        .iter()
        .map(|d| {
            let running = format!("! {} config\nhostname {}\n", d, d);
            FakeDaemon::with_running_config(&run_dir.join(d.socket_name()), &running)
        })
        .collect()
}

#[tokio::test]
async fn test_connect_and_route_per_daemon() {
    let dir = TempDir::new().unwrap();
    let daemons: Vec<FakeDaemon> = Daemon::ALL
        .iter()
        .map(|d| {
            let name = d.name();
            FakeDaemon::spawn(&dir.path().join(d.socket_name()), 4096, move |_| {
                (name.as_bytes().to_vec(), StatusCode::Success)
            })
        })
        .collect();

    let mut sockets = Sockets::new(dir.path().join("frr.conf"), dir.path());
    sockets.connect(None).await.unwrap();
    assert!(sockets.connections().all(|(_, c)| c.is_connected()));

    assert_eq!(sockets.execute_bgp("show bgp summary", None).await.unwrap(), b"bgp");
    assert_eq!(sockets.execute_bfd("show bfd peers", None).await.unwrap(), b"bfd");
    assert_eq!(sockets.execute_mgmt("show mgmt datastore", None).await.unwrap(), b"mgmt");
    assert_eq!(sockets.execute_zebra("show ip route", None).await.unwrap(), b"zebra");

    assert_eq!(daemons[0].commands(), vec!["show bgp summary"]);
    assert_eq!(daemons[1].commands(), vec!["show bfd peers"]);
    assert_eq!(daemons[2].commands(), vec!["show mgmt datastore"]);
    assert_eq!(daemons[3].commands(), vec!["show ip route"]);

    sockets.close().await.unwrap();
    assert!(sockets.connections().all(|(_, c)| !c.is_connected()));
}

#[tokio::test]
async fn test_failed_connect_closes_everything() {
    let dir = TempDir::new().unwrap();
    // Only bgp and mgmt are running.
    let _bgp = FakeDaemon::with_running_config(&dir.path().join("bgpd.vty"), "");
    let _mgmt = FakeDaemon::with_running_config(&dir.path().join("mgmtd.vty"), "");

    let mut sockets = Sockets::new(dir.path().join("frr.conf"), dir.path());
    let err = sockets.connect(None).await.unwrap_err();

    assert!(sockets.connections().all(|(_, c)| !c.is_connected()));

    let VtyError::Joined(joined) = err else {
        panic!("expected joined errors");
    };
    let failed: Vec<String> = joined
        .errors()
        .iter()
        .map(|e| match e {
            VtyError::Dial { path, .. } => path.file_name().unwrap().to_string_lossy().into_owned(),
            other => panic!("unexpected error: {}", other),
        })
        .collect();
    assert_eq!(failed, vec!["bfdd.vty", "zebra.vty"]);
}

#[tokio::test]
async fn test_apply_and_show_helpers() {
    let dir = TempDir::new().unwrap();
    let daemons = spawn_all(dir.path());

    let mut sockets = Sockets::new(dir.path().join("frr.conf"), dir.path());
    sockets.connect(None).await.unwrap();

    sockets.apply_mgmt_config(b"ip prefix-list PL seq 5 permit any\n", None).await.unwrap();
    assert_eq!(
        daemons[2].commands(),
        vec!["enable", "configure", "ip prefix-list PL seq 5 permit any", "exit", "disable"]
    );

    sockets.apply_bgp_config(b"\n\n", None).await.unwrap();
    assert_eq!(daemons[0].commands(), vec!["enable", "configure", "exit", "disable"]);

    let bgp = sockets.show_running_config_bgp(None).await.unwrap();
    assert_eq!(bgp, b"! bgp config\nhostname bgp\n");
    let mgmt = sockets.show_running_config_mgmt(None).await.unwrap();
    assert_eq!(mgmt, b"! mgmt config\nhostname mgmt\n");
}

#[tokio::test]
async fn test_dump_running_config_merges_in_order() {
    let dir = TempDir::new().unwrap();
    let _daemons = spawn_all(dir.path());
    let dst = dir.path().join("frr.conf");

    let mut sockets = Sockets::new(&dst, dir.path());
    sockets.connect(None).await.unwrap();
    sockets.dump_running_config(&dst, 0o640, None).await.unwrap();

    let mut expected = String::new();
    for d in Daemon::ALL {
        let path = dir.path().join(d.socket_name());
        expected.push_str(&format!("! {}\n! {} config\nhostname {}\n", path.display(), d, d));
    }
    assert_eq!(std::fs::read_to_string(&dst).unwrap(), expected);

    let mode = std::fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o640);
    assert!(!dir.path().join("frr.conf.tmp").exists());
}

#[tokio::test]
async fn test_dump_failure_leaves_destination_untouched() {
    let dir = TempDir::new().unwrap();
    let _bgp = FakeDaemon::with_running_config(&dir.path().join("bgpd.vty"), "router bgp 65000\n");
    let _bfd = FakeDaemon::with_running_config(&dir.path().join("bfdd.vty"), "bfd\n");
    let _mgmt = FakeDaemon::spawn(&dir.path().join("mgmtd.vty"), 4096, |cmd| match cmd {
        "do write terminal" => (b"% mgmtd is not ready".to_vec(), StatusCode::ErrNoDaemon),
        _ => (Vec::new(), StatusCode::Success),
    });
    let zebra = FakeDaemon::with_running_config(&dir.path().join("zebra.vty"), "interface lo\n");

    let dst = dir.path().join("frr.conf");
    std::fs::write(&dst, "previous config\n").unwrap();

    let mut sockets = Sockets::new(&dst, dir.path());
    sockets.connect(None).await.unwrap();

    let err = sockets.dump_running_config(&dst, 0o640, None).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::ErrNoDaemon));
    assert_eq!(err.output(), Some(&b"% mgmtd is not ready"[..]));

    assert_eq!(std::fs::read_to_string(&dst).unwrap(), "previous config\n");
    assert!(!dir.path().join("frr.conf.tmp").exists());
    // Zebra is never queried once mgmt fails.
    assert!(zebra.commands().is_empty());
}

#[tokio::test]
async fn test_save_running_config_uses_configured_path() {
    let dir = TempDir::new().unwrap();
    let _daemons = spawn_all(dir.path());

    let config = vty_core::VtyConfig {
        run_dir: dir.path().to_path_buf(),
        config_path: dir.path().join("saved.conf"),
        config_mode: 0o600,
        ..Default::default()
    };
    let mut sockets = Sockets::from_config(&config);
    sockets.connect(None).await.unwrap();
    sockets.save_running_config(None).await.unwrap();

    let saved = std::fs::read_to_string(dir.path().join("saved.conf")).unwrap();
    assert!(saved.starts_with(&format!("! {}\n", dir.path().join("bgpd.vty").display())));
    assert!(saved.ends_with("hostname zebra\n"));
    let mode = std::fs::metadata(dir.path().join("saved.conf")).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
