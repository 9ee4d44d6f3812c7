#![cfg(unix)]
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for the `prepare` command on the host filesystem.
//!
//! Every run is confined under a temp dir with `RootedFs`, the same way
//! `preppi prepare --root` confines a mounted image.

mod common;

use std::path::PathBuf;

use common::Workspace;
use preppi_cli::cli::PrepareOpts;
use preppi_cli::commands::prepare;
use preppi_cli::error::{BatchError, ErrorKind};
use preppi_cli::fs::{OsFs, RootedFs};
use preppi_cli::logging::Logger;

fn config(ws: &Workspace) -> String {
    let (uid, gid) = ws.owner();
    format!(
        r#"{{"map": [
            {{"source": "/boot/preppi/hostname", "destination": "/etc/hostname",
              "uid": {uid}, "gid": {gid}, "clobber": true}},
            {{"source": "/boot/preppi/wpa.conf",
              "destination": "/etc/wpa_supplicant/wpa_supplicant.conf",
              "mode": "0600", "dirmode": "0700", "uid": {uid}, "gid": {gid}}}
        ]}}"#
    )
}

fn boot_partition() -> Workspace {
    let ws = Workspace::new();
    ws.write("boot/preppi/preppi.conf", &config(&ws))
        .write("boot/preppi/hostname", "kitchen-pi\n")
        .write("boot/preppi/wpa.conf", "network={ssid=\"home\"}\n")
        .write("etc/hostname", "raspberrypi\n");
    ws
}

fn opts() -> PrepareOpts {
    PrepareOpts {
        config: PathBuf::from("/boot/preppi/preppi.conf"),
        dry_run: false,
        reboot: true,
        reboot_command: "/sbin/reboot".to_string(),
        root: None,
    }
}

fn run(ws: &Workspace, opts: &PrepareOpts, reboots: &mut usize) -> anyhow::Result<usize> {
    let fs = RootedFs::new(OsFs::new(), ws.root());
    prepare::execute(&fs, opts, &Logger::default(), |cmd| {
        assert_eq!(cmd, "/sbin/reboot");
        *reboots += 1;
        Ok(())
    })
}

#[test]
fn converges_then_stays_put() {
    let ws = boot_partition();
    let mut reboots = 0;

    assert_eq!(run(&ws, &opts(), &mut reboots).unwrap(), 2);
    assert_eq!(reboots, 1);
    assert_eq!(ws.read("etc/hostname"), "kitchen-pi\n");
    assert_eq!(
        ws.read("etc/wpa_supplicant/wpa_supplicant.conf"),
        "network={ssid=\"home\"}\n"
    );
    assert_eq!(ws.mode("etc/wpa_supplicant/wpa_supplicant.conf"), 0o600);
    assert_eq!(ws.mode("etc/wpa_supplicant"), 0o700);

    assert_eq!(run(&ws, &opts(), &mut reboots).unwrap(), 0);
    assert_eq!(reboots, 1, "an unchanged system must not reboot");
}

#[test]
fn mode_drift_is_repaired() {
    use std::os::unix::fs::PermissionsExt as _;

    let ws = boot_partition();
    let mut reboots = 0;
    run(&ws, &opts(), &mut reboots).unwrap();

    let hostname = ws.path("etc/hostname");
    std::fs::set_permissions(&hostname, std::fs::Permissions::from_mode(0o666)).unwrap();
    assert_eq!(run(&ws, &opts(), &mut reboots).unwrap(), 1);
    assert_eq!(ws.mode("etc/hostname"), 0o644);
}

#[test]
fn hand_edited_destination_is_protected() {
    let ws = boot_partition();
    let mut reboots = 0;
    run(&ws, &opts(), &mut reboots).unwrap();
    ws.write("etc/wpa_supplicant/wpa_supplicant.conf", "edited on device\n");

    let err = run(&ws, &opts(), &mut reboots).unwrap_err();
    let batch = err.downcast_ref::<BatchError>().unwrap();
    assert_eq!(batch.kind(), ErrorKind::ClobberDenied);
    assert_eq!((batch.applied, batch.index), (0, 1));
    assert_eq!(
        ws.read("etc/wpa_supplicant/wpa_supplicant.conf"),
        "edited on device\n"
    );
    assert_eq!(reboots, 1);
}

#[test]
fn dry_run_leaves_tree_untouched() {
    let ws = boot_partition();
    let mut reboots = 0;
    let opts = PrepareOpts {
        dry_run: true,
        ..opts()
    };

    assert_eq!(run(&ws, &opts, &mut reboots).unwrap(), 0);
    assert_eq!(ws.read("etc/hostname"), "raspberrypi\n");
    assert!(!ws.exists("etc/wpa_supplicant"));
    assert_eq!(reboots, 0);
}

#[test]
fn toml_config_is_accepted() {
    let ws = Workspace::new();
    let (uid, gid) = ws.owner();
    ws.write(
        "boot/preppi/preppi.toml",
        &format!(
            "[[map]]\nsource = \"/boot/preppi/cmdline.txt\"\ndestination = \"/boot/cmdline.txt\"\nmode = \"0644\"\nuid = {uid}\ngid = {gid}\n"
        ),
    )
    .write("boot/preppi/cmdline.txt", "console=serial0,115200\n");
    let opts = PrepareOpts {
        config: PathBuf::from("/boot/preppi/preppi.toml"),
        reboot: false,
        ..opts()
    };

    let mut reboots = 0;
    assert_eq!(run(&ws, &opts, &mut reboots).unwrap(), 1);
    assert_eq!(ws.read("boot/cmdline.txt"), "console=serial0,115200\n");
}

#[test]
fn missing_config_is_a_no_op() {
    let ws = Workspace::new();
    let mut reboots = 0;
    assert_eq!(run(&ws, &opts(), &mut reboots).unwrap(), 0);
    assert_eq!(reboots, 0);
}
