// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bridge::BridgeOps;
use crate::subprocess::SHELL_TIMEOUT;

fn bridge_with_tree() -> FakeBridge {
    let bridge = FakeBridge::new();
    bridge.add_file("/sdcard/DCIM/a.jpg", b"aaaa".to_vec());
    bridge.add_file("/sdcard/DCIM/Camera/b.jpg", b"bbbbbb".to_vec());
    bridge.add_file("/sdcard/Download/c.pdf", b"cc".to_vec());
    bridge
}

#[tokio::test]
async fn find_with_stat_lists_files_and_sizes() {
    let bridge = bridge_with_tree();
    let out = bridge
        .run_shell(
            "S1",
            "find '/sdcard/DCIM' -type f 2>/dev/null | xargs stat -c '%n|%s' 2>/dev/null",
            SHELL_TIMEOUT,
        )
        .await;
    let mut lines: Vec<&str> = out.lines().collect();
    lines.sort_unstable();
    assert_eq!(
        lines,
        vec!["/sdcard/DCIM/Camera/b.jpg|6", "/sdcard/DCIM/a.jpg|4"]
    );
}

#[tokio::test]
async fn find_honors_maxdepth_and_iname() {
    let bridge = bridge_with_tree();
    let out = bridge
        .run_shell(
            "S1",
            "find '/sdcard/DCIM' -maxdepth 1 -type f \\( -iname '*.jpg' \\) 2>/dev/null | xargs stat -c '%n|%s' 2>/dev/null",
            SHELL_TIMEOUT,
        )
        .await;
    assert_eq!(out, "/sdcard/DCIM/a.jpg|4");
}

#[tokio::test]
async fn scan_limit_simulates_buffer_overflow() {
    let bridge = bridge_with_tree();
    bridge.set_scan_line_limit(Some(1));
    let out = bridge
        .run_shell(
            "S1",
            "find '/sdcard/DCIM' -type f 2>/dev/null | xargs stat -c '%n|%s' 2>/dev/null",
            SHELL_TIMEOUT,
        )
        .await;
    assert!(out.is_empty());
    // wc -l is unaffected so the adaptive fallback can detect content
    let count = bridge
        .run_shell(
            "S1",
            "find '/sdcard/DCIM' -maxdepth 1 -type f 2>/dev/null | wc -l",
            SHELL_TIMEOUT,
        )
        .await;
    assert_eq!(count, "1");
}

#[tokio::test]
async fn sha256_matches_real_digest() {
    let bridge = bridge_with_tree();
    let out = bridge
        .run_shell("S1", "sha256sum '/sdcard/DCIM/a.jpg' 2>/dev/null", SHELL_TIMEOUT)
        .await;
    let expected = format!("{:x}", sha2::Sha256::digest(b"aaaa"));
    assert_eq!(out, format!("{}  /sdcard/DCIM/a.jpg", expected));
}

#[tokio::test]
async fn rm_rf_removes_subtrees() {
    let bridge = bridge_with_tree();
    bridge
        .run_shell("S1", "rm -rf '/sdcard/DCIM' 2>/dev/null", SHELL_TIMEOUT)
        .await;
    assert!(bridge.file("/sdcard/DCIM/a.jpg").is_none());
    assert!(bridge.file("/sdcard/Download/c.pdf").is_some());
    assert!(!bridge.dir_exists("/sdcard/DCIM"));
}

#[tokio::test]
async fn probe_chain_reports_existing_dirs() {
    let bridge = bridge_with_tree();
    let cmd = "test -d '/sdcard/DCIM' && echo 'FOUND:dcim:/sdcard/DCIM' ; test -d '/sdcard/Movies' && echo 'FOUND:movies:/sdcard/Movies'";
    let out = bridge.run_shell("S1", cmd, SHELL_TIMEOUT).await;
    assert_eq!(out, "FOUND:dcim:/sdcard/DCIM");
}

#[tokio::test]
async fn packages_and_paths() {
    let bridge = FakeBridge::new();
    bridge.add_package("com.foo", &["/data/app/com.foo/base.apk"]);
    bridge.add_package(
        "com.bar",
        &[
            "/data/app/com.bar/base.apk",
            "/data/app/com.bar/split_config.arm64.apk",
        ],
    );
    let pkgs = bridge.list_packages("S1", true).await;
    assert_eq!(pkgs, vec!["com.bar".to_string(), "com.foo".to_string()]);
    let paths = bridge.apk_paths("S1", "com.bar").await;
    assert_eq!(paths.len(), 2);
}

#[tokio::test]
async fn pull_and_push_roundtrip() {
    let bridge = bridge_with_tree();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("a.jpg");
    assert!(bridge.pull("S1", "/sdcard/DCIM/a.jpg", &local).await);
    assert_eq!(std::fs::read(&local).unwrap(), b"aaaa");

    assert!(bridge.push("S1", &local, "/sdcard/restored/a.jpg").await);
    assert_eq!(bridge.file("/sdcard/restored/a.jpg").unwrap(), b"aaaa");
}

#[tokio::test]
async fn failing_pull_is_injectable() {
    let bridge = bridge_with_tree();
    bridge.fail_pull("/sdcard/DCIM/a.jpg");
    let dir = tempfile::tempdir().unwrap();
    assert!(!bridge.pull("S1", "/sdcard/DCIM/a.jpg", &dir.path().join("a")).await);
}

#[tokio::test]
async fn du_sums_subtree_sizes() {
    let bridge = bridge_with_tree();
    let out = bridge
        .run_shell("S1", "du -sk '/sdcard/DCIM' 2>/dev/null", SHELL_TIMEOUT)
        .await;
    // 10 bytes round up to 1 KB
    assert_eq!(out, "1\t/sdcard/DCIM");
}

#[tokio::test]
async fn partial_hash_covers_head_and_tail() {
    let bridge = FakeBridge::new();
    let mut contents = vec![0u8; 16384];
    contents[0] = 1;
    contents[16383] = 2;
    bridge.add_file("/sdcard/big.bin", contents.clone());

    let cmd = "( dd if='/sdcard/big.bin' bs=4096 count=1 2>/dev/null ; dd if='/sdcard/big.bin' bs=512 skip=24 count=8 2>/dev/null ) | sha256sum 2>/dev/null";
    let out = bridge.run_shell("S1", cmd, SHELL_TIMEOUT).await;

    let mut hasher = sha2::Sha256::new();
    hasher.update(&contents[..4096]);
    hasher.update(&contents[12288..16384]);
    let expected = format!("{:x}  -", hasher.finalize());
    assert_eq!(out, expected);
}
