// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake bridge: an in-memory Android device for tests.
//!
//! Interprets the exact shell vocabulary the engine emits (`find`, `stat`,
//! `sha256sum`, `dd`, `cmp`, `rm`, `mkdir`, `ls`, `pm`, `du`, `test -d`,
//! `content`), backed by a path → bytes map, so integration tests exercise
//! the real pipelines end to end. Hashes are genuine SHA-256 over the fake
//! contents. Every invocation is recorded for assertions.

use super::{Bridge, BridgeError, BridgeOutput};
use async_trait::async_trait;
use mdt_core::Device;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// One recorded bridge invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub serial: Option<String>,
    pub args: Vec<String>,
}

#[derive(Default)]
struct FakeState {
    devices: Vec<Device>,
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    /// pkg → APK paths (base + splits)
    packages: BTreeMap<String, Vec<String>>,
    /// When set, `pm list packages` returns exactly this list
    package_list_override: Option<Vec<String>>,
    props: BTreeMap<String, String>,
    /// Longest-prefix-match canned shell responses
    shell_overrides: Vec<(String, String)>,
    /// Remote paths whose pull fails
    failing_pulls: BTreeSet<String>,
    /// Simulated stdout overflow: scans yielding more lines return empty
    scan_line_limit: Option<usize>,
    calls: Vec<FakeCall>,
    content_inserts: Vec<String>,
    installed: Vec<Vec<String>>,
}

/// In-memory fake device bridge.
#[derive(Clone, Default)]
pub struct FakeBridge {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    // -- setup ------------------------------------------------------------

    pub fn add_device(&self, device: Device) {
        self.state.lock().devices.push(device);
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        self.state.lock().devices = devices;
    }

    /// Add a remote file; ancestor directories spring into existence.
    pub fn add_file(&self, path: &str, contents: impl Into<Vec<u8>>) {
        let mut state = self.state.lock();
        let mut dir = path;
        while let Some(idx) = dir.rfind('/') {
            if idx == 0 {
                break;
            }
            dir = &dir[..idx];
            state.dirs.insert(dir.to_string());
        }
        state.files.insert(path.to_string(), contents.into());
    }

    pub fn add_dir(&self, path: &str) {
        self.state.lock().dirs.insert(path.to_string());
    }

    /// Register an installed package with its APK paths (contents derived).
    pub fn add_package(&self, package: &str, apk_paths: &[&str]) {
        let mut state = self.state.lock();
        state
            .packages
            .insert(package.to_string(), apk_paths.iter().map(|p| p.to_string()).collect());
        for apk in apk_paths {
            state
                .files
                .insert(apk.to_string(), format!("apk-bytes:{}", apk).into_bytes());
        }
    }

    /// Force `pm list packages` output (orphan-gate tests). `pm path` still
    /// resolves against the registered package map.
    pub fn set_package_list_override(&self, packages: Option<Vec<String>>) {
        self.state.lock().package_list_override = packages;
    }

    pub fn set_prop(&self, key: &str, value: &str) {
        self.state.lock().props.insert(key.to_string(), value.to_string());
    }

    /// Canned response for any shell command starting with `prefix`.
    pub fn add_shell_override(&self, prefix: &str, response: &str) {
        self.state
            .lock()
            .shell_overrides
            .push((prefix.to_string(), response.to_string()));
    }

    pub fn fail_pull(&self, remote: &str) {
        self.state.lock().failing_pulls.insert(remote.to_string());
    }

    pub fn set_scan_line_limit(&self, limit: Option<usize>) {
        self.state.lock().scan_line_limit = limit;
    }

    // -- inspection -------------------------------------------------------

    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().calls.clone()
    }

    pub fn shell_calls(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.args.first().map(String::as_str) == Some("shell"))
            .filter_map(|c| c.args.get(1).cloned())
            .collect()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.state.lock().files.keys().cloned().collect()
    }

    pub fn dir_exists(&self, path: &str) -> bool {
        let state = self.state.lock();
        dir_exists_locked(&state, path)
    }

    pub fn content_inserts(&self) -> Vec<String> {
        self.state.lock().content_inserts.clone()
    }

    /// Arguments of every `install` / `install-multiple` invocation.
    pub fn installed(&self) -> Vec<Vec<String>> {
        self.state.lock().installed.clone()
    }

    // -- shell interpreter ------------------------------------------------

    fn interpret_shell(&self, command: &str) -> String {
        let mut state = self.state.lock();

        if let Some(response) = state
            .shell_overrides
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, response)| response.clone())
        {
            return response;
        }

        // Probe chains: `test -d 'p' && echo 'TAG' [|| echo 'ALT']`
        // segments joined by ';'
        if command.starts_with("test -d") && command.contains("&& echo") {
            return interpret_probe_chain(&state, command);
        }

        if command.starts_with("find ") {
            return interpret_find(&state, command);
        }
        if command.starts_with("( dd if=") || command.starts_with("(dd if=") {
            return interpret_partial_hash(&state, command);
        }
        if command.starts_with("cmp -s <(dd") {
            return interpret_window_compare(&state, command);
        }
        if command.starts_with("cmp -s ") {
            return interpret_full_compare(&state, command);
        }
        if command.starts_with("sha256sum ") {
            return interpret_sha256(&state, command);
        }
        if command.starts_with("stat -c '%n|%s'") {
            return interpret_stat_batch(&state, command);
        }
        if command.starts_with("stat -c '%s'") {
            // tokens: stat, -c, %s, <path>
            let tokens = tokenize(command);
            return tokens
                .get(3)
                .and_then(|p| state.files.get(p))
                .map(|c| c.len().to_string())
                .unwrap_or_default();
        }
        if command.starts_with("mkdir -p") {
            for dir in tokenize(command).into_iter().skip(2) {
                state.dirs.insert(dir);
            }
            return String::new();
        }
        if command.starts_with("rm -f ") {
            for path in tokenize(command).into_iter().skip(2) {
                state.files.remove(&path);
            }
            return String::new();
        }
        if command.starts_with("rm -rf ") {
            for target in tokenize(command).into_iter().skip(2) {
                let prefix = format!("{}/", target);
                state.files.retain(|p, _| p != &target && !p.starts_with(&prefix));
                state.dirs.retain(|d| d != &target && !d.starts_with(&prefix));
            }
            return String::new();
        }
        if command.starts_with("ls -1 ") {
            let tokens = tokenize(command);
            return tokens
                .get(2)
                .map(|root| children_locked(&state, root).join("\n"))
                .unwrap_or_default();
        }
        if command.starts_with("du -sk") {
            return interpret_du(&state, command);
        }
        if command.starts_with("pm list packages") {
            let packages: Vec<String> = match &state.package_list_override {
                Some(list) => list.clone(),
                None => state.packages.keys().cloned().collect(),
            };
            return packages
                .iter()
                .map(|p| format!("package:{}", p))
                .collect::<Vec<_>>()
                .join("\n");
        }
        if command.starts_with("pm path") {
            let tokens = tokenize(command);
            return tokens
                .get(2)
                .and_then(|pkg| state.packages.get(pkg))
                .map(|paths| {
                    paths
                        .iter()
                        .map(|p| format!("package:{}", p))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default();
        }
        if command.starts_with("pm trim-caches") {
            return String::new();
        }
        if command.starts_with("getprop") {
            let key = command.split_whitespace().nth(1).unwrap_or("");
            return state.props.get(key).cloned().unwrap_or_default();
        }
        if command.starts_with("dumpsys battery") {
            return state
                .props
                .get("battery")
                .cloned()
                .unwrap_or_else(|| "  level: 85".to_string());
        }
        if command.starts_with("df ") {
            return state.props.get("df").cloned().unwrap_or_else(|| {
                "Filesystem 1K-blocks Used Available Use% Mounted on\n/data 62914560 31457280 31457280 50% /data".to_string()
            });
        }
        if command.starts_with("content insert") {
            state.content_inserts.push(command.to_string());
            return String::new();
        }
        if command.starts_with("content query") || command.starts_with("am start") {
            // content query responses come from overrides; no default data
            return String::new();
        }

        tracing::debug!(command, "fake bridge: unhandled shell command");
        String::new()
    }
}

#[async_trait]
impl Bridge for FakeBridge {
    async fn run(
        &self,
        serial: Option<&str>,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<BridgeOutput, BridgeError> {
        {
            let mut state = self.state.lock();
            state.calls.push(FakeCall {
                serial: serial.map(str::to_string),
                args: args.iter().map(|a| a.to_string()).collect(),
            });
        }

        let stdout = match args.first().copied() {
            Some("shell") => self.interpret_shell(args.get(1).copied().unwrap_or("")),
            Some("devices") => {
                let state = self.state.lock();
                let mut out = String::from("List of devices attached\n");
                for d in &state.devices {
                    let token = match d.state {
                        mdt_core::DeviceState::Connected => "device",
                        mdt_core::DeviceState::Unauthorized => "unauthorized",
                        mdt_core::DeviceState::Offline => "offline",
                        mdt_core::DeviceState::Recovery => "recovery",
                        mdt_core::DeviceState::Sideload => "sideload",
                        mdt_core::DeviceState::Unknown => "unknown",
                    };
                    out.push_str(&format!(
                        "{} {} model:{} product:{}\n",
                        d.serial,
                        token,
                        d.model.replace(' ', "_"),
                        d.product
                    ));
                }
                out
            }
            Some("install") | Some("install-multiple") => {
                let mut state = self.state.lock();
                state
                    .installed
                    .push(args.iter().map(|a| a.to_string()).collect());
                "Success".to_string()
            }
            Some("backup") => {
                // `backup … -f <file>`: write a plausible archive locally
                if let Some(idx) = args.iter().position(|a| *a == "-f") {
                    if let Some(file) = args.get(idx + 1) {
                        let body = format!("ANDROID BACKUP\n5\n1\nnone\n{}", args.join(" "));
                        if let Some(parent) = Path::new(file).parent() {
                            let _ = std::fs::create_dir_all(parent);
                        }
                        let _ = std::fs::write(file, body);
                    }
                }
                String::new()
            }
            Some("restore") | Some("reboot") | Some("forward") | Some("start-server")
            | Some("kill-server") => String::new(),
            _ => String::new(),
        };

        Ok(BridgeOutput {
            exit_code: 0,
            stdout,
            stderr: String::new(),
        })
    }

    async fn push(&self, serial: &str, local: &Path, remote: &str) -> bool {
        {
            let mut state = self.state.lock();
            state.calls.push(FakeCall {
                serial: Some(serial.to_string()),
                args: vec![
                    "push".to_string(),
                    local.display().to_string(),
                    remote.to_string(),
                ],
            });
        }
        match std::fs::read(local) {
            Ok(bytes) => {
                self.add_file(remote, bytes);
                true
            }
            Err(_) => false,
        }
    }

    async fn pull(&self, serial: &str, remote: &str, local: &Path) -> bool {
        let bytes = {
            let mut state = self.state.lock();
            state.calls.push(FakeCall {
                serial: Some(serial.to_string()),
                args: vec![
                    "pull".to_string(),
                    remote.to_string(),
                    local.display().to_string(),
                ],
            });
            if state.failing_pulls.contains(remote) {
                return false;
            }
            state.files.get(remote).cloned()
        };
        let Some(bytes) = bytes else {
            return false;
        };
        if let Some(parent) = local.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::write(local, bytes).is_ok()
    }

    async fn enumerate(&self) -> Result<Vec<Device>, BridgeError> {
        Ok(self.state.lock().devices.clone())
    }
}

// -- free helpers over locked state -------------------------------------

fn dir_exists_locked(state: &FakeState, path: &str) -> bool {
    if state.dirs.contains(path) {
        return true;
    }
    let prefix = format!("{}/", path);
    state.files.keys().any(|f| f.starts_with(&prefix))
        || state.dirs.iter().any(|d| d.starts_with(&prefix))
}

fn children_locked(state: &FakeState, root: &str) -> Vec<String> {
    let prefix = format!("{}/", root.trim_end_matches('/'));
    let mut names = BTreeSet::new();
    for path in state.files.keys().chain(state.dirs.iter()) {
        if let Some(rest) = path.strip_prefix(&prefix) {
            if let Some(first) = rest.split('/').next() {
                if !first.is_empty() {
                    names.insert(first.to_string());
                }
            }
        }
    }
    names.into_iter().collect()
}

/// Depth of `path` below `root` in components (root itself = 0).
fn depth_below(root: &str, path: &str) -> Option<usize> {
    let root = root.trim_end_matches('/');
    let rest = path.strip_prefix(root)?;
    let rest = rest.strip_prefix('/')?;
    Some(rest.split('/').count())
}

/// Case-insensitive `*`-glob match (the only wildcard the engine emits).
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let name = name.to_lowercase();
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }
    let mut pos = 0;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            if !name.starts_with(part) {
                return false;
            }
            pos = part.len();
        } else if i == parts.len() - 1 {
            return name.len() >= pos && name[pos..].ends_with(part);
        } else {
            match name[pos..].find(part) {
                Some(found) => pos += found + part.len(),
                None => return false,
            }
        }
    }
    // Pattern ended with '*'
    true
}

/// Split a shell command into words, honoring single/double quotes.
fn tokenize(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in command.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                c => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.retain(|t| t != "2>/dev/null");
    tokens
}

fn interpret_probe_chain(state: &FakeState, command: &str) -> String {
    let mut found = Vec::new();
    for segment in command.split(';') {
        let tokens = tokenize(segment.trim());
        if tokens.len() < 3 || tokens[0] != "test" || tokens[1] != "-d" {
            continue;
        }
        let exists = dir_exists_locked(state, &tokens[2]);
        let mut then_tag = None;
        let mut else_tag = None;
        for (i, token) in tokens.iter().enumerate() {
            let next_is_echo = tokens.get(i + 1).map(String::as_str) == Some("echo");
            if token == "&&" && next_is_echo {
                then_tag = tokens.get(i + 2).cloned();
            } else if token == "||" && next_is_echo {
                else_tag = tokens.get(i + 2).cloned();
            }
        }
        if exists {
            if let Some(tag) = then_tag {
                found.push(tag);
            }
        } else if let Some(tag) = else_tag {
            found.push(tag);
        }
    }
    found.join("\n")
}

fn interpret_find(state: &FakeState, command: &str) -> String {
    let tokens = tokenize(command);
    let root = match tokens.get(1) {
        Some(root) => root.clone(),
        None => return String::new(),
    };
    let mut max_depth = usize::MAX;
    let mut min_depth = 0;
    let mut want_dirs = false;
    let mut patterns: Vec<String> = Vec::new();
    let mut idx = 2;
    while idx < tokens.len() {
        match tokens[idx].as_str() {
            "-maxdepth" => {
                max_depth = tokens
                    .get(idx + 1)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(usize::MAX);
                idx += 2;
            }
            "-mindepth" => {
                min_depth = tokens
                    .get(idx + 1)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                idx += 2;
            }
            "-type" => {
                want_dirs = tokens.get(idx + 1).map(String::as_str) == Some("d");
                idx += 2;
            }
            "-iname" => {
                if let Some(pattern) = tokens.get(idx + 1) {
                    patterns.push(pattern.clone());
                }
                idx += 2;
            }
            _ => idx += 1,
        }
    }

    let matches_name = |path: &str| -> bool {
        if patterns.is_empty() {
            return true;
        }
        let name = path.rsplit('/').next().unwrap_or(path);
        patterns.iter().any(|p| glob_match(p, name))
    };

    let mut results: Vec<String> = Vec::new();
    if want_dirs {
        for dir in &state.dirs {
            if let Some(depth) = depth_below(&root, dir) {
                if depth >= min_depth.max(1) && depth <= max_depth && matches_name(dir) {
                    results.push(dir.clone());
                }
            }
        }
    } else {
        for path in state.files.keys() {
            if let Some(depth) = depth_below(&root, path) {
                if depth >= min_depth.max(1) && depth <= max_depth && matches_name(path) {
                    results.push(path.clone());
                }
            }
        }
    }

    let piped_to_stat = command.contains("xargs stat");
    let piped_to_wc = command.contains("wc -l");

    if piped_to_wc {
        return results.len().to_string();
    }
    if piped_to_stat {
        if let Some(limit) = state.scan_line_limit {
            if results.len() > limit {
                // Simulated stdout overflow on oversized trees
                return String::new();
            }
        }
        return results
            .iter()
            .map(|p| {
                let size = state.files.get(p).map(Vec::len).unwrap_or(0);
                format!("{}|{}", p, size)
            })
            .collect::<Vec<_>>()
            .join("\n");
    }
    results.join("\n")
}

fn interpret_sha256(state: &FakeState, command: &str) -> String {
    let tokens = tokenize(command);
    tokens
        .iter()
        .skip(1)
        .filter_map(|path| {
            state.files.get(path).map(|contents| {
                let digest = Sha256::digest(contents);
                format!("{:x}  {}", digest, path)
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn interpret_stat_batch(state: &FakeState, command: &str) -> String {
    // tokens: stat, -c, %n|%s, <paths…>
    let tokens = tokenize(command);
    tokens
        .iter()
        .skip(3)
        .filter_map(|path| {
            state
                .files
                .get(path)
                .map(|contents| format!("{}|{}", path, contents.len()))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn interpret_du(state: &FakeState, command: &str) -> String {
    let tokens = tokenize(command);
    tokens
        .iter()
        .skip(2)
        .map(|dir| {
            let prefix = format!("{}/", dir);
            let bytes: usize = state
                .files
                .iter()
                .filter(|(p, _)| p.as_str() == dir.as_str() || p.starts_with(&prefix))
                .map(|(_, c)| c.len())
                .sum();
            format!("{}\t{}", bytes.div_ceil(1024), dir)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `( dd if='p' bs=H count=1 ; dd if='p' bs=512 skip=S count=C ) | sha256sum`
fn interpret_partial_hash(state: &FakeState, command: &str) -> String {
    let mut segments = Vec::new();
    for part in command.split("dd if=").skip(1) {
        let tokens = tokenize(&format!("dd if={}", part.split(')').next().unwrap_or(part)));
        // tokens: ["dd", "if=<path>"?] — tokenize keeps if='p' as one token
        let mut path = String::new();
        let mut bs = 512usize;
        let mut skip = 0usize;
        let mut count = 1usize;
        for token in &tokens {
            if let Some(value) = token.strip_prefix("if=") {
                path = value.to_string();
            } else if let Some(value) = token.strip_prefix("bs=") {
                bs = value.parse().unwrap_or(512);
            } else if let Some(value) = token.strip_prefix("skip=") {
                skip = value.parse().unwrap_or(0);
            } else if let Some(value) = token.strip_prefix("count=") {
                count = value.parse().unwrap_or(1);
            }
        }
        segments.push((path, bs, skip, count));
    }

    let mut hasher = Sha256::new();
    for (path, bs, skip, count) in segments {
        if let Some(contents) = state.files.get(&path) {
            let start = (bs * skip).min(contents.len());
            let end = (start + bs * count).min(contents.len());
            hasher.update(&contents[start..end]);
        }
    }
    format!("{:x}  -", hasher.finalize())
}

fn interpret_full_compare(state: &FakeState, command: &str) -> String {
    let tokens = tokenize(command);
    let same = match (tokens.get(2), tokens.get(3)) {
        (Some(a), Some(b)) => state.files.get(a) == state.files.get(b),
        _ => false,
    };
    if same { "SAME" } else { "DIFF" }.to_string()
}

/// `cmp -s <(dd if='a' bs=512 skip=K count=1) <(dd if='b' …) && echo …`
fn interpret_window_compare(state: &FakeState, command: &str) -> String {
    let mut windows = Vec::new();
    for part in command.split("dd if=").skip(1) {
        let inner = part.split(')').next().unwrap_or(part);
        let tokens = tokenize(&format!("if={}", inner));
        let mut path = String::new();
        let mut bs = 512usize;
        let mut skip = 0usize;
        let mut count = 1usize;
        for token in &tokens {
            if let Some(value) = token.strip_prefix("if=") {
                path = value.to_string();
            } else if let Some(value) = token.strip_prefix("bs=") {
                bs = value.parse().unwrap_or(512);
            } else if let Some(value) = token.strip_prefix("skip=") {
                skip = value.parse().unwrap_or(0);
            } else if let Some(value) = token.strip_prefix("count=") {
                count = value.parse().unwrap_or(1);
            }
        }
        let window = state.files.get(&path).map(|contents| {
            let start = (bs * skip).min(contents.len());
            let end = (start + bs * count).min(contents.len());
            contents[start..end].to_vec()
        });
        windows.push(window);
    }
    let same = windows.len() == 2 && windows[0].is_some() && windows[0] == windows[1];
    if same { "SAME" } else { "DIFF" }.to_string()
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
