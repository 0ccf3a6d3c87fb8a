// Build script to inject version information from git tags
//
// Falls back to CARGO_PKG_VERSION when git (or a tag) is unavailable, so
// builds from a source tarball still work.

use std::process::Command;

fn main() {
    let version = git_describe().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=REDEPLOY_VERSION={}", version);
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs/tags");
}

fn git_describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    if described.is_empty() {
        return None;
    }

    // Clean tag like "v0.1.0" → "0.1.0"; anything else is appended to the
    // crate version for traceability.
    if let Some(version) = described.strip_prefix('v') {
        if !version.contains('-') {
            return Some(version.to_string());
        }
    }
    Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), described))
}
