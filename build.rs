use std::process::Command;

/// Stamps the binary with `git describe` output, or the manifest version
/// outside a git checkout. Used in the User-Agent header.
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-env-changed=KBC_STORAGE_BUILD_VERSION");

    let version = std::env::var("KBC_STORAGE_BUILD_VERSION")
        .ok()
        .or_else(git_version)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=KBC_STORAGE_VERSION={}", version);
}

fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    match described.strip_prefix('v').unwrap_or(described) {
        "" => None,
        version => Some(version.to_string()),
    }
}
