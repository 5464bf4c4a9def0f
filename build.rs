use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-env-changed=TRAINLOG_VERSION");

    println!("cargo:rustc-env=GIT_VERSION={}", build_version());
}

/// `TRAINLOG_VERSION` wins when set. Otherwise the package version, with the
/// commit appended when built from a checkout.
fn build_version() -> String {
    if let Some(version) = std::env::var("TRAINLOG_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        return version;
    }

    let package = env!("CARGO_PKG_VERSION");
    match git_commit() {
        Some(commit) => format!("{} ({})", package, commit),
        None => package.to_string(),
    }
}

fn git_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let commit = String::from_utf8_lossy(&output.stdout).trim().to_string();

    let dirty = Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=no"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .is_some_and(|o| !o.stdout.is_empty());

    Some(if dirty { format!("{}-dirty", commit) } else { commit })
}
