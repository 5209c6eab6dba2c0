use std::process::Command;

/// `git describe` の結果。リポジトリ外や git 無しのビルドでは `None`
fn git_describe() -> Option<String> {
    let out = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let described = String::from_utf8(out.stdout).ok()?;
    let described = described.trim();
    (!described.is_empty()).then(|| described.to_string())
}

fn main() {
    for path in [".git/HEAD", ".git/index"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let version = git_describe().unwrap_or_else(|| format!("v{pkg_version}"));
    println!("cargo:rustc-env=GIT_VERSION={version}");
}
