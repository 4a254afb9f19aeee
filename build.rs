use std::path::Path;
use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn main() {
    // `describe --dirty` marks builds from a modified tree, e.g. "3f2a9c1-dirty".
    let revision = git(&["describe", "--always", "--dirty", "--abbrev=7"])
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=TUBESNAP_GIT_HASH={revision}");

    // Ask git for its directory so worktrees and submodules resolve too.
    let Some(git_dir) = git(&["rev-parse", "--git-dir"]) else {
        return;
    };
    for name in ["HEAD", "index", "packed-refs", "refs"] {
        let path = Path::new(&git_dir).join(name);
        if path.exists() {
            println!("cargo:rerun-if-changed={}", path.display());
        }
    }
}
