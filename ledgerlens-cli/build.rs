use std::path::Path;
use std::process::Command;

const SHA_ENV: &str = "LEDGERLENS_BUILD_SHA";

fn git(repo_root: &Path, args: &[&str]) -> Option<String> {
    let out = Command::new("git").arg("-C").arg(repo_root).args(args).output().ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed={SHA_ENV}");

    // Release tarballs carry no .git; packagers pass the revision in.
    if let Some(sha) = std::env::var(SHA_ENV).ok().filter(|s| !s.trim().is_empty()) {
        println!("cargo:rustc-env={SHA_ENV}={}", sha.trim());
        return;
    }

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let repo_root = Path::new(&manifest_dir).join("..");
    let git_dir = repo_root.join(".git");
    if git_dir.exists() {
        println!("cargo:rerun-if-changed={}", git_dir.join("HEAD").display());
        println!("cargo:rerun-if-changed={}", git_dir.join("index").display());
    }

    let sha = match git(&repo_root, &["rev-parse", "--short", "HEAD"]).filter(|s| !s.is_empty()) {
        Some(sha) => {
            let dirty = git(&repo_root, &["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|s| !s.is_empty());
            if dirty { format!("{sha}-dirty") } else { sha }
        }
        None => "unknown".to_string(),
    };

    println!("cargo:rustc-env={SHA_ENV}={sha}");
}
