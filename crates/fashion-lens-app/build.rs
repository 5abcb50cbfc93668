use std::fs;
use std::path::{Path, PathBuf};

fn find_version_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("VERSION"))
        .find(|candidate| candidate.is_file())
}

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let version_path =
        find_version_file(&manifest_dir).expect("VERSION file above the app crate");
    println!("cargo:rerun-if-changed={}", version_path.display());

    let version = fs::read_to_string(&version_path)
        .expect("read VERSION file")
        .trim()
        .to_string();
    let parts: Vec<&str> = version.split('.').collect();
    assert!(
        parts.len() == 3 && parts.iter().all(|part| part.parse::<u64>().is_ok()),
        "VERSION must be MAJOR.MINOR.PATCH, got {version:?}"
    );

    println!("cargo:rustc-env=FASHION_LENS_VERSION={version}");
}
