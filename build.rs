use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

fn main() {
    prepare_assets().expect("failed to prepare embedded static assets");

    let assets_dir = Path::new("assets");
    println!("cargo:rerun-if-changed={}", assets_dir.display());

    if assets_dir.is_dir() {
        for entry in WalkDir::new(assets_dir).into_iter().flatten() {
            println!("cargo:rerun-if-changed={}", entry.path().display());
        }
    }
}

fn prepare_assets() -> Result<(), String> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(|err| err.to_string())?);
    let source = Path::new("assets");
    let dest = out_dir.join("assets");

    if dest.exists() {
        fs::remove_dir_all(&dest)
            .map_err(|err| format!("failed to clean {}: {err}", dest.display()))?;
    }

    copy_dir(source, &dest)
}

fn copy_dir(source: &Path, dest: &Path) -> Result<(), String> {
    fs::create_dir_all(dest).map_err(|err| format!("failed to create {}: {err}", dest.display()))?;

    for entry in WalkDir::new(source).into_iter() {
        let entry = entry.map_err(|err| format!("failed to walk {}: {err}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|err| err.to_string())?;
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| format!("failed to create {}: {err}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| {
                format!(
                    "failed to copy {} to {}: {err}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }

    Ok(())
}
