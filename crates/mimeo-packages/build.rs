//! Build script for mimeo-packages.
//!
//! Embeds every descriptor under `packages/` into the crate as a
//! `(name, contents)` table.

use std::env;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

/// Maximum allowed size for one bundled package (8 MB)
const MAX_PACKAGE_SIZE: u64 = 8 * 1024 * 1024;

const PACKAGE_EXTENSIONS: &[&str] = &["xml", "types", "globs2"];

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let packages_dir = Path::new(&manifest_dir).join("packages");
    println!("cargo:rerun-if-changed={}", packages_dir.display());

    let mut packages: Vec<(String, String)> = WalkDir::new(&packages_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .map(|entry| entry.unwrap_or_else(|e| panic!("Failed to read packages dir: {}", e)))
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| PACKAGE_EXTENSIONS.contains(&e))
        })
        .map(|entry| {
            let path = entry.path();
            println!("cargo:rerun-if-changed={}", path.display());
            let size = entry
                .metadata()
                .unwrap_or_else(|e| panic!("Failed to get metadata for {}: {}", path.display(), e))
                .len();
            if size > MAX_PACKAGE_SIZE {
                panic!(
                    "package {} is too large ({} bytes, max {} bytes)",
                    path.display(),
                    size,
                    MAX_PACKAGE_SIZE
                );
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || ".-_".contains(c)) {
                panic!("package file name {:?} must be ASCII alphanumeric, '.', '-', or '_'", name);
            }
            let abs = fs::canonicalize(path)
                .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", path.display(), e));
            (name, abs.display().to_string())
        })
        .collect();
    packages.sort();

    if packages.is_empty() {
        panic!("no descriptor packages found in {}", packages_dir.display());
    }

    let escape_str = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");

    let mut generated_code = String::new();
    generated_code.push_str("// Auto-generated from packages/ by build.rs\n");
    generated_code.push_str("// Do not edit manually!\n\n");
    generated_code.push_str("/// Bundled packages as (file name, contents) tuples, sorted by name.\n");
    generated_code.push_str("pub const BUNDLED: &[(&str, &str)] = &[\n");
    for (name, path) in &packages {
        generated_code.push_str(&format!(
            "    (\"{}\", include_str!(\"{}\")),\n",
            escape_str(name),
            escape_str(path)
        ));
    }
    generated_code.push_str("];\n");

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("packages_data.rs");
    fs::write(&dest_path, generated_code).unwrap_or_else(|e| {
        panic!(
            "Failed to write generated code to {}: {}",
            dest_path.display(),
            e
        )
    });
}
