// Build script that tries to generate a C header with `cbindgen`.
// If `cbindgen` is not available, it falls back to copying the
// checked-in `include/tonegen.h` to $OUT_DIR.

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/tonegen.h");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let header_repo = crate_dir.join("include").join("tonegen.h");
    let header_out = out_dir.join("tonegen.h");

    let cbindgen_ok = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if cbindgen_ok {
        let status = Command::new("cbindgen")
            .args(["--crate", "tonegen-ffi", "--lang", "C", "--output"])
            .arg(&header_out)
            .current_dir(&crate_dir)
            .status();
        if matches!(status, Ok(s) if s.success()) {
            println!("cargo:warning=tonegen-ffi: generated header with cbindgen -> {}", header_out.display());
            return;
        }
        println!("cargo:warning=tonegen-ffi: cbindgen failed; using checked-in header");
    }

    fs::copy(&header_repo, &header_out).expect("failed to copy include/tonegen.h to OUT_DIR");
}
