// Build script for the optional `bundled` feature.
//
// With `bundled` on, the platform pdfium library named by PDFIUM_BUNDLE_LIB is
// copied into OUT_DIR and a generated `bundled.rs` embeds it with
// `include_bytes!`. Without the feature this script does nothing.

use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=PDFIUM_BUNDLE_LIB");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_BUNDLED");

    if std::env::var_os("CARGO_FEATURE_BUNDLED").is_none() {
        return;
    }

    let lib_src = match std::env::var("PDFIUM_BUNDLE_LIB") {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => panic!(
            "pdfium-auto: the `bundled` feature needs PDFIUM_BUNDLE_LIB set to the \
             platform pdfium library (libpdfium.so, libpdfium.dylib or pdfium.dll). \
             Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases"
        ),
    };
    if !lib_src.is_file() {
        panic!(
            "pdfium-auto: PDFIUM_BUNDLE_LIB is not a file: {}",
            lib_src.display()
        );
    }

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let lib_dest = out_dir.join("bundled_pdfium_lib");
    std::fs::copy(&lib_src, &lib_dest).unwrap_or_else(|e| {
        panic!(
            "pdfium-auto: copying {} to {} failed: {e}",
            lib_src.display(),
            lib_dest.display()
        )
    });

    // include_bytes! needs a literal path, so the invocation lives in a
    // generated file pulled in with include!().
    let bundled_rs = out_dir.join("bundled.rs");
    std::fs::write(
        &bundled_rs,
        "/// The pdfium shared library embedded at compile time.\n\
         pub static PDFIUM_BYTES: &[u8] = include_bytes!(\"bundled_pdfium_lib\");\n",
    )
    .unwrap_or_else(|e| panic!("pdfium-auto: writing {} failed: {e}", bundled_rs.display()));

    println!("cargo:rerun-if-changed={}", lib_src.display());
}
