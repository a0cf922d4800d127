use std::env;
use std::path::PathBuf;

fn main() {
    let crate_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let output_dir = PathBuf::from(&crate_dir).join("include");

    // Create include directory if it doesn't exist
    std::fs::create_dir_all(&output_dir).expect("Unable to create include directory");

    // Generate the header file using cbindgen.toml config
    match cbindgen::generate(&crate_dir) {
        Ok(bindings) => {
            bindings.write_to_file(output_dir.join("bufreg.h"));
        }
        // Keep the crate buildable while the header cannot be produced
        // (e.g. a half-edited source tree); the previous header stays in place.
        Err(e) => println!("cargo:warning=Unable to generate bindings: {}", e),
    }

    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/api.rs");
    println!("cargo:rerun-if-changed=src/types.rs");
    println!("cargo:rerun-if-changed=src/chunk.rs");
    println!("cargo:rerun-if-changed=src/memory.rs");
    println!("cargo:rerun-if-changed=cbindgen.toml");
}
