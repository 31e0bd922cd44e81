//! Build script for proto compilation.
//!
//! Compiles `proto/provider.proto` into `OUT_DIR`; the crate pulls the
//! generated types in with `tonic::include_proto!`. Requires `protoc`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_client(false)
        .compile_protos(&["proto/provider.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}
