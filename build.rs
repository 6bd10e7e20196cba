//! Build script for proto compilation.
//!
//! Compiles `proto/provider.proto` into the gRPC server and message types
//! included by `src/proto.rs`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["proto/provider.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}
