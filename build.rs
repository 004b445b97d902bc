//! Build script for proto compilation.
//!
//! The generated protocol types are committed to `src/generated.rs`, so this
//! only does work when the `regenerate-proto` feature is enabled after an edit
//! to `proto/provider.proto`.
//!
//! To regenerate: `cargo build --features regenerate-proto`

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "regenerate-proto")]
    {
        let out_dir = std::path::PathBuf::from("src");
        tonic_prost_build::configure()
            .build_client(false)
            .out_dir(&out_dir)
            .compile_protos(&["proto/provider.proto"], &["proto"])?;

        let generated = out_dir.join("hemmer.provider.v1.rs");
        let target = out_dir.join("generated.rs");
        if generated.exists() {
            std::fs::rename(generated, target)?;
        }
    }

    println!("cargo:rerun-if-changed=proto/provider.proto");

    Ok(())
}
