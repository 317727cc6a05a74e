fn main() -> Result<(), Box<dyn std::error::Error>> {
    // - auth.proto: Auth (password login -> client certificate) and Protected (mTLS only)
    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/auth.proto"], &["proto/"])?;

    println!("cargo:rerun-if-changed=proto/auth.proto");

    Ok(())
}
