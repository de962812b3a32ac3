use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build with the vendored protoc unless one is provided.
    if env::var_os("PROTOC").is_none() {
        env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]")
        .type_attribute(".", "#[serde(default)]")
        .field_attribute(".", "#[serde(skip_serializing_if = \"crate::proto::is_default\")]")
        .compile_protos(&["proto/matchmaking.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/matchmaking.proto");
    Ok(())
}
