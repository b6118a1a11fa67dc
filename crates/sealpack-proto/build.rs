use std::io::Result;

fn main() -> Result<()> {
    // Re-run if proto changes
    println!("cargo:rerun-if-changed=sealpack_v1.proto");

    let mut config = prost_build::Config::new();

    // Add serde derives when the serde feature is enabled
    #[cfg(feature = "serde")]
    {
        config.type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]");
    }

    config.compile_protos(&["sealpack_v1.proto"], &["."])?;

    Ok(())
}
