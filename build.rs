use std::path::{Path, PathBuf};

const MODEL_ENV: &str = "PETVISION_MODEL";
const DEFAULT_MODEL: &str = "models/cat_person.tflite";

fn main() {
    println!("cargo:rerun-if-env-changed={MODEL_ENV}");
    println!("cargo:rerun-if-changed={DEFAULT_MODEL}");

    // The firmware embeds whatever model is found here. If none is present an
    // empty artifact is embedded and the session reports a malformed model at
    // boot instead of failing the build.
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let target = out_dir.join("model.tflite");
    let source = std::env::var(MODEL_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL));

    if Path::new(&source).is_file() {
        std::fs::copy(&source, &target).expect("copy model artifact");
    } else {
        println!(
            "cargo:warning=model artifact {} not found, embedding an empty model",
            source.display()
        );
        std::fs::write(&target, []).expect("write empty model artifact");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
