fn main() {
    if std::env::var_os("CARGO_FEATURE_HARDWARE").is_none() {
        return;
    }

    println!("cargo:rerun-if-changed=src/transport/real/wrapper.h");

    let lib = pkg_config::probe_library("libibverbs")
        .expect("hardware feature requires libibverbs to be discoverable via pkg-config");

    let bindings = bindgen::Builder::default()
        .header("src/transport/real/wrapper.h")
        .clang_args(lib.include_paths.iter().map(|p| format!("-I{}", p.display())))
        .allowlist_function("ibv_.*")
        .allowlist_type("ibv_.*")
        .generate()
        .expect("failed to generate ibverbs bindings");

    let out_path = std::path::PathBuf::from(std::env::var("OUT_DIR").unwrap());
    bindings
        .write_to_file(out_path.join("ibverbs_bindings.rs"))
        .expect("failed to write ibverbs bindings");
}
