fn main() {
    println!("cargo:rerun-if-env-changed=CORESDK_LIB_DIR");
    println!("cargo:rerun-if-env-changed=CORESDK_LIB_NAME");

    if std::env::var_os("CARGO_FEATURE_VENDOR_SDK").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("CORESDK_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }

    // The Linux package ships the "integrated" build under a different name.
    let lib = std::env::var("CORESDK_LIB_NAME").unwrap_or_else(|_| "ManusSDK".to_string());
    println!("cargo:rustc-link-lib=dylib={}", lib);
}
