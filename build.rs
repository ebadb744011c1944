/// Expose the compilation target triple as an environment variable at build time.
///
/// The `version` command prints `env!("TARGET")` alongside the crate version
/// so bug reports identify the platform a binary was built for.
fn main() {
    println!(
        "cargo:rustc-env=TARGET={}",
        std::env::var("TARGET").unwrap()
    );
}
