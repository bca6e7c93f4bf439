//! UniFFI bindings crate for the mail library
//!
//! This crate wraps the mail crate for UniFFI library mode binding generation.
//! It re-exports the FFI module and UniFFI scaffolding from the mail crate.
//!
//! ## Building for Android
//!
//! 1. Build the library for Android targets:
//!    ```bash
//!    cargo build --release -p xend-mail-ffi --target aarch64-linux-android
//!    cargo build --release -p xend-mail-ffi --target x86_64-linux-android
//!    ```
//!
//! 2. Generate Kotlin bindings:
//!    ```bash
//!    cargo run -p xend-mail-ffi --features bindgen --bin uniffi-bindgen generate \
//!        --library target/aarch64-linux-android/release/libmail_ffi.so \
//!        --language kotlin \
//!        --out-dir generated/kotlin
//!    ```

// Re-export everything from the mail crate's FFI module
pub use mail::ffi::*;

// Re-export the uniffi scaffolding from the mail crate
// This is needed for library mode to work correctly
mail::uniffi_reexport_scaffolding!();
