fn main() {
    // The controller core builds without the Tauri shell; only the desktop
    // feature needs the generated context.
    #[cfg(feature = "desktop")]
    {
        tauri_build::build();
    }
}
