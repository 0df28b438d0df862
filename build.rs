use std::env;
use std::path::PathBuf;

// Only the `ffmpeg` feature links native libraries. On Windows, point out
// how ffmpeg-sys-next is going to find them before the link step fails.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    let ffmpeg_enabled = env::var_os("CARGO_FEATURE_FFMPEG").is_some();
    let windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    if !ffmpeg_enabled || !windows || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match vcpkg_ffmpeg_dir() {
        Some(dir) if dir.exists() => {
            warn(&format!(
                "using vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to make discovery explicit",
                dir.display()
            ));
            if env::var_os("VCPKGRS_DYNAMIC").is_none() {
                warn("set VCPKGRS_DYNAMIC=1 when linking a dynamic vcpkg FFmpeg build");
            }
        }
        Some(dir) => warn(&format!(
            "VCPKG_ROOT is set but {} has no FFmpeg install",
            dir.display()
        )),
        None => warn(
            "the `ffmpeg` feature needs FFMPEG_DIR (or VCPKG_ROOT with FFmpeg installed) on Windows",
        ),
    }
}

fn vcpkg_ffmpeg_dir() -> Option<PathBuf> {
    let root = env::var("VCPKG_ROOT").ok()?;
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    Some(PathBuf::from(root).join("installed").join(triplet))
}

fn warn(message: &str) {
    println!("cargo:warning={message}");
}
