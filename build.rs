//! Build script for detecting system dependencies and providing installation guidance.
//!
//! The webcam provider (feature `camera`) links against OpenCV; this script
//! checks for it and prints installation hints when it is missing. The core
//! library and the X11 target need no system libraries.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if env::var_os("CARGO_FEATURE_CAMERA").is_some() {
        check_pkg_config();
        check_opencv();
    }

    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    let version = ["opencv4", "opencv"].iter().find_map(|package| {
        let output = Command::new("pkg-config").args(["--modversion", package]).output().ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    });

    match version {
        Some(version) => println!("cargo:warning=Found OpenCV version: {version}"),
        None => {
            println!("cargo:warning=OpenCV not found via pkg-config. The camera feature needs it.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev clang libclang-dev");
            println!("cargo:warning=On macOS: brew install opencv");
            println!("cargo:warning=Without a camera, build without the feature and use --replay");
        }
    }
}

fn check_pkg_config() {
    let found = Command::new("pkg-config")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success());

    if !found {
        println!("cargo:warning=pkg-config not found. It is required to locate OpenCV.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
        println!("cargo:warning=On macOS: brew install pkg-config");
    }
}
