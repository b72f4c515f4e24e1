//! Build script for packetgraph.
//!
//! Provides build-time diagnostics and feature-usage reminders for
//! collaborators integrating this crate.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DEBUG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PARKING_LOT");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_TRACY");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_LOG");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_MINIMAL");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_PCAP_CAPTURE");

    let debug_enabled = env::var("CARGO_FEATURE_DEBUG").is_ok();
    let parking_lot_enabled = env::var("CARGO_FEATURE_PARKING_LOT").is_ok();
    let tracy_enabled = env::var("CARGO_FEATURE_TRACY").is_ok();
    let minimal_enabled = env::var("CARGO_FEATURE_MINIMAL").is_ok();
    let pcap_enabled = env::var("CARGO_FEATURE_PCAP_CAPTURE").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // --- Debug features ---
    if debug_enabled {
        emit_info("Debug features enabled");
        emit_note("Debug mode provides:");
        emit_note("  • Frame poisoning (freed frames filled with a poison pattern)");
        emit_note("  • Integrity-assertion panics on sentinel/flag mismatches");

        if is_release {
            emit_warning("'debug' feature enabled in a release build!");
            emit_note("This will cost throughput on the hot dispatch path.");
        }
    } else if !is_release {
        emit_note("Tip: enable 'debug' for frame poisoning and stricter integrity checks:");
        emit_note("  packetgraph = { version = \"0.1\", features = [\"debug\"] }");
    }

    // --- Parking lot ---
    if parking_lot_enabled {
        emit_info("Using parking_lot for the registry and pending-interrupt list mutexes");
    }

    // --- Tracy ---
    if tracy_enabled {
        emit_info("Tracy profiler integration enabled");
        emit_note("Each node dispatch emits a zone named after its path.");
    }

    // --- Minimal mode ---
    if minimal_enabled {
        emit_info("Minimal mode enabled: per-dispatch statistics bookkeeping is skipped");
        if debug_enabled {
            emit_warning("'minimal' and 'debug' are both enabled; debug checks still run.");
        }
    }

    // --- Dispatch-pcap capture ---
    if pcap_enabled {
        emit_info("Dispatch-pcap capture enabled");
        emit_note("Attach with Dispatcher::with_capture(DispatchCapture::create(..)?)");
    }

    if is_release && !parking_lot_enabled {
        emit_note("Tip: consider 'parking_lot' for better mutex performance in release builds:");
        emit_note("  packetgraph = { version = \"0.1\", features = [\"parking_lot\"] }");
    }

    check_target_features();
}

fn emit_info(msg: &str) {
    println!("cargo:warning=[packetgraph] \u{2139}\u{fe0f}  {}", msg);
}

fn emit_note(msg: &str) {
    if msg.is_empty() {
        println!("cargo:warning=[packetgraph]");
    } else {
        println!("cargo:warning=[packetgraph]    {}", msg);
    }
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[packetgraph] \u{26a0}\u{fe0f}  {}", msg);
}

fn check_target_features() {
    let target = env::var("TARGET").unwrap_or_default();

    if target.contains("wasm") {
        emit_warning("WebAssembly target detected");
        emit_note("The process facility spawns OS threads and will not work on wasm32-unknown-unknown.");
    }

    if target.contains("windows") {
        emit_info("Building for Windows");
    } else if target.contains("linux") {
        emit_info("Building for Linux");
    } else if target.contains("darwin") || target.contains("macos") {
        emit_info("Building for macOS");
    }
}
