//! Bakes the access point credentials into the image.
//!
//! Values come from the process environment or a `.env` file next to this
//! crate (or any parent directory). Anything unset falls back to the
//! device defaults.

const CREDENTIALS: [(&str, &str); 2] = [
    ("AIRCAST_AP_SSID", "Aircast_CO2_Monitor"),
    ("AIRCAST_AP_PASSWORD", "12345678"),
];

fn main() {
    if let Ok(path) = dotenvy::dotenv() {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    for (key, default) in CREDENTIALS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
        println!("cargo:rustc-env={key}={value}");
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
