//! Identifier generation.
//!
//! Collisions are not guarded against; at `max_sessions` scale the
//! probability is negligible.

use rand::Rng;

fn random_hex(nibbles: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..nibbles)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap())
        .collect()
}

/// `sess_` + 12 random hex nibbles.
pub fn generate_session_id() -> String {
    format!("sess_{}", random_hex(12))
}

/// `run_` + UTC timestamp `YYYYMMDDTHHMMSSZ` + `_` + 4 random hex nibbles.
pub fn generate_run_id() -> String {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    format!("run_{}_{}", ts, random_hex(4))
}
