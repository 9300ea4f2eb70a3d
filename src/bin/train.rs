//! Trains the 2-8-1 XOR network and writes `xor_model.json`.
//!
//! Run with:
//!   cargo run --bin xor-train --release

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use xor_lite::xor::{self, XorConfig, MODEL_PATH, XOR_INPUTS};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = XorConfig::default();
    let network = xor::train_and_save(&config, MODEL_PATH, &mut rand::thread_rng())
        .with_context(|| format!("failed to train and save {MODEL_PATH}"))?;

    for (input, p) in XOR_INPUTS.iter().zip(xor::predictions(&network)) {
        println!("{:?} -> {:.6}", input, p);
    }
    Ok(())
}
