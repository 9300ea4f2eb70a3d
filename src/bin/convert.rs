//! Converts `xor_model.json` into the `xor_model.xlite` inference file.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use xor_lite::xor::{self, LITE_MODEL_PATH, MODEL_PATH};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    xor::convert_file(MODEL_PATH, LITE_MODEL_PATH)
        .with_context(|| format!("failed to convert {MODEL_PATH} into {LITE_MODEL_PATH}"))?;
    Ok(())
}
