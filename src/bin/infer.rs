//! Runs `xor_model.xlite` on the four XOR inputs and prints `a ^ b = n`.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use xor_lite::lite::{Interpreter, LiteModel};
use xor_lite::xor::{LITE_MODEL_PATH, XOR_INPUTS};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let model = LiteModel::from_file(LITE_MODEL_PATH)
        .with_context(|| format!("cannot load {LITE_MODEL_PATH}"))?;
    let mut interpreter = Interpreter::new(model)?;
    interpreter.allocate_tensors();

    let input = interpreter.input_tensor(0)?;
    tracing::debug!(name = %input.name, shape = ?input.shape, dtype = input.dtype.type_name(), "input tensor");

    for x in XOR_INPUTS {
        interpreter.set_input(&[x[0] as f32, x[1] as f32])?;
        interpreter.invoke()?;
        let p = interpreter.output()[0];
        println!("{} ^ {} = {}", x[0], x[1], p.round());
    }
    Ok(())
}
