// tools/src/main.rs
use anyhow::Result;
use price_oracle_backend::services::model::{weights::initialise, ModelConfig};
use rand::distributions::Uniform;
use rand::Rng;

fn main() -> Result<()> {
    let config = ModelConfig::default();

    // same bound PyTorch uses for freshly constructed LSTM/GRU/Linear layers
    let bound = 1.0 / (config.hidden_size as f32).sqrt();
    let dist = Uniform::new_inclusive(-bound, bound);
    let mut rng = rand::thread_rng();

    let dict = initialise(&config, || rng.sample(dist));
    eprintln!("weightgen: {} tensors, hidden {}", dict.len(), config.hidden_size);

    serde_json::to_writer(std::io::stdout().lock(), &dict)?;
    Ok(())
}


/*
    write an untrained weights artifact for smoke-testing the service

    cargo run -p weightgen --release > hybrid_lstm_gru_model_optimized.json


*/
