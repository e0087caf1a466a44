use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use notetaker::config::{self, ProviderSettings};
use notetaker::providers::{HuggingFaceZeroShot, OllamaClient};
use notetaker::{PipelineConfig, PipelineOrchestrator};

fn main() -> ExitCode {
    notetaker::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match run(std::env::args_os().nth(1).map(PathBuf::from)) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

/// Read the transcript, build providers from the environment, run once.
fn run(input: Option<PathBuf>) -> Result<String, String> {
    let raw = match &input {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read transcript {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read transcript from stdin: {e}"))?;
            buf
        }
    };

    let settings = ProviderSettings::from_env();
    let pipeline_config = match &settings.pipeline_config_path {
        Some(path) => PipelineConfig::from_json_file(path)
            .map_err(|e| format!("[stage: config] {e}"))?,
        None => PipelineConfig::default(),
    };

    let generator = OllamaClient::new(&settings.ollama_url, &settings.generator_model)
        .map_err(|e| format!("[stage: providers] {e}"))?;
    let classifier = HuggingFaceZeroShot::new(
        &settings.zero_shot_url,
        &settings.zero_shot_model,
        settings.zero_shot_token.clone(),
        config::DEFAULT_CLASSIFIER_TIMEOUT_SECS,
    )
    .map_err(|e| format!("[stage: providers] {e}"))?;

    let pipeline =
        PipelineOrchestrator::new(Box::new(classifier), Box::new(generator), pipeline_config)
            .map_err(|e| format!("[stage: {}] {e}", e.stage()))?;

    let result = pipeline
        .run(&raw)
        .map_err(|e| format!("[stage: {}] {e}", e.stage()))?;

    result
        .to_json_pretty()
        .map_err(|e| format!("[stage: output] Failed to serialize result: {e}"))
}
