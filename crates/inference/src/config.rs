use common::{env_nonempty, env_or};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl FromStr for ExecutionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!("unknown execution provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_path: String,
    pub labels_path: Option<String>,
    pub input_size: (u32, u32),
    pub confidence_threshold: f32,
    pub execution_provider: ExecutionProvider,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let model_path =
            env_nonempty("MODEL_PATH").unwrap_or_else(|| "models/detector.onnx".to_string());
        let labels_path = env_nonempty("LABELS_PATH");

        let input_width = env_or("INPUT_WIDTH", preprocess::DEFAULT_INPUT_SIZE.0);
        let input_height = env_or("INPUT_HEIGHT", preprocess::DEFAULT_INPUT_SIZE.1);
        let confidence_threshold = env_or("CONFIDENCE_THRESHOLD", 0.5);
        let execution_provider = env_or("EXECUTION_PROVIDER", ExecutionProvider::Cpu);

        Self {
            model_path,
            labels_path,
            input_size: (input_width, input_height),
            confidence_threshold,
            execution_provider,
        }
    }
}
