//! Catalog of small instruction-tuned models the harness is usually run
//! against. Quantization and context length are descriptive only; the
//! serving side decides how to honour them.

use serde::Serialize;

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelPreset {
    /// Short key used on the command line (`qwen-0.5b`)
    pub key: &'static str,
    /// Upstream model id the server is expected to serve
    pub upstream: &'static str,
    pub load_in_4bit: bool,
    pub max_length: u32,
}

const fn preset(key: &'static str, upstream: &'static str, load_in_4bit: bool) -> ModelPreset {
    ModelPreset {
        key,
        upstream,
        load_in_4bit,
        max_length: 2048,
    }
}

pub const PRESETS: &[ModelPreset] = &[
    preset("qwen-0.5b", "Qwen/Qwen2.5-0.5B-Instruct", false),
    preset("qwen-1.5b", "Qwen/Qwen2.5-1.5B-Instruct", false),
    preset("qwen-3b", "Qwen/Qwen2.5-3B-Instruct", true),
    preset("llama-1b", "meta-llama/Llama-3.2-1B-Instruct", false),
    preset("llama-3b", "meta-llama/Llama-3.2-3B-Instruct", true),
    preset("phi-3.5", "microsoft/Phi-3.5-mini-instruct", true),
    preset("gemma-2b", "google/gemma-2-2b-it", false),
];

pub fn find_preset(key: &str) -> Option<&'static ModelPreset> {
    PRESETS.iter().find(|p| p.key.eq_ignore_ascii_case(key.trim()))
}
