//! Named bundles of generation parameters consumed by the LLM collaborator.
//! Mirrors the shape of the provider-facing `LLMParams` struct from the
//! teacher's LLM-unification layer: a handful of well-known sampling knobs
//! plus an open `extra` bag for engine-specific parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A single named sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SamplingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_multiplier: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Engine-specific overflow (e.g. XTC probability, dynatemp range).
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SamplingParams {
    pub fn with_override(mut self, overrides: &SamplingParams) -> Self {
        if overrides.temperature.is_some() {
            self.temperature = overrides.temperature;
        }
        if overrides.top_p.is_some() {
            self.top_p = overrides.top_p;
        }
        if overrides.top_k.is_some() {
            self.top_k = overrides.top_k;
        }
        if overrides.min_p.is_some() {
            self.min_p = overrides.min_p;
        }
        if overrides.dry_multiplier.is_some() {
            self.dry_multiplier = overrides.dry_multiplier;
        }
        if overrides.frequency_penalty.is_some() {
            self.frequency_penalty = overrides.frequency_penalty;
        }
        if overrides.presence_penalty.is_some() {
            self.presence_penalty = overrides.presence_penalty;
        }
        for (k, v) in &overrides.extra {
            self.extra.insert(k.clone(), v.clone());
        }
        self
    }
}

fn extra(pairs: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// Read-mostly registry of named sampling presets. Immutable after
/// construction; callers request a preset by name or supply overrides.
#[derive(Debug, Clone)]
pub struct SamplingPresetRegistry {
    presets: Arc<HashMap<String, SamplingParams>>,
}

impl SamplingPresetRegistry {
    /// Build the registry with the five specification-default presets.
    pub fn with_defaults() -> Self {
        let mut presets = HashMap::new();

        presets.insert(
            "chat".to_string(),
            SamplingParams {
                temperature: Some(0.7),
                top_p: Some(0.95),
                top_k: Some(40),
                min_p: Some(0.05),
                dry_multiplier: Some(0.7),
                frequency_penalty: Some(0.2),
                presence_penalty: Some(0.1),
                extra: Default::default(),
            },
        );

        presets.insert(
            "storytelling".to_string(),
            SamplingParams {
                temperature: Some(0.9),
                top_p: Some(0.95),
                top_k: Some(50),
                min_p: Some(0.05),
                dry_multiplier: Some(0.8),
                frequency_penalty: None,
                presence_penalty: None,
                extra: extra(&[
                    ("xtc".into(), serde_json::json!(0.1)),
                    ("dynatemp".into(), serde_json::json!(0.15)),
                ]),
            },
        );

        presets.insert(
            "creative".to_string(),
            SamplingParams {
                temperature: Some(1.0),
                top_p: Some(0.95),
                top_k: None,
                min_p: None,
                dry_multiplier: Some(0.9),
                frequency_penalty: None,
                presence_penalty: None,
                extra: extra(&[
                    ("xtc".into(), serde_json::json!(0.15)),
                    ("dynatemp".into(), serde_json::json!(0.2)),
                ]),
            },
        );

        presets.insert(
            "assistant".to_string(),
            SamplingParams {
                temperature: Some(0.3),
                top_p: Some(0.9),
                top_k: Some(40),
                min_p: Some(0.1),
                dry_multiplier: Some(0.0),
                frequency_penalty: Some(0.1),
                presence_penalty: None,
                extra: Default::default(),
            },
        );

        presets.insert(
            "factual".to_string(),
            SamplingParams {
                temperature: Some(0.2),
                top_p: Some(0.85),
                top_k: Some(30),
                min_p: Some(0.15),
                dry_multiplier: Some(0.0),
                frequency_penalty: None,
                presence_penalty: None,
                extra: Default::default(),
            },
        );

        Self {
            presets: Arc::new(presets),
        }
    }

    /// Resolve a preset by name, applying an optional overlay of overrides.
    pub fn resolve(&self, name: &str, overrides: Option<&SamplingParams>) -> Option<SamplingParams> {
        let base = self.presets.get(name)?.clone();
        Some(match overrides {
            Some(o) => base.with_override(o),
            None => base,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for SamplingPresetRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
