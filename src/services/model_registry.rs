//! Static mapping from (provider, model_version) to upstream model identifiers.
//!
//! Each provider owns its own namespace of version tags. A tag from another
//! provider's namespace does not resolve; there is no fallback model.

use crate::api::models::{ModelEntry, ModelVersion, Provider};
use crate::core::RelayError;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static GEMINI_MODELS: Lazy<HashMap<ModelVersion, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (ModelVersion::Flash, "gemini-2.0-flash"),
        (ModelVersion::Thinking, "gemini-2.0-flash-thinking-exp-01-21"),
    ])
});

static FIREWORKS_MODELS: Lazy<HashMap<ModelVersion, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (ModelVersion::R1, "accounts/fireworks/models/deepseek-r1"),
        (ModelVersion::V3, "accounts/fireworks/models/deepseek-v3"),
    ])
});

/// A resolved upstream target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTarget {
    pub provider: Provider,
    pub model: &'static str,
}

/// Read-only model lookup shared by all requests.
pub struct ModelRegistry;

impl ModelRegistry {
    fn namespace(provider: Provider) -> &'static HashMap<ModelVersion, &'static str> {
        match provider {
            Provider::Gemini => &GEMINI_MODELS,
            Provider::Fireworks => &FIREWORKS_MODELS,
        }
    }

    /// Resolve a version tag within the provider's namespace.
    pub fn resolve(provider: Provider, version: ModelVersion) -> Result<ModelTarget, RelayError> {
        Self::namespace(provider)
            .get(&version)
            .map(|&model| ModelTarget { provider, model })
            .ok_or_else(|| RelayError::ModelNotFound {
                provider,
                model_version: version.to_string(),
            })
    }

    /// All routable pairs, sorted by provider then version tag.
    pub fn entries() -> Vec<ModelEntry> {
        let mut entries: Vec<ModelEntry> = Provider::ALL
            .iter()
            .flat_map(|&provider| {
                Self::namespace(provider)
                    .iter()
                    .map(move |(&model_version, &model)| ModelEntry {
                        provider,
                        model_version,
                        model: model.to_string(),
                    })
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.provider.as_str(), a.model_version.as_str())
                .cmp(&(b.provider.as_str(), b.model_version.as_str()))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALL_VERSIONS: [ModelVersion; 4] = [
        ModelVersion::Flash,
        ModelVersion::Thinking,
        ModelVersion::R1,
        ModelVersion::V3,
    ];

    #[test]
    fn test_resolve_gemini_versions() {
        let target = ModelRegistry::resolve(Provider::Gemini, ModelVersion::Flash).unwrap();
        assert_eq!(target.provider, Provider::Gemini);
        assert_eq!(target.model, "gemini-2.0-flash");

        let target = ModelRegistry::resolve(Provider::Gemini, ModelVersion::Thinking).unwrap();
        assert_eq!(target.model, "gemini-2.0-flash-thinking-exp-01-21");
    }

    #[test]
    fn test_resolve_fireworks_versions() {
        let target = ModelRegistry::resolve(Provider::Fireworks, ModelVersion::R1).unwrap();
        assert_eq!(target.model, "accounts/fireworks/models/deepseek-r1");

        let target = ModelRegistry::resolve(Provider::Fireworks, ModelVersion::V3).unwrap();
        assert_eq!(target.model, "accounts/fireworks/models/deepseek-v3");
    }

    #[test]
    fn test_cross_namespace_versions_are_not_found() {
        assert_matches!(
            ModelRegistry::resolve(Provider::Gemini, ModelVersion::R1),
            Err(RelayError::ModelNotFound { provider: Provider::Gemini, .. })
        );
        assert_matches!(
            ModelRegistry::resolve(Provider::Fireworks, ModelVersion::Flash),
            Err(RelayError::ModelNotFound { provider: Provider::Fireworks, .. })
        );
    }

    #[test]
    fn test_every_pair_resolves_or_is_not_found() {
        let mut resolved = 0;
        for provider in Provider::ALL {
            for version in ALL_VERSIONS {
                match ModelRegistry::resolve(provider, version) {
                    Ok(target) => {
                        assert!(!target.model.is_empty());
                        assert_eq!(target.provider, provider);
                        resolved += 1;
                    }
                    Err(err) => assert_matches!(err, RelayError::ModelNotFound { .. }),
                }
            }
        }
        assert_eq!(resolved, 4);
    }

    #[test]
    fn test_entries_lists_all_pairs() {
        let entries = ModelRegistry::entries();
        let pairs: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.provider.as_str(), e.model_version.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("fireworks", "r1"),
                ("fireworks", "v3"),
                ("gemini", "flash"),
                ("gemini", "thinking"),
            ]
        );
    }
}
