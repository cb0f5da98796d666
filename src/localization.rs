//! # Localization Module
//!
//! Fluent based message catalogue. Resources are compiled into the binary and
//! one bundle is built per supported language; lookups for unsupported
//! languages fall back to English.

use anyhow::{Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;
use unic_langid::LanguageIdentifier;

const DEFAULT_LANGUAGE: &str = "en";

const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("fr", include_str!("../locales/fr/main.ftl")),
];

/// Localization manager holding one bundle per supported language
///
/// Bundles use the thread-safe memoizer so the manager can live in a static.
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Build bundles for every embedded resource
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for (code, source) in RESOURCES {
            bundles.insert(code.to_string(), Self::create_bundle(code, source)?);
        }
        Ok(Self { bundles })
    }

    fn create_bundle(code: &str, source: &str) -> Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = code
            .parse()
            .with_context(|| format!("Invalid locale identifier: {code}"))?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Telegram renders the Unicode isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("Failed to parse {code} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("Duplicate messages in {code} resource: {errors:?}"))?;
        Ok(bundle)
    }

    pub fn is_language_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Render `key` in `language`, falling back to English
    pub fn get_message_in_language(&self, key: &str, language: &str, args: Option<&HashMap<&str, &str>>) -> String {
        let bundle = match self.bundles.get(language).or_else(|| self.bundles.get(DEFAULT_LANGUAGE)) {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let Some(pattern) = bundle.get_message(key).and_then(|msg| msg.value()) else {
            return format!("Missing translation: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            warn!(key, language, errors = ?errors, "Fluent formatting errors");
        }
        value.into_owned()
    }
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_none() {
        let manager = LocalizationManager::new()?;
        // Another thread may have won the race; either instance is identical
        let _ = LOCALIZATION_MANAGER.set(manager);
    }
    Ok(())
}

/// Global localization manager, built on first use when not initialized
pub fn get_localization_manager() -> Option<&'static LocalizationManager> {
    if LOCALIZATION_MANAGER.get().is_none() {
        if let Err(e) = init_localization() {
            warn!(error = %e, "Localization unavailable");
        }
    }
    LOCALIZATION_MANAGER.get()
}

/// Map a Telegram language code to a supported language
pub fn detect_language(language_code: Option<&str>) -> String {
    let Some(code) = language_code else {
        return DEFAULT_LANGUAGE.to_string();
    };
    let primary = code.split(['-', '_']).next().unwrap_or_default().to_lowercase();
    if RESOURCES.iter().any(|(supported, _)| *supported == primary) {
        primary
    } else {
        DEFAULT_LANGUAGE.to_string()
    }
}

/// Localized message without arguments
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    t_args_lang(key, &[], language_code)
}

/// Localized message with arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let language = detect_language(language_code);
    let Some(manager) = get_localization_manager() else {
        return format!("Missing translation: {key}");
    };
    if args.is_empty() {
        return manager.get_message_in_language(key, &language, None);
    }
    let args: HashMap<&str, &str> = args.iter().copied().collect();
    manager.get_message_in_language(key, &language, Some(&args))
}
