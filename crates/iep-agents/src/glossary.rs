// Embedded per-language glossaries and style guides for the Translator
// (C7), grounded on `translate_content/config.py::get_language_context`.
// Plain `include_str!` rather than `rust_embed`: no crate in the corpus
// reaches for an embedding macro for a handful of static files.

use std::collections::HashMap;

use once_cell::sync::Lazy;

const ES_GLOSSARY: &str = include_str!("../assets/glossaries/es.json");
const VI_GLOSSARY: &str = include_str!("../assets/glossaries/vi.json");
const ZH_GLOSSARY: &str = include_str!("../assets/glossaries/zh.json");

static GLOSSARIES: Lazy<HashMap<&'static str, HashMap<String, String>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("es", serde_json::from_str(ES_GLOSSARY).expect("es glossary is valid json"));
    map.insert("vi", serde_json::from_str(VI_GLOSSARY).expect("vi glossary is valid json"));
    map.insert("zh", serde_json::from_str(ZH_GLOSSARY).expect("zh glossary is valid json"));
    map
});

/// Prose style guide plus the embedded glossary, one string per target
/// language, matching `get_language_context`'s return shape.
pub fn language_context(target_language: &str) -> String {
    match target_language {
        "es" | "spanish" => format!(
            "Use Latin American Spanish. Write at an 8th-grade reading level. \
             Explain technical terms in simple words while preserving their legal/educational meaning. \
             Use the following glossary of English to Spanish translations: {}",
            ES_GLOSSARY
        ),
        "vi" | "vietnamese" => format!(
            "Use standard Vietnamese. Write at an 8th-grade reading level. \
             Explain technical terms in simple words while preserving their legal/educational meaning. \
             Use the following glossary of English to Vietnamese translations: {}",
            VI_GLOSSARY
        ),
        "zh" | "chinese" => format!(
            "Use Simplified Chinese (Mandarin). Write at an 8th-grade reading level. \
             Explain technical terms in simple words while preserving their legal/educational meaning. \
             Use the following glossary of English to Chinese translations: {}",
            ZH_GLOSSARY
        ),
        other => format!(
            "target language {} not supported. Please use one of the following: \"es\", \"vi\", \"zh\"",
            other
        ),
    }
}

/// Direct dictionary lookup, matching `get_iep_terminology`.
pub fn lookup_term(term: &str, target_language: &str) -> String {
    GLOSSARIES
        .get(target_language)
        .and_then(|glossary| glossary.get(&term.to_lowercase()))
        .cloned()
        .unwrap_or_else(|| format!("No translation found for '{}'", term))
}
