// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const SUPPORTED: [&str; 2] = ["pt", "en"];
const DEFAULT_LANG: &str = "pt";

// Idioma negociado pelo Accept-Language (pt ou en)
#[derive(Debug, Clone)]
pub struct Locale(pub String);

impl Locale {
    pub fn from_header(value: Option<&str>) -> Self {
        let lang = value
            .map(accept_language::parse)
            .unwrap_or_default()
            .into_iter()
            // "pt-BR" -> "pt"
            .map(|tag| tag.split('-').next().unwrap_or_default().to_lowercase())
            .find(|lang| SUPPORTED.contains(&lang.as_str()))
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        Locale(lang)
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        Ok(Locale::from_header(header_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_language() {
        assert_eq!(Locale::from_header(Some("pt-BR,pt;q=0.9")).0, "pt");
        assert_eq!(Locale::from_header(Some("fr-FR, en;q=0.5")).0, "en");
        assert_eq!(Locale::from_header(Some("de")).0, "pt");
        assert_eq!(Locale::from_header(None).0, "pt");
    }
}
