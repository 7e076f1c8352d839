//! Links that hand a query over to an external search engine.

use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Engine {
    DuckDuckGo,
    Google,
    Yandex,
}

impl FromStr for Engine {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(Engine::DuckDuckGo),
            "google" => Ok(Engine::Google),
            "yandex" => Ok(Engine::Yandex),
            _ => Err(AppError::UnknownEngine(s.to_string())),
        }
    }
}

impl TryFrom<String> for Engine {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Build the engine's result-page URL for `query`.
///
/// Whitespace runs become a single `+`, as a browser form would send them.
pub fn search_url(engine: Engine, query: &str) -> Result<Url> {
    let terms: Vec<&str> = query.split_whitespace().collect();
    if terms.is_empty() {
        return Err(AppError::EmptyQuery);
    }
    // `+` is the form encoding of a space; form_urlencoded does this for us.
    let query = terms.join(" ");

    let url = match engine {
        Engine::DuckDuckGo => Url::parse_with_params(
            "https://duckduckgo.com/",
            &[("q", query.as_str()), ("t", "ffab"), ("ia", "web")],
        )?,
        Engine::Google => Url::parse_with_params("https://www.google.com/search", &[("q", &query)])?,
        Engine::Yandex => Url::parse_with_params("https://yandex.ru/search/", &[("text", &query)])?,
    };
    Ok(url)
}
