use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Languages the shared editor recognizes.
///
/// Not every language can be executed: see [`Language::execution_support`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Python,
    Csharp,
    Go,
    Java,
    Sql,
    Markdown,
}

/// What the execution dispatcher can do with a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionSupport {
    /// A sandboxed backend capability exists; run requests are dispatched to it.
    Sandboxed,
    /// The language is in the catalog but its runtime is not provisioned.
    /// Run requests resolve with exit code 1 and an explanatory stderr.
    Unavailable,
    /// Editor-only language with nothing to run against. Run requests resolve
    /// immediately with exit code 0 and an explanatory stdout.
    HighlightOnly,
}

#[derive(Debug, Error)]
#[error("unknown language: {0}")]
pub struct UnknownLanguage(pub String);

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Csharp => "csharp",
            Language::Go => "go",
            Language::Java => "java",
            Language::Sql => "sql",
            Language::Markdown => "markdown",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Javascript => "JavaScript",
            Language::Python => "Python",
            Language::Csharp => "C#",
            Language::Go => "Go",
            Language::Java => "Java",
            Language::Sql => "SQL",
            Language::Markdown => "Markdown",
        }
    }

    pub fn execution_support(&self) -> ExecutionSupport {
        match self {
            Language::Javascript | Language::Python => ExecutionSupport::Sandboxed,
            Language::Csharp | Language::Go | Language::Java => ExecutionSupport::Unavailable,
            Language::Sql | Language::Markdown => ExecutionSupport::HighlightOnly,
        }
    }

    /// The languages offered in the editor's language picker.
    pub fn catalog() -> &'static [LanguageInfo] {
        &CATALOG
    }

    /// Catalog record for this language, if it has one.
    pub fn info(&self) -> Option<&'static LanguageInfo> {
        CATALOG.iter().find(|info| info.id == *self)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "javascript" => Ok(Language::Javascript),
            "python" => Ok(Language::Python),
            "csharp" => Ok(Language::Csharp),
            "go" => Ok(Language::Go),
            "java" => Ok(Language::Java),
            "sql" => Ok(Language::Sql),
            "markdown" => Ok(Language::Markdown),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// Catalog entry describing one language offering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub id: Language,
    pub name: &'static str,
    pub version: &'static str,
    /// Name of the runtime the backend capability wraps (or would wrap).
    pub runtime: &'static str,
    pub file_extension: &'static str,
}

const CATALOG: [LanguageInfo; 5] = [
    LanguageInfo {
        id: Language::Javascript,
        name: "JavaScript",
        version: "ES2022",
        runtime: "Web Worker",
        file_extension: ".js",
    },
    LanguageInfo {
        id: Language::Python,
        name: "Python",
        version: "3.11",
        runtime: "Pyodide WASM",
        file_extension: ".py",
    },
    LanguageInfo {
        id: Language::Csharp,
        name: "C#",
        version: ".NET 8",
        runtime: "Blazor WASM",
        file_extension: ".cs",
    },
    LanguageInfo {
        id: Language::Go,
        name: "Go",
        version: "1.21",
        runtime: "TinyGo WASM",
        file_extension: ".go",
    },
    LanguageInfo {
        id: Language::Java,
        name: "Java",
        version: "11",
        runtime: "CheerpJ WASM",
        file_extension: ".java",
    },
];
