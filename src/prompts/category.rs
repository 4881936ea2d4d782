// Mental-health topic categories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic picked by the user to bias prompt wording.
///
/// Labels outside the known set are kept verbatim in `Other` so the
/// formatter can still render them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    General,
    Ansiedad,
    Depresion,
    Estres,
    Relaciones,
    Autoestima,
    TecnicasRelajacion,
    Other(String),
}

impl Category {
    /// Known categories in display order
    pub const KNOWN: [Category; 7] = [
        Category::General,
        Category::Ansiedad,
        Category::Depresion,
        Category::Estres,
        Category::Relaciones,
        Category::Autoestima,
        Category::TecnicasRelajacion,
    ];

    /// Parse a label; matching ignores case and surrounding whitespace
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        let lower = trimmed.to_lowercase();
        let known = match lower.as_str() {
            "" | "general" => Some(Category::General),
            "ansiedad" => Some(Category::Ansiedad),
            "depresión" | "depresion" => Some(Category::Depresion),
            "estrés" | "estres" => Some(Category::Estres),
            "relaciones" => Some(Category::Relaciones),
            "autoestima" => Some(Category::Autoestima),
            "técnicas de relajación" | "tecnicas de relajacion" => {
                Some(Category::TecnicasRelajacion)
            }
            _ => None,
        };
        known.unwrap_or_else(|| Category::Other(trimmed.to_string()))
    }

    pub fn label(&self) -> &str {
        match self {
            Category::General => "General",
            Category::Ansiedad => "Ansiedad",
            Category::Depresion => "Depresión",
            Category::Estres => "Estrés",
            Category::Relaciones => "Relaciones",
            Category::Autoestima => "Autoestima",
            Category::TecnicasRelajacion => "Técnicas de relajación",
            Category::Other(label) => label,
        }
    }

    pub fn is_general(&self) -> bool {
        matches!(self, Category::General)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Category::parse(label)
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::parse(&label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.label().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for category in Category::KNOWN {
            assert_eq!(Category::parse(category.label()), category);
        }
    }

    #[test]
    fn test_parse_ignores_case_and_accents_variant() {
        assert_eq!(Category::parse("ESTRÉS"), Category::Estres);
        assert_eq!(Category::parse("estres"), Category::Estres);
        assert_eq!(Category::parse("  ansiedad "), Category::Ansiedad);
        assert_eq!(Category::parse(""), Category::General);
    }

    #[test]
    fn test_unknown_label_is_kept() {
        let category = Category::parse("Duelo");
        assert_eq!(category, Category::Other("Duelo".to_string()));
        assert_eq!(category.label(), "Duelo");
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Category::TecnicasRelajacion).unwrap();
        assert_eq!(json, "\"Técnicas de relajación\"");

        let parsed: Category = serde_json::from_str("\"Depresión\"").unwrap();
        assert_eq!(parsed, Category::Depresion);
    }
}
