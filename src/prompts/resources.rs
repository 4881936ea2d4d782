// Help resources per topic

use serde::Serialize;

use super::category::Category;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: &'static str,
    pub url: &'static str,
}

const GENERAL: &[Resource] = &[
    Resource {
        name: "OMS - Salud Mental",
        url: "https://www.who.int/es/health-topics/mental-health",
    },
    Resource {
        name: "Teléfono de la Esperanza",
        url: "https://telefonodelaesperanza.org/",
    },
];

const ANSIEDAD: &[Resource] = &[
    Resource {
        name: "Asociación TOC España",
        url: "https://asociaciontoc.org/",
    },
    Resource {
        name: "Mind (Inglés)",
        url: "https://www.mind.org.uk/information-support/types-of-mental-health-problems/anxiety-and-panic-attacks/",
    },
];

const DEPRESION: &[Resource] = &[
    Resource {
        name: "Asociación Española de Psiquiatría",
        url: "https://www.sepsiq.org/",
    },
    Resource {
        name: "Depression Alliance (Inglés)",
        url: "https://www.depressionalliance.org/",
    },
];

/// Resources for a topic; topics without their own list get the general ones
pub fn resources_for(category: &Category) -> &'static [Resource] {
    match category {
        Category::Ansiedad => ANSIEDAD,
        Category::Depresion => DEPRESION,
        _ => GENERAL,
    }
}
