//! Static list of activities a user can pick from. The last entry is a sentinel: picking it
//! means the user has to type the activity name.

use std::fmt::Display;

pub const CUSTOM_ACTIVITY_ID: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: &'static str,
}

impl CatalogEntry {
    pub fn is_custom(&self) -> bool {
        self.id == CUSTOM_ACTIVITY_ID
    }
}

impl Display for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>2}  {}", self.id, self.name)
    }
}

pub const CATALOG: [CatalogEntry; 10] = [
    CatalogEntry { id: 1, name: "Lectura" },
    CatalogEntry { id: 2, name: "Escritura" },
    CatalogEntry { id: 3, name: "Investigación" },
    CatalogEntry { id: 4, name: "Reunión" },
    CatalogEntry { id: 5, name: "Programación" },
    CatalogEntry { id: 6, name: "Diseño" },
    CatalogEntry { id: 7, name: "Pruebas" },
    CatalogEntry { id: 8, name: "Documentación" },
    CatalogEntry { id: 9, name: "Descanso" },
    CatalogEntry { id: CUSTOM_ACTIVITY_ID, name: "Otra" },
];

pub fn find(id: u32) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.id == id)
}
