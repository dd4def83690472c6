//! Classification tags attached to orders.

use serde::{Deserialize, Serialize};

/// Identifier of a taxonomy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub u16);

impl std::fmt::Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The group a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    Process,
    Material,
    Miscellaneous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: TagId,
    pub name: &'static str,
    pub category: TagCategory,
}

const fn tag(id: u16, name: &'static str, category: TagCategory) -> Tag {
    Tag {
        id: TagId(id),
        name,
        category,
    }
}

pub const PROCESS_TAGS: &[Tag] = &[
    tag(1, "CNC Machining", TagCategory::Process),
    tag(2, "3D Printing", TagCategory::Process),
    tag(3, "Injection Molding", TagCategory::Process),
    tag(4, "Sheet Metal", TagCategory::Process),
    tag(5, "Laser Cutting", TagCategory::Process),
    tag(6, "Casting", TagCategory::Process),
    tag(7, "Welding", TagCategory::Process),
    tag(8, "Assembly", TagCategory::Process),
];

pub const MATERIAL_TAGS: &[Tag] = &[
    tag(100, "Aluminum", TagCategory::Material),
    tag(101, "Steel", TagCategory::Material),
    tag(102, "Stainless Steel", TagCategory::Material),
    tag(103, "Titanium", TagCategory::Material),
    tag(104, "Brass", TagCategory::Material),
    tag(105, "ABS", TagCategory::Material),
    tag(106, "Nylon", TagCategory::Material),
    tag(107, "Polycarbonate", TagCategory::Material),
    tag(108, "Carbon Fiber", TagCategory::Material),
];

pub const MISCELLANEOUS_TAGS: &[Tag] = &[
    tag(200, "Prototype", TagCategory::Miscellaneous),
    tag(201, "Production Run", TagCategory::Miscellaneous),
    tag(202, "Rush", TagCategory::Miscellaneous),
    tag(203, "Tight Tolerance", TagCategory::Miscellaneous),
    tag(204, "Finishing Required", TagCategory::Miscellaneous),
];

/// Iterates over every known tag.
pub fn all_tags() -> impl Iterator<Item = &'static Tag> {
    PROCESS_TAGS
        .iter()
        .chain(MATERIAL_TAGS)
        .chain(MISCELLANEOUS_TAGS)
}

/// Looks up a tag by id.
pub fn find_tag(id: TagId) -> Option<&'static Tag> {
    all_tags().find(|tag| tag.id == id)
}
