//! Raffle types and the element pools generated for them.
//!
//! Generation is deterministic: the creation wizard's "reset elements"
//! action regenerates the pool from `(type, count)` and must get back exactly
//! what it started with.

use crate::colors::COLOR_TABLE;
use crate::types::ElementLabel;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Kind of element a raffle sells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RaffleType {
    /// Integers `1..=n`
    #[default]
    Numeros,
    /// Playing cards
    Cartas,
    /// Letters A-Z
    Abecedario,
    /// Chinese zodiac animals
    Animales,
    /// Color names
    Colores,
    /// Football clubs
    Equipos,
    /// Emoji
    Emojis,
    /// Countries
    Paises,
}

impl RaffleType {
    /// Every type, in menu order
    pub const ALL: [Self; 8] = [
        Self::Numeros,
        Self::Cartas,
        Self::Abecedario,
        Self::Animales,
        Self::Colores,
        Self::Equipos,
        Self::Emojis,
        Self::Paises,
    ];

    /// Wire tag
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Numeros => "numeros",
            Self::Cartas => "cartas",
            Self::Abecedario => "abecedario",
            Self::Animales => "animales",
            Self::Colores => "colores",
            Self::Equipos => "equipos",
            Self::Emojis => "emojis",
            Self::Paises => "paises",
        }
    }

    /// Parse a wire tag; unknown tags are numeric
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .unwrap_or(Self::Numeros)
    }

    /// Whether elements are integers
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeros)
    }
}

impl fmt::Display for RaffleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for RaffleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for RaffleType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = Option::<String>::deserialize(deserializer)?;
        Ok(tag.as_deref().map_or(Self::Numeros, Self::from_tag))
    }
}

const CARD_RANKS: [&str; 13] = [
    "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];
const CARD_SUITS: [&str; 4] = ["♠", "♥", "♦", "♣"];

const ZODIAC: &[&str] = &[
    "Rata", "Buey", "Tigre", "Conejo", "Dragón", "Serpiente", "Caballo", "Cabra", "Mono",
    "Gallo", "Perro", "Cerdo",
];

const TEAMS: &[&str] = &[
    "América",
    "Chivas",
    "Cruz Azul",
    "Pumas",
    "Tigres",
    "Monterrey",
    "Toluca",
    "León",
    "Santos",
    "Pachuca",
    "Atlas",
    "Puebla",
    "Necaxa",
    "Querétaro",
    "Mazatlán",
    "Juárez",
    "Tijuana",
    "San Luis",
];

const EMOJIS: &[&str] = &[
    "😀", "😎", "🥳", "😍", "🤩", "😇", "🤠", "🥶", "🤖", "👻", "🐶", "🐱", "🦊", "🐼", "🐸",
    "🦁", "🐵", "🦄", "🍕", "🍔", "🌮", "🍩", "🍉", "⚽", "🏀", "🎸", "🎮", "🚀", "🌈", "⭐",
];

const COUNTRIES: &[&str] = &[
    "México",
    "Argentina",
    "Brasil",
    "Colombia",
    "Chile",
    "Perú",
    "Uruguay",
    "Paraguay",
    "Bolivia",
    "Ecuador",
    "Venezuela",
    "Guatemala",
    "Honduras",
    "El Salvador",
    "Nicaragua",
    "Costa Rica",
    "Panamá",
    "Cuba",
    "República Dominicana",
    "Puerto Rico",
    "España",
    "Estados Unidos",
    "Canadá",
    "Francia",
    "Italia",
    "Alemania",
    "Portugal",
    "Inglaterra",
    "Japón",
    "Corea del Sur",
];

/// Size of the reference list for a type (`None` for numeric raffles)
#[must_use]
pub const fn max_elements(raffle_type: RaffleType) -> Option<usize> {
    match raffle_type {
        RaffleType::Numeros => None,
        RaffleType::Cartas => Some(CARD_RANKS.len() * CARD_SUITS.len()),
        RaffleType::Abecedario => Some(26),
        RaffleType::Animales => Some(ZODIAC.len()),
        RaffleType::Colores => Some(COLOR_TABLE.len()),
        RaffleType::Equipos => Some(TEAMS.len()),
        RaffleType::Emojis => Some(EMOJIS.len()),
        RaffleType::Paises => Some(COUNTRIES.len()),
    }
}

/// Generate the element pool for a new raffle
///
/// Numeric raffles get exactly `1..=count`. Every other type gets the first
/// `min(count, reference size)` entries of its reference list, in order.
#[must_use]
pub fn generate(raffle_type: RaffleType, count: usize) -> Vec<ElementLabel> {
    match raffle_type {
        RaffleType::Numeros => {
            let upper = i64::try_from(count).unwrap_or(i64::MAX);
            (1..=upper).map(ElementLabel::Number).collect()
        },
        RaffleType::Cartas => CARD_SUITS
            .iter()
            .flat_map(|suit| CARD_RANKS.iter().map(move |rank| format!("{rank}{suit}")))
            .take(count)
            .map(ElementLabel::Text)
            .collect(),
        RaffleType::Abecedario => ('A'..='Z')
            .take(count)
            .map(|c| ElementLabel::Text(c.to_string()))
            .collect(),
        RaffleType::Colores => COLOR_TABLE
            .iter()
            .take(count)
            .map(|(name, _)| ElementLabel::Text(capitalize(name)))
            .collect(),
        RaffleType::Animales => from_list(ZODIAC, count),
        RaffleType::Equipos => from_list(TEAMS, count),
        RaffleType::Emojis => from_list(EMOJIS, count),
        RaffleType::Paises => from_list(COUNTRIES, count),
    }
}

fn from_list(list: &[&str], count: usize) -> Vec<ElementLabel> {
    list.iter().take(count).map(|s| ElementLabel::from(*s)).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
