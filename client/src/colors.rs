//! Spanish color names for the "colores" raffle type.
//!
//! Used for live preview swatches in the creation wizard and for suggesting
//! colors an organizer has not used yet.

/// Hex shown for names outside the dictionary
pub const FALLBACK_HEX: &str = "#9CA3AF";

/// Color dictionary, in declaration order (keys are lower case)
pub const COLOR_TABLE: &[(&str, &str)] = &[
    ("rojo", "#EF4444"),
    ("azul", "#3B82F6"),
    ("verde", "#22C55E"),
    ("amarillo", "#EAB308"),
    ("naranja", "#F97316"),
    ("morado", "#A855F7"),
    ("rosa", "#EC4899"),
    ("negro", "#111827"),
    ("blanco", "#FFFFFF"),
    ("gris", "#6B7280"),
    ("café", "#92400E"),
    ("turquesa", "#14B8A6"),
    ("celeste", "#38BDF8"),
    ("dorado", "#D4AF37"),
    ("plateado", "#C0C0C0"),
    ("beige", "#F5F5DC"),
    ("violeta", "#8B5CF6"),
    ("lila", "#C4B5FD"),
    ("coral", "#FB7185"),
    ("vino", "#7F1D1D"),
    ("fucsia", "#D946EF"),
    ("marino", "#1E3A8A"),
];

/// Resolve a color name to its hex value
///
/// Case-insensitive and whitespace-trimmed. Unknown names resolve to
/// [`FALLBACK_HEX`].
#[must_use]
pub fn resolve_hex(name: &str) -> &'static str {
    let key = name.trim().to_lowercase();
    COLOR_TABLE
        .iter()
        .find(|(color, _)| *color == key)
        .map_or(FALLBACK_HEX, |(_, hex)| hex)
}

/// Whether `name` is in the dictionary
#[must_use]
pub fn is_known(name: &str) -> bool {
    resolve_hex(name) != FALLBACK_HEX
}

/// Dictionary names not present in `used`
///
/// `used` is compared lower-cased and trimmed; the result keeps
/// declaration order.
#[must_use]
pub fn available_suggestions<S: AsRef<str>>(used: &[S]) -> Vec<&'static str> {
    let used: Vec<String> = used
        .iter()
        .map(|name| name.as_ref().trim().to_lowercase())
        .collect();

    COLOR_TABLE
        .iter()
        .map(|(color, _)| *color)
        .filter(|color| !used.iter().any(|u| u == color))
        .collect()
}
