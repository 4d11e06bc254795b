//! Domain types for the SorteoHub client.
//!
//! Wire names follow the backend (Spanish, camelCase); Rust names follow the
//! domain. Records are treated as immutable snapshots: stores replace them
//! wholesale on refresh.

use crate::pool::RaffleType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Raffle identifier (backend `_id`)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaffleId(String);

impl RaffleId {
    /// Create a raffle id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RaffleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RaffleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Element labels
// ============================================================================

/// One sellable element of a raffle pool
///
/// Generated pools hold integers for numeric raffles; the backend may send
/// the same element back as a string. Comparisons always go through
/// [`crate::reconciler::normalize_label`], so `7` and `"7"` are one label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementLabel {
    /// Integer label (numeric raffles)
    Number(i64),
    /// Text label (cards, letters, animals, colors, teams, emoji, countries)
    Text(String),
}

impl ElementLabel {
    /// Integer value of this label, if it has one
    ///
    /// Text labels holding an integer (`"42"`) count as numeric.
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for ElementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for ElementLabel {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ElementLabel {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ElementLabel {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ============================================================================
// Money
// ============================================================================

/// Money amount in cents
///
/// The backend sends prices as JSON numbers in currency units (`50`,
/// `12.5`), sometimes as numeric strings. They are converted to cents once,
/// at parse time; all arithmetic after that is integral.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Create from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Create from whole currency units
    #[must_use]
    pub const fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(100))
    }

    /// Amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self × count`
    #[must_use]
    pub const fn times(&self, count: usize) -> Self {
        Self(self.0.saturating_mul(count as u64))
    }

    /// Parse a currency-unit amount (`"150"`, `"12.50"`)
    ///
    /// Returns `None` for negative, non-finite or non-numeric input.
    #[must_use]
    pub fn parse_units(text: &str) -> Option<Self> {
        text.trim().parse::<f64>().ok().and_then(Self::from_f64_units)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // checked finite and non-negative
    fn from_f64_units(units: f64) -> Option<Self> {
        if !units.is_finite() || units < 0.0 {
            return None;
        }
        Some(Self((units * 100.0).round() as u64))
    }

    #[allow(clippy::cast_precision_loss)] // prices are far below 2^52 cents
    fn as_f64_units(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0 / 100;
        let cents = self.0 % 100;
        if cents == 0 {
            write!(f, "${units}")
        } else {
            write!(f, "${units}.{cents:02}")
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parsed = match RawAmount::deserialize(deserializer)? {
            RawAmount::Number(n) => Self::from_f64_units(n),
            RawAmount::Text(s) => Self::parse_units(&s),
        };
        parsed.ok_or_else(|| serde::de::Error::custom("price must be a non-negative number"))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            serializer.serialize_u64(self.0 / 100)
        } else {
            serializer.serialize_f64(self.as_f64_units())
        }
    }
}

// ============================================================================
// Raffle
// ============================================================================

/// Prize offered by a raffle
///
/// The backend stores prizes either as plain names or as objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PrizeRepr")]
pub struct Prize {
    /// Prize name
    #[serde(rename = "nombre")]
    pub name: String,
    /// Optional description
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Prize {
    /// Prize with just a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PrizeRepr {
    Name(String),
    Detailed {
        #[serde(alias = "nombre")]
        name: String,
        #[serde(alias = "descripcion", default)]
        description: Option<String>,
    },
}

impl From<PrizeRepr> for Prize {
    fn from(repr: PrizeRepr) -> Self {
        match repr {
            PrizeRepr::Name(name) => Self::named(name),
            PrizeRepr::Detailed { name, description } => Self { name, description },
        }
    }
}

/// How participants pay the organizer
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    /// Payment method ("transferencia", "efectivo", ...)
    #[serde(rename = "metodo", default)]
    pub method: String,
    /// Free-text instructions (account number, holder name)
    #[serde(rename = "instrucciones", default)]
    pub instructions: String,
}

fn default_true() -> bool {
    true
}

/// Raffle record as returned by the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Raffle {
    /// Identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: RaffleId,
    /// Title
    #[serde(rename = "titulo", default)]
    pub title: String,
    /// Description
    #[serde(rename = "descripcion", default)]
    pub description: String,
    /// Element type
    #[serde(rename = "tipo", default)]
    pub raffle_type: RaffleType,
    /// Category
    #[serde(rename = "categoria", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// The complete element pool, in declaration order
    #[serde(rename = "numerosDisponibles", default, deserialize_with = "nullable_vec")]
    pub pool: Vec<ElementLabel>,
    /// Labels already sold, in server order
    #[serde(rename = "numerosVendidos", default, deserialize_with = "nullable_vec")]
    pub sold: Vec<ElementLabel>,
    /// Labels held by pending participations, in server order
    #[serde(rename = "numerosReservados", default, deserialize_with = "nullable_vec")]
    pub reserved: Vec<ElementLabel>,
    /// Price per element
    #[serde(rename = "precio", default)]
    pub unit_price: Money,
    /// Whether the raffle accepts participations
    #[serde(rename = "activa", default = "default_true")]
    pub active: bool,
    /// Closing date
    #[serde(rename = "fechaFin", default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// Prizes
    #[serde(rename = "premios", default, deserialize_with = "nullable_vec")]
    pub prizes: Vec<Prize>,
    /// Payment instructions
    #[serde(rename = "infoPago", default, skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<PaymentInfo>,
    /// Hidden from the public listing
    #[serde(rename = "privada", default)]
    pub private: bool,
}

/// Accept `null` where a list is expected
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /rifas` and `PUT /rifas/:id`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RaffleInput {
    /// Title
    #[serde(rename = "titulo")]
    pub title: String,
    /// Description
    #[serde(rename = "descripcion")]
    pub description: String,
    /// Category
    #[serde(rename = "categoria", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Element type
    #[serde(rename = "tipo")]
    pub raffle_type: RaffleType,
    /// Complete element pool
    #[serde(rename = "numerosDisponibles")]
    pub pool: Vec<ElementLabel>,
    /// Price per element
    #[serde(rename = "precio")]
    pub unit_price: Money,
    /// Closing date
    #[serde(rename = "fechaFin")]
    pub ends_at: DateTime<Utc>,
    /// Prizes
    #[serde(rename = "premios")]
    pub prizes: Vec<Prize>,
    /// Payment instructions
    #[serde(rename = "infoPago")]
    pub payment_info: PaymentInfo,
    /// Hidden from the public listing
    #[serde(rename = "privada")]
    pub private: bool,
}

/// Filters for `GET /rifas`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RaffleFilters {
    /// Only raffles of this type
    pub raffle_type: Option<RaffleType>,
    /// Minimum unit price
    pub min_price: Option<Money>,
    /// Maximum unit price
    pub max_price: Option<Money>,
    /// Only raffles with free elements left
    pub only_available: bool,
    /// Free-text search
    pub search: Option<String>,
    /// Category
    pub category: Option<String>,
}

impl RaffleFilters {
    /// Query-string pairs, omitting unset filters
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(raffle_type) = self.raffle_type {
            query.push(("tipo", raffle_type.tag().to_string()));
        }
        if let Some(min) = self.min_price {
            query.push(("precioMin", units_string(min)));
        }
        if let Some(max) = self.max_price {
            query.push(("precioMax", units_string(max)));
        }
        if self.only_available {
            query.push(("disponibles", "true".to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            query.push(("categoria", category.to_string()));
        }
        query
    }
}

fn units_string(money: Money) -> String {
    let cents = money.cents();
    if cents % 100 == 0 {
        (cents / 100).to_string()
    } else {
        format!("{}.{:02}", cents / 100, cents % 100)
    }
}

// ============================================================================
// Users and sessions
// ============================================================================

/// User role
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// Regular visitor buying elements
    #[default]
    Participant,
    /// Creates and manages raffles
    Organizer,
    /// Full access
    Admin,
}

impl Role {
    /// Wire value
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "participante",
            Self::Organizer => "organizador",
            Self::Admin => "admin",
        }
    }

    /// Parse a wire value; unknown roles are participants
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "admin" | "administrador" => Self::Admin,
            "organizador" | "organizer" => Self::Organizer,
            _ => Self::Participant,
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// Signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Display name
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Email
    pub email: String,
    /// Role
    #[serde(rename = "rol", default)]
    pub role: Role,
}

/// Response of login and register
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token
    pub token: String,
    /// The authenticated user
    #[serde(alias = "usuario")]
    pub user: User,
}

/// Login form
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    /// Email
    pub email: String,
    /// Password
    pub password: String,
}

/// Registration form
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registration {
    /// Display name
    #[serde(rename = "nombre")]
    pub name: String,
    /// Email
    pub email: String,
    /// Password
    pub password: String,
    /// Requested role
    #[serde(rename = "rol")]
    pub role: Role,
}

// ============================================================================
// Participation
// ============================================================================

/// Body of `POST /participantes/:rifaId/participar`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParticipationRequest {
    /// Elements the participant is buying, in selection order
    #[serde(rename = "numeros")]
    pub labels: Vec<ElementLabel>,
    /// Contact name
    #[serde(rename = "nombre")]
    pub name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    #[serde(rename = "telefono")]
    pub phone: String,
    /// Country
    #[serde(rename = "pais", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// State or province
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Uploaded payment receipt URL
    #[serde(rename = "comprobante", skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
}

/// A participation as listed under "my participations"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    /// Identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Raffle the participation belongs to
    #[serde(rename = "rifaId", alias = "rifa")]
    pub raffle_id: RaffleId,
    /// Elements bought
    #[serde(rename = "numeros", default, deserialize_with = "nullable_vec")]
    pub labels: Vec<ElementLabel>,
    /// Backend status ("pendiente", "confirmado", ...)
    #[serde(rename = "estado", default)]
    pub status: String,
    /// Total paid
    #[serde(rename = "total", default)]
    pub total: Money,
}

// ============================================================================
// Catalogs, uploads, advertisers
// ============================================================================

/// Country entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    /// ISO code
    #[serde(alias = "codigo")]
    pub code: String,
    /// Display name
    #[serde(alias = "nombre")]
    pub name: String,
}

/// State or province entry
///
/// Some catalogs list plain names, others objects with a code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RegionRepr")]
pub struct Region {
    /// Code, when the catalog provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Display name
    pub name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RegionRepr {
    Name(String),
    Detailed {
        #[serde(alias = "codigo", default)]
        code: Option<String>,
        #[serde(alias = "nombre")]
        name: String,
    },
}

impl From<RegionRepr> for Region {
    fn from(repr: RegionRepr) -> Self {
        match repr {
            RegionRepr::Name(name) => Self { code: None, name },
            RegionRepr::Detailed { code, name } => Self { code, name },
        }
    }
}

/// Result of an image upload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Public URL of the stored image
    #[serde(alias = "imageUrl")]
    pub url: String,
}

/// Advertiser business profile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiserProfile {
    /// Identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Business name
    #[serde(rename = "nombreNegocio", alias = "nombre")]
    pub business_name: String,
    /// Contact email
    pub email: String,
}

/// Response of advertiser login
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiserSession {
    /// Advertiser bearer token
    pub token: String,
    /// The advertiser
    #[serde(alias = "anunciante")]
    pub advertiser: AdvertiserProfile,
}

/// Coupon offered by an advertiser
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Title
    #[serde(rename = "titulo", default)]
    pub title: String,
    /// Code to present at the business
    #[serde(rename = "codigo", default)]
    pub code: String,
    /// Discount description ("20%", "2x1")
    #[serde(rename = "descuento", default)]
    pub discount: String,
    /// Expiry
    #[serde(rename = "fechaExpiracion", default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Advertisement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    /// Identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Title
    #[serde(rename = "titulo", default)]
    pub title: String,
    /// Banner image
    #[serde(rename = "imagen", default)]
    pub image_url: Option<String>,
    /// Click-through URL
    #[serde(rename = "enlace", default)]
    pub link: Option<String>,
}
