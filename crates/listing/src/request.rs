use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

const SKU_PREFIX: &str = "ITEM_";

/// Characters of the (underscored) title kept in a SKU.
const SKU_TITLE_CHARS: usize = 20;

/// Derive the inventory SKU from a listing title.
///
/// Spaces become underscores and the result is cut to the first
/// [`SKU_TITLE_CHARS`] characters. Two titles sharing that prefix map to the
/// same SKU, and publishing the second overwrites the first one's inventory
/// item. Existing remote items are keyed by this exact derivation.
pub fn derive_sku(title: &str) -> String {
    let body: String = title
        .replace(' ', "_")
        .chars()
        .take(SKU_TITLE_CHARS)
        .collect();
    format!("{SKU_PREFIX}{body}")
}

/// Item condition as the inventory API spells it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    #[default]
    New,
    LikeNew,
    UsedExcellent,
    UsedGood,
    UsedAcceptable,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Self::New,
        Self::LikeNew,
        Self::UsedExcellent,
        Self::UsedGood,
        Self::UsedAcceptable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::LikeNew => "LIKE_NEW",
            Self::UsedExcellent => "USED_EXCELLENT",
            Self::UsedGood => "USED_GOOD",
            Self::UsedAcceptable => "USED_ACCEPTABLE",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ValidationError;

    /// Accepts `LIKE_NEW`, `like-new` and `Like New` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ValidationError::Condition(s.to_string()))
    }
}

/// A positive amount in whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub fn from_cents(cents: u64) -> Option<Self> {
        (cents > 0).then_some(Self { cents })
    }

    pub fn cents(self) -> u64 {
        self.cents
    }
}

impl FromStr for Price {
    type Err = ValidationError;

    /// Parses a plain decimal amount with at most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::Price(s.to_string());
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

        let (whole, frac) = s.trim().split_once('.').unwrap_or((s.trim(), ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 2 || !digits(whole) || !digits(frac) {
            return Err(invalid());
        }
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: u64 = format!("{frac:0<2}").parse().map_err(|_| invalid())?;
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(invalid)?;
        Self::from_cents(cents).ok_or_else(invalid)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

/// Listing fields as the operator typed them. Numbers may arrive as JSON
/// numbers or strings; nothing is checked until [`validate`](Self::validate).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub price: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub quantity: String,
    #[serde(deserialize_with = "scalar_as_string")]
    pub category_id: String,
    pub condition: String,
    pub image_urls: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

fn scalar_as_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Scalar>::deserialize(d)? {
        Some(Scalar::Text(s)) => s,
        Some(Scalar::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    Ok(value.to_string())
}

impl ListingDraft {
    /// Check every field and parse the numeric ones.
    ///
    /// An empty quantity means 1 and an empty condition means `NEW`.
    pub fn validate(self) -> Result<ListingRequest, ValidationError> {
        let title = required(&self.title, "title")?;
        let description = required(&self.description, "description")?;
        let category_id = required(&self.category_id, "category_id")?;

        let price = self.price.trim();
        if price.is_empty() {
            return Err(ValidationError::Missing("price"));
        }
        let price: Price = price.parse()?;

        let quantity = match self.quantity.trim() {
            "" => 1,
            raw => raw
                .parse::<u32>()
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| ValidationError::Quantity(self.quantity.clone()))?,
        };

        let condition = match self.condition.trim() {
            "" => Condition::default(),
            raw => raw.parse()?,
        };

        let image_urls: Vec<String> = self
            .image_urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();
        if image_urls.is_empty() {
            return Err(ValidationError::NoImages);
        }

        Ok(ListingRequest {
            title,
            description,
            price,
            quantity,
            category_id,
            condition,
            image_urls,
        })
    }
}

/// A validated listing, ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    title: String,
    description: String,
    price: Price,
    quantity: u32,
    category_id: String,
    condition: Condition,
    image_urls: Vec<String>,
}

impl ListingRequest {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn image_urls(&self) -> &[String] {
        &self.image_urls
    }

    pub fn sku(&self) -> String {
        derive_sku(&self.title)
    }
}
