use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target group of a product, inferred from the detail URL slug
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Herre,
    Dame,
    Barn,
    Junior,
    #[default]
    Unisex,
    Alle,
}

impl Gender {
    pub const ALL: [Gender; 6] = [
        Gender::Herre,
        Gender::Dame,
        Gender::Barn,
        Gender::Junior,
        Gender::Unisex,
        Gender::Alle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Herre => "herre",
            Gender::Dame => "dame",
            Gender::Barn => "barn",
            Gender::Junior => "junior",
            Gender::Unisex => "unisex",
            Gender::Alle => "alle",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = UnknownGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str() == lowered)
            .ok_or(UnknownGender(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gender '{0}'")]
pub struct UnknownGender(pub String);

/// One normalized catalog row, the unit of persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub brand: String,
    #[serde(default)]
    pub image: String,
    pub price: Option<i64>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub color: String,
    pub url: String,
    #[serde(default)]
    pub has_error: bool,
}

impl ProductRecord {
    /// Natural key used for conflict resolution: (brand, name, gender, color)
    pub fn natural_key(&self) -> NaturalKey<'_> {
        NaturalKey {
            brand: &self.brand,
            name: &self.name,
            gender: self.gender,
            color: &self.color,
        }
    }
}

/// Borrowed view over the identity fields of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaturalKey<'a> {
    pub brand: &'a str,
    pub name: &'a str,
    pub gender: Gender,
    pub color: &'a str,
}

impl NaturalKey<'_> {
    /// Case-insensitive composite key: `brand|name|gender|color`
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.brand.to_lowercase(),
            self.name.to_lowercase(),
            self.gender,
            self.color.to_lowercase()
        )
    }
}

/// Sort direction for the catalog read path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for PriceOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(PriceOrder::Asc),
            "desc" => Ok(PriceOrder::Desc),
            other => Err(format!("unknown sort order '{other}'")),
        }
    }
}

/// Read-path filter used by the catalog browser and quiz
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    /// `None` means all genders
    pub gender: Option<Gender>,
    pub order: PriceOrder,
}

impl CatalogQuery {
    pub fn new(gender: Option<Gender>, order: PriceOrder) -> Self {
        Self { gender, order }
    }
}
