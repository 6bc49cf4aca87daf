use crate::domain_model::UserId;
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::{Database, Decode, Encode, Type};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct CountryStatusId(pub i64);

impl fmt::Display for CountryStatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CountryStatusId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(CountryStatusId)
    }
}

/// What the user intends for a country. Closed set; anything else is rejected
/// before it reaches a store.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitStatus {
    Visited,
    Planned,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Visited => "visited",
            VisitStatus::Planned => "planned",
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("status must be one of: visited, planned")]
pub struct UnknownVisitStatus;

impl FromStr for VisitStatus {
    type Err = UnknownVisitStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visited" => Ok(Self::Visited),
            "planned" => Ok(Self::Planned),
            _ => Err(UnknownVisitStatus),
        }
    }
}

impl<'r, DB: Database> Decode<'r, DB> for VisitStatus
where
    &'r str: Decode<'r, DB>,
{
    fn decode(value: <DB as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as Decode<DB>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl<'q, DB: Database> Encode<'q, DB> for VisitStatus
where
    String: Encode<'q, DB>,
{
    fn encode_by_ref(
        &self,
        buf: &mut <DB as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        self.to_string().encode_by_ref(buf)
    }
}

impl<DB: Database> Type<DB> for VisitStatus
where
    String: Type<DB>,
{
    fn type_info() -> <DB as Database>::TypeInfo {
        <String as Type<DB>>::type_info()
    }

    fn compatible(ty: &<DB as Database>::TypeInfo) -> bool {
        <String as Type<DB>>::compatible(ty)
    }
}

/// ISO 3166-1 alpha-3 code, stored upper-cased.
///
/// Map datasets use `-99` for disputed territories, so the check is on shape
/// (three ASCII letters, digits or `-`) rather than on the official code list.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct IsoCode(String);

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InvalidIsoCode {
    #[error("isoCode is required")]
    Empty,
    #[error("isoCode must be a three character ISO 3166-1 alpha-3 code")]
    Malformed,
}

impl IsoCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidIsoCode> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InvalidIsoCode::Empty);
        }
        let well_formed = trimmed.len() == 3
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !well_formed {
            return Err(InvalidIsoCode::Malformed);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IsoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryStatusRecord {
    pub id: CountryStatusId,
    pub user_id: UserId,
    pub iso_code: IsoCode,
    pub name: Option<String>,
    pub status: VisitStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("visited", VisitStatus::Visited)]
    #[case("planned", VisitStatus::Planned)]
    fn parses_known_statuses(#[case] raw: &str, #[case] expected: VisitStatus) {
        assert_eq!(raw.parse::<VisitStatus>(), Ok(expected));
        assert_eq!(expected.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("Visited")]
    #[case("wishlist")]
    fn rejects_unknown_statuses(#[case] raw: &str) {
        assert_eq!(raw.parse::<VisitStatus>(), Err(UnknownVisitStatus));
    }

    #[test]
    fn status_uses_lowercase_on_the_wire() {
        let json = serde_json::to_string(&VisitStatus::Planned).unwrap();
        assert_eq!(json, "\"planned\"");
    }

    #[rstest]
    #[case("JPN", "JPN")]
    #[case("fra", "FRA")]
    #[case(" deu ", "DEU")]
    #[case("-99", "-99")]
    fn accepts_alpha3_shapes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(IsoCode::parse(raw).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("", InvalidIsoCode::Empty)]
    #[case("   ", InvalidIsoCode::Empty)]
    #[case("FR", InvalidIsoCode::Malformed)]
    #[case("FRAN", InvalidIsoCode::Malformed)]
    #[case("F R", InvalidIsoCode::Malformed)]
    fn rejects_bad_iso_codes(#[case] raw: &str, #[case] expected: InvalidIsoCode) {
        assert_eq!(IsoCode::parse(raw), Err(expected));
    }

    #[test]
    fn record_serializes_in_camel_case() {
        let record = CountryStatusRecord {
            id: CountryStatusId(1),
            user_id: UserId(1),
            iso_code: IsoCode::parse("JPN").unwrap(),
            name: Some("Japan".to_string()),
            status: VisitStatus::Visited,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 1,
                "userId": 1,
                "isoCode": "JPN",
                "name": "Japan",
                "status": "visited",
            })
        );
    }
}
