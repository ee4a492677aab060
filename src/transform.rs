//! Transforms used to derive partition values and sort keys from source columns.
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{IcebergResult, IcebergError};
use crate::schema::{DataType, TypeKind};

/// A transformation applied to a source column to produce a partition value or a
/// sort key.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Transform {
    /// Source value, unmodified
    Identity,
    /// Hash of value, mod N
    Bucket(u32),
    /// Value truncated to width W
    Truncate(u32),
    /// Extract a date or timestamp year as years from 1970
    Year,
    /// Extract a date or timestamp month as months from 1970-01-01
    Month,
    /// Extract a date or timestamp day as days from 1970-01-01
    Day,
    /// Extract a timestamp hour as hours from 1970-01-01 00:00:00
    Hour,
    /// Always produces `null`
    Void,
}

impl Transform {
    /// Checks whether this transform can be applied to a source column of type
    /// `source_type`.
    pub fn can_transform(&self, source_type: &DataType) -> bool {
        let kind = source_type.kind();
        match self {
            Transform::Identity | Transform::Void => true,
            Transform::Bucket(_) => matches!(
                kind,
                TypeKind::Integer
                    | TypeKind::Long
                    | TypeKind::Date
                    | TypeKind::Time
                    | TypeKind::Timestamp
                    | TypeKind::String
                    | TypeKind::Binary
                    | TypeKind::Fixed
                    | TypeKind::Decimal
                    | TypeKind::Uuid
            ),
            Transform::Truncate(_) => matches!(
                kind,
                TypeKind::Integer
                    | TypeKind::Long
                    | TypeKind::String
                    | TypeKind::Binary
                    | TypeKind::Decimal
            ),
            Transform::Year | Transform::Month | Transform::Day => {
                matches!(kind, TypeKind::Date | TypeKind::Timestamp)
            },
            Transform::Hour => kind == TypeKind::Timestamp,
        }
    }

    /// Returns the type produced by applying this transform to `source_type`.
    ///
    /// This performs no validation. The result is only meaningful if
    /// [`Transform::can_transform`] returns `true` for `source_type`; use
    /// [`Transform::checked_result_type`] to have it checked.
    pub fn result_type(&self, source_type: &DataType) -> DataType {
        match self {
            Transform::Identity
            | Transform::Void
            | Transform::Truncate(_) => source_type.clone(),
            Transform::Bucket(_)
            | Transform::Year
            | Transform::Month
            | Transform::Hour => DataType::Integer,
            Transform::Day => DataType::Date,
        }
    }

    /// Returns the type produced by applying this transform to `source_type`.
    ///
    /// # Errors
    ///
    /// [`IcebergError::TypeError`] if this transform cannot be applied to
    /// `source_type`. For example, a `Year` transform can only be applied to date
    /// or timestamp types.
    pub fn checked_result_type(&self, source_type: &DataType) -> IcebergResult<DataType> {
        if !self.can_transform(source_type) {
            return Err(IcebergError::TypeError {
                message: format!(
                    "can't apply {self} transform to field of type {source_type}"
                )
            });
        }

        Ok(self.result_type(source_type))
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => write!(f, "identity"),
            Transform::Bucket(n) => write!(f, "bucket[{n}]"),
            Transform::Truncate(w) => write!(f, "truncate[{w}]"),
            Transform::Year => write!(f, "year"),
            Transform::Month => write!(f, "month"),
            Transform::Day => write!(f, "day"),
            Transform::Hour => write!(f, "hour"),
            Transform::Void => write!(f, "void"),
        }
    }
}

lazy_static! {
    static ref BUCKET_REGEX: Regex = Regex::new(r#"^bucket\[(?P<n>\d+)\]$"#).unwrap();
    static ref TRUNCATE_REGEX: Regex = Regex::new(r#"^truncate\[(?P<w>\d+)\]$"#).unwrap();
}

fn parse_parameter(value: &str, transform: &str) -> IcebergResult<u32> {
    value.parse().map_err(|_| IcebergError::InvalidArgument {
        message: format!("{transform} parameter '{value}' not u32")
    })
}

impl FromStr for Transform {
    type Err = IcebergError;

    fn from_str(s: &str) -> IcebergResult<Self> {
        let transform = match s {
            "identity" => Transform::Identity,
            "year" => Transform::Year,
            "month" => Transform::Month,
            "day" => Transform::Day,
            "hour" => Transform::Hour,
            "void" => Transform::Void,
            _ => {
                if let Some(caps) = BUCKET_REGEX.captures(s) {
                    Transform::Bucket(parse_parameter(&caps["n"], "bucket")?)
                } else if let Some(caps) = TRUNCATE_REGEX.captures(s) {
                    Transform::Truncate(parse_parameter(&caps["w"], "truncate")?)
                } else {
                    return Err(IcebergError::InvalidArgument {
                        message: format!("invalid transform format {s}")
                    });
                }
            }
        };

        Ok(transform)
    }
}

impl Serialize for Transform {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, MapType};

    fn source_types() -> Vec<DataType> {
        vec![
            DataType::Boolean,
            DataType::Integer,
            DataType::Long,
            DataType::Float,
            DataType::Double,
            DataType::Date,
            DataType::Time,
            DataType::timestamp(),
            DataType::timestamp_tz("UTC"),
            DataType::String,
            DataType::Uuid,
            DataType::fixed(8).unwrap(),
            DataType::Binary,
            DataType::decimal(9, 2).unwrap(),
            DataType::new_struct(vec![Field::optional(1, "a", DataType::Integer)]),
            DataType::new_list(Field::optional(2, "item", DataType::Integer)),
            DataType::Map(MapType::new(3, DataType::String, 4, true, DataType::Long)),
        ]
    }

    fn applicable(transform: Transform) -> Vec<String> {
        source_types()
            .iter()
            .filter(|t| transform.can_transform(t))
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn identity_and_void_apply_to_anything() {
        for transform in [Transform::Identity, Transform::Void] {
            for t in source_types() {
                assert!(transform.can_transform(&t));
                assert_eq!(transform.result_type(&t), t);
            }
        }
    }

    #[test]
    fn bucket() {
        assert_eq!(applicable(Transform::Bucket(4)), vec![
            "integer", "long", "date[day]", "time[us]", "timestamp[us]",
            "timestamp[us, tz=UTC]", "string", "uuid", "fixed[8]", "binary",
            "decimal(9, 2)",
        ]);

        for n in [1, 16, 1024] {
            let bucket = Transform::Bucket(n);
            assert!(bucket.can_transform(&DataType::String));
            assert_eq!(bucket.result_type(&DataType::String), DataType::Integer);
        }
    }

    #[test]
    fn truncate() {
        assert_eq!(applicable(Transform::Truncate(10)), vec![
            "integer", "long", "string", "binary", "decimal(9, 2)",
        ]);

        let decimal = DataType::decimal(9, 2).unwrap();
        assert_eq!(Transform::Truncate(10).result_type(&decimal), decimal);
    }

    #[test]
    fn temporal() {
        for transform in [Transform::Year, Transform::Month, Transform::Day] {
            assert_eq!(applicable(transform), vec![
                "date[day]", "timestamp[us]", "timestamp[us, tz=UTC]",
            ]);
        }
        assert_eq!(applicable(Transform::Hour), vec![
            "timestamp[us]", "timestamp[us, tz=UTC]",
        ]);

        let ts = DataType::timestamp();
        assert_eq!(Transform::Year.result_type(&ts), DataType::Integer);
        assert_eq!(Transform::Month.result_type(&ts), DataType::Integer);
        assert_eq!(Transform::Day.result_type(&ts), DataType::Date);
        assert_eq!(Transform::Hour.result_type(&ts), DataType::Integer);
    }

    #[test]
    fn checked_result_type() {
        assert_eq!(
            Transform::Day.checked_result_type(&DataType::Date).unwrap(),
            DataType::Date
        );

        let err = Transform::Hour.checked_result_type(&DataType::Date).unwrap_err();
        assert!(matches!(err, IcebergError::TypeError { .. }));
        assert_eq!(
            err.to_string(),
            "Type error: can't apply hour transform to field of type date[day]"
        );

        assert!(Transform::Bucket(2).checked_result_type(&DataType::Boolean).is_err());
    }

    #[test]
    fn parse_and_display() {
        let transforms = [
            Transform::Identity,
            Transform::Bucket(16),
            Transform::Truncate(4),
            Transform::Year,
            Transform::Month,
            Transform::Day,
            Transform::Hour,
            Transform::Void,
        ];
        for t in transforms {
            assert_eq!(t.to_string().parse::<Transform>().unwrap(), t);
        }

        assert!("bucket[]".parse::<Transform>().is_err());
        assert!("bucket[-1]".parse::<Transform>().is_err());
        assert!("bucket[99999999999]".parse::<Transform>().is_err());
        assert!("minute".parse::<Transform>().is_err());
    }

    #[test]
    fn serde() {
        assert_eq!(
            serde_json::to_value(Transform::Bucket(16)).unwrap(),
            serde_json::json!("bucket[16]")
        );
        assert_eq!(
            serde_json::from_value::<Transform>(serde_json::json!("truncate[3]")).unwrap(),
            Transform::Truncate(3)
        );
        assert!(serde_json::from_value::<Transform>(serde_json::json!("truncate")).is_err());
    }
}
