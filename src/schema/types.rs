//! Implementation of the Iceberg data types and their structural equality.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{IcebergResult, IcebergError};
use crate::schema::{Field, StructType};

/// The kind tag of a [`DataType`], without any kind-specific attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// True or False
    Boolean,
    /// 32-bit signed integer, can promote to long
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE 754 floating point, can promote to double
    Float,
    /// 64-bit IEEE 754 floating point
    Double,
    /// Calendar date without timezone or time
    Date,
    /// Time of day without date or timezone, microsecond precision
    Time,
    /// Timestamp with or without timezone, microsecond precision
    Timestamp,
    /// Arbitrary-length character sequences, encoded with UTF-8
    String,
    /// Universally unique identifier, stored as 16-byte fixed
    Uuid,
    /// Fixed-length byte array
    Fixed,
    /// Arbitrary-length byte array
    Binary,
    /// Fixed-point decimal
    Decimal,
    /// A tuple of typed values
    Struct,
    /// A collection of values with some element type
    List,
    /// A collection of key-value pairs with a key type and a value type
    Map,
}

impl TypeKind {
    pub fn is_nested(&self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::List | TypeKind::Map)
    }

    pub fn is_primitive(&self) -> bool {
        !self.is_nested()
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Boolean => "boolean",
            TypeKind::Integer => "integer",
            TypeKind::Long => "long",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::Date => "date",
            TypeKind::Time => "time",
            TypeKind::Timestamp => "timestamp",
            TypeKind::String => "string",
            TypeKind::Uuid => "uuid",
            TypeKind::Fixed => "fixed",
            TypeKind::Binary => "binary",
            TypeKind::Decimal => "decimal",
            TypeKind::Struct => "struct",
            TypeKind::List => "list",
            TypeKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// Attributes of a timestamp type.
///
/// If supplied, the timezone should take either the form "Area/Location" from the
/// IANA Time Zone Database (such as "Europe/Zurich") or "(+|-)HH:MM". To indicate a
/// native UTC timestamp one of "UTC", "Etc/UTC" or "+00:00" should be used. The
/// string is not interpreted: two timestamps are only equal if both timezones match
/// exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TimestampType {
    timezone: Option<String>,
}

impl TimestampType {
    /// Creates a timestamp type without timezone.
    pub fn new() -> Self {
        Self { timezone: None }
    }

    /// Creates a timestamp type with a timezone. An empty string means no timezone.
    pub fn with_timezone(timezone: impl Into<String>) -> Self {
        let timezone = timezone.into();
        Self {
            timezone: if timezone.is_empty() { None } else { Some(timezone) }
        }
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }
}

/// Attributes of a fixed-length byte array type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedType {
    byte_width: i32,
}

impl FixedType {
    /// Creates a fixed type of `byte_width` bytes.
    ///
    /// # Errors
    ///
    /// [`IcebergError::InvalidArgument`] is returned if the width is negative or so
    /// large that its width in bits does not fit in an `i32`.
    pub fn try_new(byte_width: i32) -> IcebergResult<Self> {
        if byte_width < 0 {
            tracing::debug!(byte_width, "rejected negative fixed width");
            return Err(IcebergError::InvalidArgument {
                message: format!("negative fixed byte width {byte_width}")
            });
        }

        if byte_width > i32::MAX / 8 {
            tracing::debug!(byte_width, "rejected oversized fixed width");
            return Err(IcebergError::InvalidArgument {
                message: format!("fixed byte width {byte_width} too large")
            });
        }

        Ok(Self { byte_width })
    }

    pub fn byte_width(&self) -> i32 {
        self.byte_width
    }

    pub fn bit_width(&self) -> i32 {
        self.byte_width * 8
    }
}

/// Attributes of a fixed-point decimal type.
///
/// Decimals are encoded as a scaled integer. The precision is the number of
/// significant digits, the scale the number of digits after the decimal point.
/// Iceberg limits precision to 38 digits, so every decimal fits in 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecimalType {
    precision: i32,
    scale: i32,
}

impl DecimalType {
    pub const MIN_PRECISION: i32 = 1;
    pub const MAX_PRECISION: i32 = 38;
    /// In-memory width of every decimal value.
    pub const BYTE_WIDTH: i32 = 16;

    /// Creates a decimal type.
    ///
    /// # Errors
    ///
    /// [`IcebergError::InvalidArgument`] is returned if `precision` is outside
    /// `[1, 38]`. The precision is never clamped.
    pub fn try_new(precision: i32, scale: i32) -> IcebergResult<Self> {
        if !(Self::MIN_PRECISION..=Self::MAX_PRECISION).contains(&precision) {
            tracing::debug!(precision, scale, "rejected decimal precision");
            return Err(IcebergError::InvalidArgument {
                message: format!(
                    "decimal precision out of range [{}, {}]: {}",
                    Self::MIN_PRECISION, Self::MAX_PRECISION, precision
                )
            });
        }

        Ok(Self { precision, scale })
    }

    pub fn precision(&self) -> i32 {
        self.precision
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Minimum number of bytes needed to store a value of this precision as a
    /// two's complement integer.
    pub fn required_bytes(&self) -> i32 {
        // Precision is validated in try_new.
        decimal_required_bytes(self.precision).unwrap_or(Self::BYTE_WIDTH)
    }
}

/// Returns the minimum number of bytes able to hold an unscaled decimal value of
/// `precision` digits, or `None` if the precision is below 1.
pub fn decimal_required_bytes(precision: i32) -> Option<i32> {
    // ceil((p * log2(10) + 1) / 8) for p in 0..=38, ceil(p / 8 * log2(10) + 1) above
    const BYTES: [i32; 39] = [
        -1, 1, 1, 2, 2, 3, 3, 4, 4, 4, 5, 5, 6, 6, 6, 7, 7, 8, 8, 9,
        9, 9, 10, 10, 11, 11, 11, 12, 12, 13, 13, 13, 14, 14, 15, 15, 16, 16, 16,
    ];

    if precision < 1 {
        return None;
    }

    match BYTES.get(precision as usize) {
        Some(&bytes) => Some(bytes),
        None => Some(((precision as f64 / 8.0) * 10f64.log2() + 1.0).ceil() as i32),
    }
}

/// A list type holding exactly one element field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListType {
    element: Box<Field>,
}

impl ListType {
    /// Creates a list whose element field is named `item`.
    pub fn new(element_id: i32, element_nullable: bool, element_type: DataType) -> Self {
        Self::of_field(Field::new(element_id, "item", element_nullable, element_type))
    }

    /// Creates a list from a caller-named element field.
    pub fn of_field(element: Field) -> Self {
        Self { element: Box::new(element) }
    }

    /// Returns a reference to the nested element field.
    pub fn element_field(&self) -> &Field {
        &self.element
    }

    pub fn element_type(&self) -> &DataType {
        self.element.data_type()
    }
}

const MAP_ENTRIES_NAME: &str = "entries";
/// Id of the synthetic entries field built by [`MapType::new`] and
/// [`MapType::try_new`]. Only key and value carry schema ids.
const MAP_ENTRIES_ID: i32 = -1;

/// A map type.
///
/// A map is stored like a list of `{key, value}` structs: its single child is a
/// non-nullable `entries` field whose struct type holds the non-nullable key field
/// followed by the value field.
#[derive(Debug, Clone)]
pub struct MapType {
    entries: Box<Field>,
    keys_sorted: bool,
}

impl MapType {
    /// Creates a map with a `key` field and a `value` field.
    pub fn new(
        key_id: i32,
        key_type: DataType,
        value_id: i32,
        value_nullable: bool,
        value_type: DataType,
    ) -> Self {
        Self {
            entries: Box::new(Self::entries_field_of(
                Field::new(key_id, "key", false, key_type),
                Field::new(value_id, "value", value_nullable, value_type),
            )),
            keys_sorted: false,
        }
    }

    /// Creates a map from caller-supplied key and value fields.
    ///
    /// # Errors
    ///
    /// [`IcebergError::TypeError`] is returned if the key field is nullable.
    pub fn try_new(key: Field, value: Field, keys_sorted: bool) -> IcebergResult<Self> {
        Self::try_from_entries(Self::entries_field_of(key, value), keys_sorted)
    }

    /// Creates a map from its entries field.
    ///
    /// # Errors
    ///
    /// [`IcebergError::TypeError`] is returned if `entries` is nullable, is not a
    /// struct of exactly two fields, or has a nullable key field.
    pub fn try_from_entries(entries: Field, keys_sorted: bool) -> IcebergResult<Self> {
        let entries_struct = match entries.data_type() {
            DataType::Struct(s) if !entries.nullable() => s,
            _ => {
                tracing::debug!(entries = %entries, "rejected map entries field");
                return Err(IcebergError::TypeError {
                    message: "map entries field should be a non-nullable struct".to_string()
                });
            }
        };

        if entries_struct.num_fields() != 2 {
            return Err(IcebergError::TypeError {
                message: format!(
                    "map entries field should have two children (got {})",
                    entries_struct.num_fields()
                )
            });
        }

        if entries_struct.fields()[0].nullable() {
            return Err(IcebergError::TypeError {
                message: "map key field should be non-nullable".to_string()
            });
        }

        Ok(Self { entries: Box::new(entries), keys_sorted })
    }

    /// Returns a copy of this map with the `keys_sorted` flag replaced.
    pub fn with_keys_sorted(&self, keys_sorted: bool) -> Self {
        Self { entries: self.entries.clone(), keys_sorted }
    }

    fn entries_field_of(key: Field, value: Field) -> Field {
        Field::new(
            MAP_ENTRIES_ID,
            MAP_ENTRIES_NAME,
            false,
            DataType::Struct(StructType::new(vec![key, value]))
        )
    }

    fn entries_struct(&self) -> &StructType {
        match self.entries.data_type() {
            DataType::Struct(s) => s,
            _ => unreachable!("map entries are always a struct")
        }
    }

    /// Returns the `entries` field wrapping the key and value.
    pub fn entries_field(&self) -> &Field {
        &self.entries
    }

    pub fn key_field(&self) -> &Field {
        &self.entries_struct().fields()[0]
    }

    pub fn value_field(&self) -> &Field {
        &self.entries_struct().fields()[1]
    }

    pub fn key_type(&self) -> &DataType {
        self.key_field().data_type()
    }

    pub fn value_type(&self) -> &DataType {
        self.value_field().data_type()
    }

    pub fn keys_sorted(&self) -> bool {
        self.keys_sorted
    }
}

impl PartialEq for MapType {
    fn eq(&self, other: &Self) -> bool {
        map_equals(self, other)
    }
}

impl Eq for MapType {}

/// An Iceberg data type.
///
/// Types are compared structurally: two types are equal if they are of the same
/// [`TypeKind`] and their kind-specific attributes and children are equal. Types
/// that share a physical representation (for example a list of bytes and binary)
/// are never equal.
#[derive(Debug, Clone)]
pub enum DataType {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    /// Number of days since the UNIX epoch.
    Date,
    /// Number of microseconds since midnight.
    Time,
    /// Number of microseconds since the UNIX epoch.
    Timestamp(TimestampType),
    String,
    Uuid,
    Fixed(FixedType),
    Binary,
    Decimal(DecimalType),
    Struct(StructType),
    List(ListType),
    Map(MapType),
}

impl DataType {
    /// A timestamp type without timezone.
    pub fn timestamp() -> Self {
        DataType::Timestamp(TimestampType::new())
    }

    /// A timestamp type with a timezone.
    pub fn timestamp_tz(timezone: impl Into<String>) -> Self {
        DataType::Timestamp(TimestampType::with_timezone(timezone))
    }

    /// A fixed type. See [`FixedType::try_new`].
    pub fn fixed(byte_width: i32) -> IcebergResult<Self> {
        Ok(DataType::Fixed(FixedType::try_new(byte_width)?))
    }

    /// A decimal type. See [`DecimalType::try_new`].
    pub fn decimal(precision: i32, scale: i32) -> IcebergResult<Self> {
        Ok(DataType::Decimal(DecimalType::try_new(precision, scale)?))
    }

    pub fn new_struct(fields: impl IntoIterator<Item = Field>) -> Self {
        DataType::Struct(StructType::new(Vec::from_iter(fields)))
    }

    pub fn new_list(element: Field) -> Self {
        DataType::List(ListType::of_field(element))
    }

    /// A map type. See [`MapType::try_new`].
    pub fn new_map(key: Field, value: Field, keys_sorted: bool) -> IcebergResult<Self> {
        Ok(DataType::Map(MapType::try_new(key, value, keys_sorted)?))
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            DataType::Boolean => TypeKind::Boolean,
            DataType::Integer => TypeKind::Integer,
            DataType::Long => TypeKind::Long,
            DataType::Float => TypeKind::Float,
            DataType::Double => TypeKind::Double,
            DataType::Date => TypeKind::Date,
            DataType::Time => TypeKind::Time,
            DataType::Timestamp(_) => TypeKind::Timestamp,
            DataType::String => TypeKind::String,
            DataType::Uuid => TypeKind::Uuid,
            DataType::Fixed(_) => TypeKind::Fixed,
            DataType::Binary => TypeKind::Binary,
            DataType::Decimal(_) => TypeKind::Decimal,
            DataType::Struct(_) => TypeKind::Struct,
            DataType::List(_) => TypeKind::List,
            DataType::Map(_) => TypeKind::Map,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.kind().is_primitive()
    }

    pub fn is_nested(&self) -> bool {
        self.kind().is_nested()
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, DataType::Struct(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, DataType::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, DataType::Map(_))
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match self {
            DataType::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the fixed width of this type in bits, or `None` for variable-width
    /// and nested types.
    pub fn bit_width(&self) -> Option<i32> {
        match self {
            DataType::Boolean => Some(8),
            DataType::Integer | DataType::Float | DataType::Date => Some(32),
            DataType::Long
            | DataType::Double
            | DataType::Time
            | DataType::Timestamp(_) => Some(64),
            DataType::Uuid => Some(128),
            DataType::Fixed(f) => Some(f.bit_width()),
            DataType::Decimal(_) => Some(DecimalType::BYTE_WIDTH * 8),
            DataType::String
            | DataType::Binary
            | DataType::Struct(_)
            | DataType::List(_)
            | DataType::Map(_) => None,
        }
    }

    /// Returns the fixed width of this type in bytes, or `None` for variable-width
    /// and nested types.
    pub fn byte_width(&self) -> Option<i32> {
        match self {
            DataType::Fixed(f) => Some(f.byte_width()),
            _ => self.bit_width().map(|bits| bits / 8),
        }
    }

    /// Returns the child fields of this type.
    ///
    /// A struct returns its fields, a list its element field and a map its entries
    /// field. Primitive types have no children.
    pub fn children(&self) -> &[Field] {
        match self {
            DataType::Struct(s) => s.fields(),
            DataType::List(l) => std::slice::from_ref(&*l.element),
            DataType::Map(m) => std::slice::from_ref(&*m.entries),
            _ => &[],
        }
    }
}

// Per-kind comparators. Each one is only called once both sides are known to be
// of the same kind.

fn timestamp_equals(left: &TimestampType, right: &TimestampType) -> bool {
    left.timezone() == right.timezone()
}

fn fixed_equals(left: &FixedType, right: &FixedType) -> bool {
    left.byte_width() == right.byte_width()
}

fn decimal_equals(left: &DecimalType, right: &DecimalType) -> bool {
    left.precision() == right.precision() && left.scale() == right.scale()
}

/// Pairwise, order-sensitive comparison of child fields.
fn children_equal(left: &[Field], right: &[Field]) -> bool {
    left.len() == right.len()
        && left.iter().zip(right.iter()).all(|(l, r)| l == r)
}

fn list_equals(left: &ListType, right: &ListType) -> bool {
    children_equal(
        std::slice::from_ref(left.element_field()),
        std::slice::from_ref(right.element_field())
    )
}

fn struct_equals(left: &StructType, right: &StructType) -> bool {
    children_equal(left.fields(), right.fields())
}

fn map_equals(left: &MapType, right: &MapType) -> bool {
    left.keys_sorted() == right.keys_sorted()
        && left.key_type() == right.key_type()
        && left.value_type() == right.value_type()
}

fn type_equals(left: &DataType, right: &DataType) -> bool {
    if std::ptr::eq(left, right) {
        return true;
    }

    if left.kind() != right.kind() {
        return false;
    }

    match (left, right) {
        (DataType::Timestamp(l), DataType::Timestamp(r)) => timestamp_equals(l, r),
        (DataType::Fixed(l), DataType::Fixed(r)) => fixed_equals(l, r),
        (DataType::Decimal(l), DataType::Decimal(r)) => decimal_equals(l, r),
        (DataType::List(l), DataType::List(r)) => list_equals(l, r),
        (DataType::Struct(l), DataType::Struct(r)) => struct_equals(l, r),
        (DataType::Map(l), DataType::Map(r)) => map_equals(l, r),
        (DataType::Boolean, DataType::Boolean)
        | (DataType::Integer, DataType::Integer)
        | (DataType::Long, DataType::Long)
        | (DataType::Float, DataType::Float)
        | (DataType::Double, DataType::Double)
        | (DataType::Date, DataType::Date)
        | (DataType::Time, DataType::Time)
        | (DataType::String, DataType::String)
        | (DataType::Uuid, DataType::Uuid)
        | (DataType::Binary, DataType::Binary) => true,
        _ => unreachable!(
            "types {} and {} share a kind but are not comparable",
            left.kind(), right.kind()
        ),
    }
}

impl PartialEq for DataType {
    fn eq(&self, other: &Self) -> bool {
        type_equals(self, other)
    }
}

impl Eq for DataType {}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "bool"),
            DataType::Integer => write!(f, "integer"),
            DataType::Long => write!(f, "long"),
            DataType::Float => write!(f, "float"),
            DataType::Double => write!(f, "double"),
            DataType::Date => write!(f, "date[day]"),
            DataType::Time => write!(f, "time[us]"),
            DataType::Timestamp(t) => match t.timezone() {
                Some(tz) => write!(f, "timestamp[us, tz={tz}]"),
                None => write!(f, "timestamp[us]"),
            },
            DataType::String => write!(f, "string"),
            DataType::Uuid => write!(f, "uuid"),
            DataType::Fixed(t) => write!(f, "fixed[{}]", t.byte_width()),
            DataType::Binary => write!(f, "binary"),
            DataType::Decimal(t) => write!(f, "decimal({}, {})", t.precision(), t.scale()),
            DataType::Struct(s) => write!(f, "{s}"),
            DataType::List(l) => write!(f, "list<{}>", l.element_field()),
            DataType::Map(m) => {
                write!(f, "map<{}, {}", m.key_field(), m.value_field())?;
                if m.keys_sorted() {
                    write!(f, ", keys_sorted")?;
                }
                write!(f, ">")
            }
        }
    }
}

lazy_static! {
    static ref DECIMAL_REGEX: Regex =
        Regex::new(r#"^decimal\(\s*(?P<p>-?\d+)\s*,\s*(?P<s>-?\d+)\s*\)$"#).unwrap();
    static ref FIXED_REGEX: Regex =
        Regex::new(r#"^fixed\[(?P<l>-?\d+)\]$"#).unwrap();
    static ref TIMESTAMP_REGEX: Regex =
        Regex::new(r#"^timestamp(\[us(,\s*tz=(?P<tz>.+))?\])?$"#).unwrap();
}

fn parse_i32(s: &str, what: &str) -> IcebergResult<i32> {
    s.parse().map_err(|_| IcebergError::InvalidArgument {
        message: format!("{what} '{s}' is not a 32-bit integer")
    })
}

/// Parses the rendering of a primitive type, as produced by its `Display`
/// implementation. Nested types cannot be parsed.
impl FromStr for DataType {
    type Err = IcebergError;

    fn from_str(s: &str) -> IcebergResult<Self> {
        let s = s.trim();
        let data_type = match s {
            "bool" | "boolean" => DataType::Boolean,
            "integer" | "int" => DataType::Integer,
            "long" => DataType::Long,
            "float" => DataType::Float,
            "double" => DataType::Double,
            "date" | "date[day]" => DataType::Date,
            "time" | "time[us]" => DataType::Time,
            "string" => DataType::String,
            "uuid" => DataType::Uuid,
            "binary" => DataType::Binary,
            _ => {
                if let Some(caps) = DECIMAL_REGEX.captures(s) {
                    DataType::decimal(
                        parse_i32(&caps["p"], "decimal precision")?,
                        parse_i32(&caps["s"], "decimal scale")?
                    )?
                } else if let Some(caps) = FIXED_REGEX.captures(s) {
                    DataType::fixed(parse_i32(&caps["l"], "fixed width")?)?
                } else if let Some(caps) = TIMESTAMP_REGEX.captures(s) {
                    match caps.name("tz") {
                        Some(tz) => DataType::timestamp_tz(tz.as_str().trim()),
                        None => DataType::timestamp(),
                    }
                } else {
                    return Err(IcebergError::InvalidArgument {
                        message: format!("can't parse primitive type from '{s}'")
                    });
                }
            }
        };

        Ok(data_type)
    }
}
