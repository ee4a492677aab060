//! Iceberg data types, fields and table schemas.
//!
//! This module provides [`Schema`] which represents the schema of an Iceberg table. Each
//! schema has a `schema_id` and an ordered list of columns represented by [`Field`].
//!
//! In an Iceberg schema, each field has an associated type, represented in this module
//! by [`DataType`]. The schema can be highly complex with nested fields such as
//! [`DataType::Struct`], [`DataType::List`] and [`DataType::Map`].
//!
//! Each top-level and nested field has an associated id. Care must be taken to ensure
//! that field ids are unique in the schema and consistent when evolving schemas;
//! [`SchemaBuilder`] assigns them automatically.
//!
//! ## Creating a simple schema
//!
//! ```rust
//! use icecore::schema::{Schema, Field, DataType};
//!
//! let schema = Schema::new(0, vec![
//!     Field::required(1, "id", DataType::Long),
//!     Field::optional(2, "ts", DataType::timestamp()),
//! ]);
//! assert_eq!(schema.field_index("ts"), Some(1));
//! ```
//!
//! ## Creating a schema with nested types
//!
//! ```rust
//! use icecore::schema::{Schema, Field, DataType, StructType};
//!
//! let schema = Schema::new(0, vec![
//!     Field::optional(1, "user", DataType::Struct(StructType::new(vec![
//!         Field::required(2, "first_name", DataType::String),
//!         Field::required(3, "last_name", DataType::String),
//!     ]))),
//! ]);
//! assert_eq!(schema.max_field_id(), Some(3));
//! ```
//!
//! ## Evolving a schema
//!
//! Evolution never mutates in place:
//!
//! ```rust
//! use icecore::schema::{Schema, Field, DataType};
//!
//! let v1 = Schema::new(0, vec![Field::optional(1, "a", DataType::Integer)]);
//! let v2 = v1.add_field(1, Field::optional(2, "b", DataType::String)).unwrap();
//! assert_eq!(v1.num_fields(), 1);
//! assert_eq!(v2.num_fields(), 2);
//! ```
mod types;
mod field;
mod struct_type;
#[allow(clippy::module_inception)]
mod schema;

pub use self::types::{
    DataType, TypeKind, TimestampType, FixedType, DecimalType,
    ListType, MapType, decimal_required_bytes
};

pub use self::field::Field;

pub use self::struct_type::StructType;

pub use self::schema::{
    Schema, SchemaRef, SchemaBuilder, DEFAULT_SCHEMA_ID
};
