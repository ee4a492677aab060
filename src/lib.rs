//! Logical type and schema model for Apache Iceberg tables.
//!
//! [Apache Iceberg](https://iceberg.apache.org/) is an open table format for huge
//! analytic tables on data lakes.
//!
//! This crate provides the in-memory model that table metadata is built on:
//! the closed set of Iceberg data types ([`schema::DataType`]), identified fields
//! ([`schema::Field`]), versioned schemas ([`schema::Schema`]) and the transform
//! layer used to derive partition and sort keys from a schema
//! ([`transform::Transform`], [`partition::PartitionSpec`], [`sort::SortOrder`]).
//!
//! Every value in this crate is immutable once constructed. Operations that evolve
//! a struct or a schema return a new value and leave the receiver untouched.
//!
//! ## Deriving a partition type
//!
//! ```rust
//! use std::sync::Arc;
//! use icecore::IcebergResult;
//! use icecore::schema::SchemaBuilder;
//! use icecore::partition::PartitionSpec;
//! use icecore::transform::Transform;
//!
//! fn main() -> IcebergResult<()> {
//!     let mut schema_builder = SchemaBuilder::new(0);
//!     schema_builder.add_fields(vec![
//!         schema_builder.new_long_field("id").with_nullable(false),
//!         schema_builder.new_string_field("user_id"),
//!         schema_builder.new_timestamp_field("ts"),
//!     ]);
//!     let schema = Arc::new(schema_builder.build());
//!
//!     let spec = PartitionSpec::builder(schema)
//!         .add_field("user_id", "user_bucket", Transform::Bucket(16))
//!         .add_field("ts", "ts_day", Transform::Day)
//!         .build()?;
//!
//!     let partition_type = spec.partition_type()?;
//!     assert_eq!(
//!         partition_type.to_string(),
//!         "struct<1000: user_bucket: integer, 1001: ts_day: date[day]>"
//!     );
//!     Ok(())
//! }
//! ```
pub mod schema;
pub mod transform;
pub mod partition;
pub mod sort;

/// A result type returned by functions in this crate.
pub type IcebergResult<T> = Result<T, IcebergError>;

/// Coarse classification of an [`IcebergError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad index, out-of-range width or precision, missing or ambiguous name.
    InvalidArgument,
    /// A transform or container that does not accept the given type.
    TypeMismatch,
}

/// An error returned by the type, schema and partitioning model.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IcebergError {
    /// An argument was outside the domain accepted by a constructor.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A positional field operation was given an index outside its valid range.
    #[error("Invalid column index {index} to {operation} field (struct has {len} fields)")]
    IndexOutOfBounds {
        operation: &'static str,
        index: usize,
        len: usize,
    },

    /// A type was used where its kind is not accepted, for example a nullable
    /// map entries field.
    #[error("Type error: {message}")]
    TypeError { message: String },

    /// A field could not be resolved unambiguously in a schema.
    #[error("Schema error: {message}")]
    SchemaError { message: String },

    /// A partition spec is invalid for its schema.
    #[error("Partition error: {message}")]
    PartitionError { message: String },

    /// A sort order is invalid for its schema.
    #[error("Sort order error: {message}")]
    SortOrderError { message: String },
}

impl IcebergError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IcebergError::TypeError { .. } => ErrorKind::TypeMismatch,
            IcebergError::InvalidArgument { .. }
            | IcebergError::IndexOutOfBounds { .. }
            | IcebergError::SchemaError { .. }
            | IcebergError::PartitionError { .. }
            | IcebergError::SortOrderError { .. } => ErrorKind::InvalidArgument,
        }
    }
}
