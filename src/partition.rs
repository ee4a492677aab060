//! Interface to Iceberg table partitions.
//!
//! A [`PartitionSpec`] describes how partition values are derived from the columns
//! of a [`Schema`]. Each [`PartitionField`] names a source column by id and the
//! [`Transform`] applied to it. The resulting partition tuple is described by
//! [`PartitionSpec::partition_type`].
//!
//! ```rust
//! use std::sync::Arc;
//! use icecore::partition::{PartitionField, PartitionSpec};
//! use icecore::schema::{DataType, Field, Schema};
//! use icecore::transform::Transform;
//!
//! let schema = Arc::new(Schema::new(0, vec![
//!     Field::required(1, "id", DataType::Long),
//!     Field::optional(2, "category", DataType::String),
//! ]));
//!
//! let spec = PartitionSpec::try_new(schema, 1, vec![
//!     PartitionField::new(2, 1000, "category_trunc", Transform::Truncate(4)),
//! ], 1000).unwrap();
//!
//! assert_eq!(spec.last_assigned_field_id(), 1000);
//! assert_eq!(
//!     spec.partition_type().unwrap().to_string(),
//!     "struct<1000: category_trunc: string>"
//! );
//! ```
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IcebergResult, IcebergError};
use crate::schema::{DataType, Field, Schema, SchemaRef, StructType};
use crate::transform::Transform;

/// The first field id assigned to partition fields by [`PartitionSpecBuilder`].
pub const PARTITION_DATA_ID_START: i32 = 1000;

/// The last assigned field id reported by a spec without partition fields.
pub const UNPARTITIONED_LAST_ASSIGNED_FIELD_ID: i32 = 999;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone)]
#[serde(rename_all = "kebab-case")]
/// Specification of a single partition field within a `PartitionSpec`.
pub struct PartitionField {
    /// A source column id from the table’s schema.
    pub source_id: i32,
    /// A partition field id that is used to identify a partition field and is unique
    /// within a partition spec.
    pub field_id: i32,
    /// A partition name.
    pub name: String,
    /// A transform that is applied to the source column to produce a partition value.
    pub transform: Transform,
}

impl PartitionField {
    pub fn new(
        source_id: i32,
        field_id: i32,
        name: impl Into<String>,
        transform: Transform
    ) -> Self {
        Self {
            source_id,
            field_id,
            name: name.into(),
            transform,
        }
    }
}

impl fmt::Display for PartitionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}({})",
            self.field_id, self.name, self.transform, self.source_id
        )
    }
}

/// Specification of table-level partitioning.
///
/// This struct defines how partition values are derived from the data fields of the
/// table. It is validated against its schema on construction, so every partition
/// field is known to reference a column that the transform can be applied to.
#[derive(Debug, Clone)]
pub struct PartitionSpec {
    schema: SchemaRef,
    /// Unique identifier for this partition spec within an Iceberg table.
    spec_id: i32,
    fields: Vec<PartitionField>,
    /// Indices into `fields` of the partition fields derived from each source id.
    by_source_id: HashMap<i32, Vec<usize>>,
    /// Lookup for the schema fields that partition fields may reference.
    source_by_id: HashMap<i32, Field>,
    /// Highest partition field id ever assigned in the table, including ids of
    /// fields dropped from later specs.
    last_assigned_field_id: i32,
}

impl PartitionSpec {
    /// Creates a new partition spec for the given schema.
    ///
    /// # Errors
    ///
    /// [`IcebergError::PartitionError`] is returned if the list of fields is invalid,
    /// or if its not applicable for the given schema, for example:
    /// * If there are duplicate partition field ids or names, or an empty name.
    /// * If one of the partition fields references a field that does not exist within
    ///   the schema, or that is nested inside a list or a map.
    ///
    /// * If `last_assigned_field_id` is lower than one of the partition field ids.
    ///
    /// [`IcebergError::TypeError`] is returned if a transform can't be applied to the
    /// type of its source field.
    pub fn try_new(
        schema: SchemaRef,
        spec_id: i32,
        fields: Vec<PartitionField>,
        last_assigned_field_id: i32
    ) -> IcebergResult<Self> {
        let mut uniq_id: HashSet<i32> = HashSet::new();
        let mut uniq_name: HashSet<&str> = HashSet::new();

        // Check correctness of all partition fields.
        for field in &fields {
            if !uniq_id.insert(field.field_id) {
                return Err(IcebergError::PartitionError {
                    message: format!(
                        "partition spec contains duplicate field id {}",
                        field.field_id
                    )
                });
            }

            if field.name.is_empty() {
                return Err(IcebergError::PartitionError {
                    message: "partition field has empty name".to_string()
                });
            }

            if !uniq_name.insert(field.name.as_str()) {
                return Err(IcebergError::PartitionError {
                    message: format!(
                        "partition spec contains duplicate field name '{}'",
                        field.name
                    )
                });
            }
        }

        if let Some(max_field_id) = fields.iter().map(|field| field.field_id).max() {
            if last_assigned_field_id < max_field_id {
                tracing::debug!(
                    last_assigned_field_id,
                    max_field_id,
                    "rejected last assigned partition field id"
                );
                return Err(IcebergError::PartitionError {
                    message: format!(
                        "last assigned field id {last_assigned_field_id} is lower than \
                         partition field id {max_field_id}"
                    )
                });
            }
        }

        let source_by_id = source_fields(&schema);

        // Ensure validity of the fields for the given schema.
        let mut by_source_id: HashMap<i32, Vec<usize>> = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            match source_by_id.get(&field.source_id) {
                Some(source_field) => {
                    // Fails if the transform can't be applied to the source field.
                    field.transform.checked_result_type(source_field.data_type())?;
                },
                None => {
                    tracing::debug!(
                        source_id = field.source_id,
                        partition_field = %field.name,
                        "partition source not found"
                    );
                    return Err(IcebergError::PartitionError {
                        message: format!(
                            "source field id {} not found in schema",
                            field.source_id
                        )
                    });
                }
            }
            by_source_id.entry(field.source_id).or_default().push(i);
        }

        tracing::debug!(spec_id, num_fields = fields.len(), "created partition spec");

        Ok(Self {
            schema,
            spec_id,
            fields,
            by_source_id,
            source_by_id,
            last_assigned_field_id,
        })
    }

    /// Creates a spec without partition fields for unpartitioned tables.
    pub fn unpartitioned(schema: SchemaRef) -> Self {
        Self {
            schema,
            spec_id: 0,
            fields: Vec::new(),
            by_source_id: HashMap::new(),
            source_by_id: HashMap::new(),
            last_assigned_field_id: UNPARTITIONED_LAST_ASSIGNED_FIELD_ID,
        }
    }

    /// Starts building a partition spec for `schema`, referencing source columns by
    /// name.
    pub fn builder(schema: SchemaRef) -> PartitionSpecBuilder {
        PartitionSpecBuilder::new(schema)
    }

    pub fn spec_id(&self) -> i32 {
        self.spec_id
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn fields(&self) -> &[PartitionField] {
        &self.fields
    }

    pub fn is_unpartitioned(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the partition fields derived from the schema field with id
    /// `source_id`, in partition order.
    pub fn fields_by_source_id(&self, source_id: i32) -> Vec<&PartitionField> {
        self.by_source_id
            .get(&source_id)
            .map(|indices| indices.iter().map(|&i| &self.fields[i]).collect())
            .unwrap_or_default()
    }

    /// Obtains the highest partition field id assigned so far.
    ///
    /// This may be higher than every `field_id` of this spec when fields were
    /// dropped from it. New partition fields must be assigned ids above it. A spec
    /// created by [`PartitionSpec::unpartitioned`] reports
    /// [`UNPARTITIONED_LAST_ASSIGNED_FIELD_ID`].
    pub fn last_assigned_field_id(&self) -> i32 {
        self.last_assigned_field_id
    }

    /// Returns the partition fields of this spec as a `StructType` with transforms
    /// applied to the source fields in the schema.
    ///
    /// Each [`PartitionField`] is converted to a [`Field`] with its name preserved,
    /// its `field_id` becoming the field's id, its type converted according to its
    /// transform and its nullability taken from the source field.
    ///
    /// Only the source field itself is considered: a required field nested in an
    /// optional struct yields a required partition field, even though its value is
    /// missing whenever the enclosing struct is null.
    pub fn partition_type(&self) -> IcebergResult<StructType> {
        let fields = self.fields
            .iter()
            .map(|field| -> IcebergResult<Field> {
                let source_field = self.source_by_id.get(&field.source_id)
                    .ok_or_else(|| IcebergError::PartitionError {
                        message: format!(
                            "source field id {} not found in schema",
                            field.source_id
                        )
                    })?;
                let result_type = field.transform.checked_result_type(
                    source_field.data_type()
                )?;

                Ok(Field::new(
                    field.field_id,
                    field.name.as_str(),
                    source_field.nullable(),
                    result_type
                ))
            })
            .collect::<IcebergResult<Vec<_>>>()?;

        Ok(StructType::new(fields))
    }
}

/// Specs are equal if they have the same id, the same fields in the same order and
/// equal schemas.
impl PartialEq for PartitionSpec {
    fn eq(&self, other: &Self) -> bool {
        self.spec_id == other.spec_id
            && self.fields == other.fields
            && self.last_assigned_field_id == other.last_assigned_field_id
            && self.schema == other.schema
    }
}

impl Eq for PartitionSpec {}

impl fmt::Display for PartitionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition_spec[{}]<", self.spec_id)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, ">")
    }
}

/// Builds a lookup map of the schema fields that can be partition sources.
///
/// Fields nested in structs are included, while fields nested in lists and maps
/// are not.
fn source_fields(schema: &Schema) -> HashMap<i32, Field> {
    // Temporary queue of fields to be processed.
    let mut queue: Vec<&Field> = schema.fields().iter().collect();
    let mut lookup: HashMap<i32, Field> = HashMap::new();

    while let Some(field) = queue.pop() {
        if let DataType::Struct(struct_type) = field.data_type() {
            queue.extend(struct_type.fields().iter());
        }
        lookup.insert(field.id(), field.clone());
    }

    lookup
}

/// Builder of [`PartitionSpec`] values that resolves source columns by name.
///
/// Partition field ids are assigned sequentially starting at
/// [`PARTITION_DATA_ID_START`], or right after the id given to
/// [`PartitionSpecBuilder::with_last_assigned_field_id`]. The first error encountered while adding fields is
/// reported by [`PartitionSpecBuilder::build`].
#[derive(Debug)]
pub struct PartitionSpecBuilder {
    schema: SchemaRef,
    spec_id: i32,
    fields: Vec<PartitionField>,
    last_assigned_field_id: i32,
    error: Option<IcebergError>,
}

impl PartitionSpecBuilder {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            spec_id: 0,
            fields: Vec::new(),
            last_assigned_field_id: PARTITION_DATA_ID_START - 1,
            error: None,
        }
    }

    pub fn with_spec_id(mut self, spec_id: i32) -> Self {
        self.spec_id = spec_id;
        self
    }

    /// Continues id assignment after `last_assigned_field_id`, typically the value
    /// reported by the previous spec of the table. Must be called before any field
    /// is added.
    pub fn with_last_assigned_field_id(mut self, last_assigned_field_id: i32) -> Self {
        self.last_assigned_field_id = last_assigned_field_id;
        self
    }

    /// Adds a partition field named `partition_name`, derived by applying
    /// `transform` to the top-level column named `source_name`.
    pub fn add_field(
        mut self,
        source_name: &str,
        partition_name: &str,
        transform: Transform
    ) -> Self {
        if self.error.is_some() {
            return self;
        }

        match self.schema.field_by_name(source_name) {
            Some(source) => {
                self.last_assigned_field_id += 1;
                let field_id = self.last_assigned_field_id;
                self.fields.push(PartitionField::new(
                    source.id(),
                    field_id,
                    partition_name,
                    transform
                ));
            },
            None => {
                self.error = Some(IcebergError::PartitionError {
                    message: format!(
                        "field named '{source_name}' not found or not unique in the schema"
                    )
                });
            }
        }

        self
    }

    pub fn build(self) -> IcebergResult<PartitionSpec> {
        if let Some(error) = self.error {
            return Err(error);
        }

        PartitionSpec::try_new(
            self.schema,
            self.spec_id,
            self.fields,
            self.last_assigned_field_id
        )
    }
}
