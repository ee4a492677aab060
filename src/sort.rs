//! Interface to Iceberg table ordering.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IcebergResult, IcebergError};
use crate::schema::SchemaRef;
use crate::transform::Transform;

/// The order id reserved for the unsorted order.
pub const UNSORTED_ORDER_ID: i32 = 0;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
/// Defines the sort order for a field.
pub enum SortDirection {
    /// Sort the field ascending.
    #[serde(rename = "asc")]
    Ascending,
    /// Sort the field descending.
    #[serde(rename = "desc")]
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "ASC"),
            SortDirection::Descending => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
/// Defines the sort order for nulls in a field.
pub enum NullOrder {
    #[serde(rename = "nulls-first")]
    /// Nulls sort before all non-null values.
    First,
    #[serde(rename = "nulls-last")]
    /// Nulls sort after all non-null values.
    Last,
}

impl fmt::Display for NullOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullOrder::First => write!(f, "NULLS_FIRST"),
            NullOrder::Last => write!(f, "NULLS_LAST"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone)]
#[serde(rename_all = "kebab-case")]
/// A source column, the transform producing its sort key and how keys are ordered.
pub struct SortField {
    /// A source column id from the table’s schema
    pub source_id: i32,
    /// A transform that is used to produce values to be sorted on from the source column.
    pub transform: Transform,
    /// A sort direction, that can only be either asc or desc
    pub direction: SortDirection,
    /// A null order that describes the order of null values when sorted.
    pub null_order: NullOrder,
}

impl SortField {
    pub fn new(
        source_id: i32,
        transform: Transform,
        direction: SortDirection,
        null_order: NullOrder
    ) -> Self {
        Self { source_id, transform, direction, null_order }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {} {}",
            self.transform, self.source_id, self.direction, self.null_order
        )
    }
}

/// A sort order is defined by a sort order id and a list of sort fields.
/// The order of the sort fields within the list defines the order in
/// which the sort is applied to the data.
///
/// Order id [`UNSORTED_ORDER_ID`] is reserved for the unsorted order, which is the
/// only order without fields.
#[derive(Debug, Clone)]
pub struct SortOrder {
    schema: SchemaRef,
    /// Identifier for SortOrder, order_id `0` is no sort order.
    order_id: i32,
    /// Details of the sort
    fields: Vec<SortField>,
}

impl SortOrder {
    /// Creates a new sort order for the given schema.
    ///
    /// # Errors
    ///
    /// [`IcebergError::SortOrderError`] is returned if `order_id` is
    /// [`UNSORTED_ORDER_ID`] but `fields` is not empty (or the reverse), or if a sort
    /// field references a field id that does not exist within the schema.
    ///
    /// [`IcebergError::TypeError`] is returned if a transform can't be applied to the
    /// type of its source field.
    pub fn try_new(
        schema: SchemaRef,
        order_id: i32,
        fields: Vec<SortField>
    ) -> IcebergResult<Self> {
        if (order_id == UNSORTED_ORDER_ID) != fields.is_empty() {
            tracing::debug!(order_id, num_fields = fields.len(), "invalid sort order id");
            return Err(IcebergError::SortOrderError {
                message: format!(
                    "sort order id {order_id} is invalid for a sort order with {} fields",
                    fields.len()
                )
            });
        }

        for field in &fields {
            match schema.field_by_id(field.source_id) {
                Some(source_field) => {
                    field.transform.checked_result_type(source_field.data_type())?;
                },
                None => {
                    return Err(IcebergError::SortOrderError {
                        message: format!(
                            "source field id {} not found in schema",
                            field.source_id
                        )
                    });
                }
            }
        }

        tracing::debug!(order_id, num_fields = fields.len(), "created sort order");

        Ok(Self { schema, order_id, fields })
    }

    /// Creates the unsorted order for `schema`.
    pub fn unsorted(schema: SchemaRef) -> Self {
        Self {
            schema,
            order_id: UNSORTED_ORDER_ID,
            fields: Vec::new(),
        }
    }

    pub fn order_id(&self) -> i32 {
        self.order_id
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    /// Returns the sort field at index `i`, if any.
    pub fn field(&self, i: usize) -> Option<&SortField> {
        self.fields.get(i)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn is_sorted(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn is_unsorted(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PartialEq for SortOrder {
    fn eq(&self, other: &Self) -> bool {
        self.order_id == other.order_id
            && self.fields == other.fields
            && self.schema == other.schema
    }
}

impl Eq for SortOrder {}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sort_order[{}]<", self.order_id)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, ">")
    }
}
