//! Implementation of Iceberg table schemas.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::{IcebergResult, IcebergError};
use crate::schema::{DataType, Field, ListType, MapType, StructType};

/// Schema id of schemas created without one, and of every schema produced by
/// [`Schema::add_field`], [`Schema::remove_field`] and [`Schema::set_field`].
pub const DEFAULT_SCHEMA_ID: i32 = 0;

/// Shared, read-only reference to a [`Schema`].
pub type SchemaRef = Arc<Schema>;

/// An Iceberg table schema: a versioned root struct of columns.
///
/// Name lookups only consider top-level columns and follow the rules of
/// [`StructType`] for duplicate names. Id lookups search the whole field tree.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Unique schema identifier.
    schema_id: i32,
    /// Top-level columns.
    fields: StructType,
}

impl Schema {
    pub fn new(schema_id: i32, fields: Vec<Field>) -> Self {
        Self::from_struct(schema_id, StructType::new(fields))
    }

    /// Wraps a struct as the root of a schema.
    pub fn from_struct(schema_id: i32, fields: StructType) -> Self {
        Self { schema_id, fields }
    }

    pub fn schema_id(&self) -> i32 {
        self.schema_id
    }

    /// Returns the root struct of this schema.
    pub fn as_struct(&self) -> &StructType {
        &self.fields
    }

    pub fn into_struct(self) -> StructType {
        self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.num_fields()
    }

    /// Returns the top-level field at index `i`, if any.
    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.field(i)
    }

    /// Returns a shared slice of the top-level fields in the schema.
    pub fn fields(&self) -> &[Field] {
        self.fields.fields()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields().iter().map(|f| f.name()).collect()
    }

    /// Finds a top-level field by its name. `None` if the name is missing or
    /// ambiguous.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.field_by_name(name)
    }

    pub fn all_fields_by_name(&self, name: &str) -> Vec<&Field> {
        self.fields.all_fields_by_name(name)
    }

    /// Index of the top-level field named `name`. `None` if the name is missing or
    /// ambiguous.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.field_index(name)
    }

    pub fn all_field_indices(&self, name: &str) -> Vec<usize> {
        self.fields.all_field_indices(name)
    }

    /// Checks that every name in `names` resolves to exactly one top-level field.
    ///
    /// # Errors
    ///
    /// [`IcebergError::SchemaError`] for the first name that is missing or
    /// ambiguous.
    pub fn can_reference_fields_by_names<S: AsRef<str>>(&self, names: &[S]) -> IcebergResult<()> {
        for name in names {
            let name = name.as_ref();
            if self.field_by_name(name).is_none() {
                return Err(IcebergError::SchemaError {
                    message: format!("field named '{name}' not found or not unique in the schema")
                });
            }
        }

        Ok(())
    }

    /// Returns an iterator on all recursively nested fields in the schema in a
    /// depth-first order.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields().iter()
            .flat_map(|field| field.all_fields())
    }

    /// Finds a field anywhere in the schema by its id.
    pub fn field_by_id(&self, id: i32) -> Option<&Field> {
        self.all_fields().find(|field| field.id() == id)
    }

    /// Highest field id in the schema, `None` for an empty schema.
    pub fn max_field_id(&self) -> Option<i32> {
        self.all_fields().map(|f| f.id()).max()
    }

    /// Returns a new schema with `field` inserted before top-level index `i`.
    ///
    /// The new schema has [`DEFAULT_SCHEMA_ID`].
    pub fn add_field(&self, i: usize, field: Field) -> IcebergResult<Self> {
        tracing::trace!(schema_id = self.schema_id, index = i, field = %field, "adding field");
        Ok(Self::from_struct(DEFAULT_SCHEMA_ID, self.fields.add_field(i, field)?))
    }

    /// Returns a new schema without the top-level field at index `i`.
    ///
    /// The new schema has [`DEFAULT_SCHEMA_ID`].
    pub fn remove_field(&self, i: usize) -> IcebergResult<Self> {
        tracing::trace!(schema_id = self.schema_id, index = i, "removing field");
        Ok(Self::from_struct(DEFAULT_SCHEMA_ID, self.fields.remove_field(i)?))
    }

    /// Returns a new schema with the top-level field at index `i` replaced.
    ///
    /// The new schema has [`DEFAULT_SCHEMA_ID`].
    pub fn set_field(&self, i: usize, field: Field) -> IcebergResult<Self> {
        tracing::trace!(schema_id = self.schema_id, index = i, field = %field, "setting field");
        Ok(Self::from_struct(DEFAULT_SCHEMA_ID, self.fields.set_field(i, field)?))
    }
}

/// Schemas are equal if their ids are equal and their fields are pairwise equal.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.schema_id == other.schema_id && self.fields == other.fields)
    }
}

impl Eq for Schema {}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "schema_id: {}", self.schema_id)?;
        write!(f, "{}", self.fields)
    }
}

/// Assigns field ids while a schema is assembled.
///
/// Every `new_*_field` call takes the next id from a counter shared by all fields
/// made from the same builder, including list elements and map keys and values.
/// Nested fields passed to [`SchemaBuilder::new_struct_field`] are created before
/// their parent, so they receive lower ids. Created fields are nullable; use
/// [`Field::with_nullable`] for required columns.
///
/// [`SchemaBuilder::from_schema`] continues numbering after the highest id of an
/// existing schema, so columns added to an evolved schema never reuse an id.
///
/// ```rust
/// use icecore::schema::{DataType, SchemaBuilder};
///
/// let mut builder = SchemaBuilder::new(0);
/// builder.add_fields(vec![
///     builder.new_int_field("id").with_nullable(false),
///     builder.new_struct_field("name", vec![
///         builder.new_string_field("first"),
///         builder.new_string_field("last"),
///     ]),
/// ]);
/// let v1 = builder.build();
/// assert_eq!(v1.field_by_name("name").map(|f| f.id()), Some(4));
///
/// let mut builder = SchemaBuilder::from_schema(1, &v1);
/// builder.add_field(builder.new_field("score", true, DataType::Double));
/// let v2 = builder.build();
/// assert_eq!(v2.field_by_name("score").map(|f| f.id()), Some(5));
/// assert_eq!(v2.num_fields(), 3);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    schema_id: i32,
    /// Last id handed out.
    last_field_id: Cell<i32>,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Starts an empty schema whose first field gets id 1.
    pub fn new(schema_id: i32) -> Self {
        Self {
            schema_id,
            last_field_id: Cell::new(0),
            fields: Vec::new(),
        }
    }

    /// Starts from the top-level columns of `schema`, assigning new ids above its
    /// highest field id.
    pub fn from_schema(schema_id: i32, schema: &Schema) -> Self {
        Self {
            schema_id,
            last_field_id: Cell::new(schema.max_field_id().unwrap_or(0)),
            fields: schema.fields().to_vec(),
        }
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn add_fields(&mut self, fields: Vec<Field>) {
        self.fields.extend(fields);
    }

    /// Highest id assigned so far.
    pub fn last_field_id(&self) -> i32 {
        self.last_field_id.get()
    }

    fn assign_id(&self) -> i32 {
        let id = self.last_field_id.get() + 1;
        self.last_field_id.set(id);
        id
    }

    pub fn new_field(&self, name: &str, nullable: bool, data_type: DataType) -> Field {
        Field::new(self.assign_id(), name, nullable, data_type)
    }

    pub fn new_primitive_field(&self, name: &str, data_type: DataType) -> Field {
        self.new_field(name, true, data_type)
    }

    pub fn new_boolean_field(&self, name: &str) -> Field {
        self.new_primitive_field(name, DataType::Boolean)
    }

    pub fn new_int_field(&self, name: &str) -> Field {
        self.new_primitive_field(name, DataType::Integer)
    }

    pub fn new_long_field(&self, name: &str) -> Field {
        self.new_primitive_field(name, DataType::Long)
    }

    pub fn new_double_field(&self, name: &str) -> Field {
        self.new_primitive_field(name, DataType::Double)
    }

    pub fn new_date_field(&self, name: &str) -> Field {
        self.new_primitive_field(name, DataType::Date)
    }

    pub fn new_timestamp_field(&self, name: &str) -> Field {
        self.new_primitive_field(name, DataType::timestamp())
    }

    pub fn new_string_field(&self, name: &str) -> Field {
        self.new_primitive_field(name, DataType::String)
    }

    /// A list column; the `item` element takes the id after the column's.
    pub fn new_list_field(&self, name: &str, element_type: DataType) -> Field {
        let id = self.assign_id();
        let element_id = self.assign_id();
        Field::optional(id, name, DataType::List(ListType::new(element_id, true, element_type)))
    }

    /// A map column; key and value take the two ids after the column's.
    pub fn new_map_field(
        &self,
        name: &str,
        key_type: DataType,
        value_type: DataType,
        value_nullable: bool
    ) -> Field {
        let id = self.assign_id();
        let key_id = self.assign_id();
        let value_id = self.assign_id();
        Field::optional(
            id,
            name,
            DataType::Map(MapType::new(key_id, key_type, value_id, value_nullable, value_type))
        )
    }

    pub fn new_struct_field(&self, name: &str, subfields: Vec<Field>) -> Field {
        self.new_field(name, true, DataType::Struct(StructType::new(subfields)))
    }

    /// Returns the schema assembled so far and clears the pending columns. The id
    /// counter keeps running.
    pub fn build(&mut self) -> Schema {
        tracing::trace!(
            schema_id = self.schema_id,
            last_field_id = self.last_field_id.get(),
            "built schema"
        );
        Schema::new(self.schema_id, std::mem::take(&mut self.fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_schema(schema_id: i32) -> Schema {
        Schema::new(schema_id, vec![
            Field::required(1, "id", DataType::Long),
            Field::optional(2, "ts", DataType::timestamp()),
            Field::optional(3, "users", DataType::List(ListType::new(
                4,
                false,
                DataType::Struct(StructType::new(vec![
                    Field::required(5, "first_name", DataType::String),
                    Field::required(6, "last_name", DataType::String),
                ]))
            ))),
            Field::optional(7, "props", DataType::Map(MapType::new(
                8,
                DataType::String,
                9,
                true,
                DataType::Double
            ))),
        ])
    }

    #[test]
    fn basics() {
        let f0 = Field::optional(1, "f0", DataType::Integer);
        let f1 = Field::required(2, "f1", DataType::Long);
        let f1_optional = Field::optional(2, "f1", DataType::Long);
        let f2 = Field::optional(3, "f2", DataType::Long);

        let schema = Schema::new(DEFAULT_SCHEMA_ID, vec![f0.clone(), f1.clone(), f2.clone()]);
        assert_eq!(schema.num_fields(), 3);
        assert_eq!(schema.field(0), Some(&f0));
        assert_eq!(schema.field(1), Some(&f1));
        assert_eq!(schema.field(2), Some(&f2));

        let schema2 = Schema::new(DEFAULT_SCHEMA_ID, vec![f0.clone(), f1, f2.clone()]);
        assert_eq!(schema, schema2);

        let schema3 = Schema::new(DEFAULT_SCHEMA_ID, vec![f0, f1_optional, f2]);
        assert_ne!(schema, schema3);

        assert_ne!(create_schema(0), create_schema(1));
    }

    #[test]
    fn to_string() {
        let schema = Schema::new(DEFAULT_SCHEMA_ID, vec![
            Field::optional(1, "f0", DataType::Integer),
            Field::required(2, "f1", DataType::Long),
            Field::optional(3, "f2", DataType::String),
            Field::optional(4, "f3", DataType::List(ListType::new(5, true, DataType::Integer))),
        ]);

        assert_eq!(
            schema.to_string(),
            "schema_id: 0\n\
             struct<1: f0: integer, 2: f1: long not null, 3: f2: string, \
             4: f3: list<5: item: integer>>"
        );
    }

    #[test]
    fn field_by_name() {
        let schema = create_schema(0);

        assert_eq!(schema.field_by_name("ts").map(|f| f.id()), Some(2));
        assert_eq!(schema.field_by_name("props").map(|f| f.id()), Some(7));
        // Only top-level fields are resolved by name.
        assert_eq!(schema.field_by_name("first_name"), None);
        assert_eq!(schema.field_by_name("not-found"), None);

        assert_eq!(schema.field_index("id"), Some(0));
        assert_eq!(schema.field_index("props"), Some(3));
        assert_eq!(schema.field_index("not-found"), None);
        assert_eq!(schema.field_names(), vec!["id", "ts", "users", "props"]);
    }

    #[test]
    fn duplicate_field_names() {
        let f0 = Field::optional(1, "f0", DataType::Integer);
        let f1 = Field::required(2, "f1", DataType::Uuid);
        let f2 = Field::optional(3, "f2", DataType::Binary);
        let f3 = Field::optional(4, "f1", DataType::List(ListType::new(5, true, DataType::Date)));

        let schema = Schema::new(0, vec![f0.clone(), f1.clone(), f2, f3.clone()]);

        assert_eq!(schema.field_index("f0"), Some(0));
        assert_eq!(schema.field_index("f1"), None);
        assert_eq!(schema.field_index("f2"), Some(2));
        assert_eq!(schema.field_index("not-found"), None);

        assert_eq!(schema.all_field_indices("f0"), vec![0]);
        assert_eq!(schema.all_field_indices("f1"), vec![1, 3]);

        assert_eq!(schema.all_fields_by_name("f0"), vec![&f0]);
        assert_eq!(schema.all_fields_by_name("f1"), vec![&f1, &f3]);
        assert!(schema.all_fields_by_name("not-found").is_empty());
    }

    #[test]
    fn can_reference_fields_by_names() {
        let schema = Schema::new(0, vec![
            Field::optional(1, "f0", DataType::Integer),
            Field::required(2, "f1", DataType::Uuid),
            Field::optional(3, "f2", DataType::Binary),
            Field::optional(4, "f1", DataType::Date),
        ]);

        assert!(schema.can_reference_fields_by_names(&["f0", "f2"]).is_ok());
        assert!(schema.can_reference_fields_by_names(&["f2", "f0"]).is_ok());
        assert!(schema.can_reference_fields_by_names::<&str>(&[]).is_ok());

        let err = schema.can_reference_fields_by_names(&["f0", "f1"]).unwrap_err();
        assert!(matches!(err, IcebergError::SchemaError { .. }));
        assert!(err.to_string().contains("'f1'"));

        let err = schema
            .can_reference_fields_by_names(&["missing".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("'missing'"));
    }

    #[test]
    fn mutations_reset_schema_id() {
        let schema = create_schema(5);
        let new_field = Field::optional(10, "extra", DataType::Boolean);

        let added = schema.add_field(4, new_field.clone()).unwrap();
        assert_eq!(added.schema_id(), DEFAULT_SCHEMA_ID);
        assert_eq!(added.num_fields(), 5);
        assert_eq!(added.field(4), Some(&new_field));
        assert_eq!(&added.fields()[..4], schema.fields());

        let removed = schema.remove_field(0).unwrap();
        assert_eq!(removed.schema_id(), DEFAULT_SCHEMA_ID);
        assert_eq!(removed.fields(), &schema.fields()[1..]);

        let set = schema.set_field(1, new_field.clone()).unwrap();
        assert_eq!(set.field(0), schema.field(0));
        assert_eq!(set.field(1), Some(&new_field));
        assert_eq!(set.field(2), schema.field(2));

        assert_eq!(schema, create_schema(5));
    }

    #[test]
    fn mutations_out_of_bounds() {
        let schema = create_schema(0);
        let field = Field::optional(10, "extra", DataType::Boolean);

        assert!(matches!(
            schema.add_field(5, field.clone()),
            Err(IcebergError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            schema.remove_field(4),
            Err(IcebergError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            schema.set_field(4, field),
            Err(IcebergError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn struct_round_trip() {
        let schema = create_schema(3);
        let rebuilt = Schema::from_struct(schema.schema_id(), schema.as_struct().clone());
        assert_eq!(rebuilt, schema);

        let rebuilt = Schema::new(3, schema.clone().into_struct().into_fields());
        assert_eq!(rebuilt.num_fields(), schema.num_fields());
        assert_eq!(rebuilt, schema);
    }

    #[test]
    fn max_field_id() {
        assert_eq!(create_schema(0).max_field_id(), Some(9));
        assert_eq!(Schema::new(0, vec![]).max_field_id(), None);
    }

    #[test]
    fn field_by_id() {
        let schema = create_schema(0);
        assert_eq!(schema.field_by_id(6).map(|f| f.name()), Some("last_name"));
        assert_eq!(schema.field_by_id(9).map(|f| f.name()), Some("value"));
        assert_eq!(schema.field_by_id(100), None);
    }

    #[test]
    fn all_fields() {
        let schema = create_schema(0);
        let all_fields = schema.all_fields().collect::<Vec<_>>();

        assert_eq!(all_fields[0].id(), 1);
        assert_eq!(all_fields[0].name(), "id");
        assert!(all_fields[0].data_type().is_primitive());

        assert_eq!(all_fields[3].id(), 4);
        assert_eq!(all_fields[3].name(), "item");
        assert!(all_fields[3].data_type().is_struct());

        assert_eq!(all_fields[4].id(), 5);
        assert_eq!(all_fields[4].name(), "first_name");
        assert_eq!(all_fields.len(), 9);
    }

    #[test]
    fn builder_assigns_ids() {
        let mut builder = SchemaBuilder::new(2);
        builder.add_fields(vec![
            builder.new_long_field("id").with_nullable(false),
            builder.new_list_field("tags", DataType::String),
            builder.new_map_field("props", DataType::String, DataType::Double, true),
        ]);
        builder.add_field(builder.new_date_field("day"));
        let schema = builder.build();

        assert_eq!(schema.schema_id(), 2);
        let ids: Vec<i32> = schema.all_fields().map(|f| f.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(!schema.fields()[0].nullable());
        assert!(schema.fields()[1].nullable());
        assert_eq!(builder.last_field_id(), 7);
    }

    #[test]
    fn builder_continues_existing_schema() {
        let schema = create_schema(3);
        let max_field_id = schema.max_field_id().unwrap();

        let mut builder = SchemaBuilder::from_schema(4, &schema);
        builder.add_field(builder.new_list_field("scores", DataType::Double));
        let evolved = builder.build();

        assert_eq!(evolved.schema_id(), 4);
        assert_eq!(evolved.num_fields(), schema.num_fields() + 1);
        assert_eq!(&evolved.fields()[..schema.num_fields()], schema.fields());

        let scores = evolved.field_by_name("scores").unwrap();
        assert_eq!(scores.id(), max_field_id + 1);
        assert_eq!(scores.all_fields().last().map(|f| f.id()), Some(max_field_id + 2));
    }

    #[test]
    fn thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Schema>();
        assert_send_sync::<SchemaRef>();
    }
}
