//! Named, identified and typed columns.

use std::fmt;

use crate::schema::DataType;

/// An Iceberg field: the combination of a name, an id, a data type and a
/// nullability flag.
///
/// Fields describe the columns of a [`Schema`](crate::schema::Schema) and the
/// children of nested types. A field is an immutable value; the `with_*` methods
/// return a modified copy.
#[derive(Debug, Clone)]
pub struct Field {
    /// Unique Id
    id: i32,
    /// Field Name
    name: String,
    /// Optional or required, meaning that values can (or can not) be null
    nullable: bool,
    /// Field can have any type
    data_type: DataType,
}

impl Field {
    pub fn new(
        id: i32,
        name: impl Into<String>,
        nullable: bool,
        data_type: DataType
    ) -> Self {
        Self {
            id,
            name: name.into(),
            nullable,
            data_type,
        }
    }

    /// Creates a new nullable `Field`.
    pub fn optional(id: i32, name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, name, true, data_type)
    }

    /// Creates a new non-nullable `Field`.
    pub fn required(id: i32, name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, name, false, data_type)
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns a copy of this field with the type replaced.
    pub fn with_type(&self, data_type: DataType) -> Self {
        Self { data_type, ..self.clone() }
    }

    /// Returns a copy of this field with the name replaced.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), ..self.clone() }
    }

    /// Returns a copy of this field with the id replaced.
    pub fn with_id(&self, id: i32) -> Self {
        Self { id, ..self.clone() }
    }

    /// Returns a copy of this field with the nullability replaced.
    pub fn with_nullable(&self, nullable: bool) -> Self {
        Self { nullable, ..self.clone() }
    }

    /// Returns an iterator on all recursively nested fields inside this field,
    /// including `self`, in depth-first order.
    ///
    /// Struct members, list elements and map keys and values are visited. The
    /// synthetic entries field of a map is skipped.
    pub fn all_fields(&self) -> Box<dyn Iterator<Item = &Self> + '_> {
        let iterator = std::iter::once(self);

        match self.data_type() {
            DataType::Struct(s) => {
                Box::new(iterator.chain(
                    s.fields()
                        .iter()
                        .flat_map(|field| field.all_fields())
                ))
            },
            DataType::List(l) => {
                Box::new(iterator.chain(
                    l.element_field().all_fields()
                ))
            },
            DataType::Map(m) => {
                Box::new(iterator.chain(
                    m.key_field().all_fields()
                ).chain(
                    m.value_field().all_fields()
                ))
            },
            _ => Box::new(iterator),
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }

        self.id == other.id
            && self.name == other.name
            && self.nullable == other.nullable
            && self.data_type == other.data_type
    }
}

impl Eq for Field {}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.id, self.name, self.data_type)?;
        if !self.nullable {
            write!(f, " not null")?;
        }
        Ok(())
    }
}
