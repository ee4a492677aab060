//! The struct type and its name index.

use std::collections::HashMap;
use std::fmt;

use crate::{IcebergResult, IcebergError};
use crate::schema::Field;

/// A complex field type that contains a tuple of nested fields.
///
/// Each nested field in the struct is named and has an integer id that is unique in
/// the table schema. Duplicate names are allowed, but a duplicated name can not be
/// resolved to a single field: [`StructType::field_by_name`] and
/// [`StructType::field_index`] treat it as not found, while
/// [`StructType::all_fields_by_name`] and [`StructType::all_field_indices`] return
/// every match.
///
/// A struct is immutable. [`StructType::add_field`], [`StructType::remove_field`] and
/// [`StructType::set_field`] return a new struct and leave `self` untouched.
#[derive(Debug, Clone)]
pub struct StructType {
    fields: Vec<Field>,
    /// Indices of the fields having each name, in ascending order.
    name_to_index: HashMap<String, Vec<usize>>,
}

impl StructType {
    pub fn new(fields: Vec<Field>) -> Self {
        let mut name_to_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, field) in fields.iter().enumerate() {
            name_to_index.entry(field.name().to_string()).or_default().push(i);
        }

        Self { fields, name_to_index }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the field at index `i`, if any.
    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    /// Returns the field named `name`, or `None` if there is no such field or more
    /// than one.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.field_index(name).map(|i| &self.fields[i])
    }

    /// Returns the index of the field named `name`, or `None` if there is no such
    /// field or more than one.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        match self.name_to_index.get(name).map(Vec::as_slice) {
            Some(&[index]) => Some(index),
            // Not found or duplicate name
            _ => None,
        }
    }

    /// Returns all fields named `name` in their original order.
    pub fn all_fields_by_name(&self, name: &str) -> Vec<&Field> {
        self.all_field_indices(name)
            .into_iter()
            .map(|i| &self.fields[i])
            .collect()
    }

    /// Returns the indices of all fields named `name` in ascending order.
    pub fn all_field_indices(&self, name: &str) -> Vec<usize> {
        self.name_to_index.get(name).cloned().unwrap_or_default()
    }

    /// Returns a new struct with `field` inserted before index `i`.
    ///
    /// # Errors
    ///
    /// [`IcebergError::IndexOutOfBounds`] if `i` is not in `[0, num_fields]`.
    pub fn add_field(&self, i: usize, field: Field) -> IcebergResult<Self> {
        if i > self.fields.len() {
            return Err(self.index_error("add", i));
        }

        let mut fields = Vec::with_capacity(self.fields.len() + 1);
        fields.extend_from_slice(&self.fields[..i]);
        fields.push(field);
        fields.extend_from_slice(&self.fields[i..]);
        Ok(Self::new(fields))
    }

    /// Returns a new struct without the field at index `i`.
    ///
    /// # Errors
    ///
    /// [`IcebergError::IndexOutOfBounds`] if `i` is not in `[0, num_fields)`.
    pub fn remove_field(&self, i: usize) -> IcebergResult<Self> {
        if i >= self.fields.len() {
            return Err(self.index_error("remove", i));
        }

        let fields = self.fields
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, field)| field.clone())
            .collect();
        Ok(Self::new(fields))
    }

    /// Returns a new struct with the field at index `i` replaced by `field`.
    ///
    /// # Errors
    ///
    /// [`IcebergError::IndexOutOfBounds`] if `i` is not in `[0, num_fields)`.
    pub fn set_field(&self, i: usize, field: Field) -> IcebergResult<Self> {
        if i >= self.fields.len() {
            return Err(self.index_error("set", i));
        }

        let mut fields = self.fields.clone();
        fields[i] = field;
        Ok(Self::new(fields))
    }

    fn index_error(&self, operation: &'static str, index: usize) -> IcebergError {
        tracing::debug!(operation, index, len = self.fields.len(), "invalid field index");
        IcebergError::IndexOutOfBounds {
            operation,
            index,
            len: self.fields.len(),
        }
    }
}

/// Structs are equal if their fields are pairwise equal, in order.
impl PartialEq for StructType {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for StructType {}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "struct<")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;

    fn fields() -> Vec<Field> {
        vec![
            Field::optional(1, "f0", DataType::Integer),
            Field::optional(2, "f1", DataType::String),
            Field::optional(3, "f2", DataType::Long),
        ]
    }

    #[test]
    fn struct_type() {
        let fields = fields();
        let struct_type = StructType::new(fields.clone());

        assert_eq!(struct_type.field(0), Some(&fields[0]));
        assert_eq!(struct_type.field(1), Some(&fields[1]));
        assert_eq!(struct_type.field(2), Some(&fields[2]));
        assert_eq!(struct_type.field(3), None);

        assert_eq!(
            struct_type.to_string(),
            "struct<1: f0: integer, 2: f1: string, 3: f2: long>"
        );

        assert_eq!(struct_type.field_by_name("f1"), Some(&fields[1]));
        assert_eq!(struct_type.field_by_name("f2"), Some(&fields[2]));
        assert_eq!(struct_type.field_by_name("not-found"), None);

        assert_eq!(struct_type.field_index("f0"), Some(0));
        assert_eq!(struct_type.field_index("f1"), Some(1));
        assert_eq!(struct_type.field_index("f2"), Some(2));
    }

    #[test]
    fn empty_struct() {
        let struct_type = StructType::new(vec![]);
        assert_eq!(struct_type.to_string(), "struct<>");
        assert_eq!(struct_type.num_fields(), 0);
        assert!(struct_type.all_field_indices("a").is_empty());
    }

    #[test]
    fn equality_is_order_sensitive() {
        let f = fields();
        let forward = StructType::new(vec![f[0].clone(), f[1].clone()]);
        let backward = StructType::new(vec![f[1].clone(), f[0].clone()]);

        assert_ne!(forward, backward);
        assert_eq!(forward, StructType::new(vec![f[0].clone(), f[1].clone()]));
        assert_ne!(forward, StructType::new(vec![f[0].clone()]));
    }

    #[test]
    fn duplicate_names() {
        let mut fields = fields();
        fields.push(Field::optional(4, "f1", DataType::Date));
        let struct_type = StructType::new(fields);

        assert_eq!(struct_type.field_index("f1"), None);
        assert_eq!(struct_type.field_by_name("f1"), None);
        assert_eq!(struct_type.all_field_indices("f1"), vec![1, 3]);

        let all: Vec<i32> = struct_type.all_fields_by_name("f1").iter().map(|f| f.id()).collect();
        assert_eq!(all, vec![2, 4]);

        assert_eq!(struct_type.field_index("f2"), Some(2));
    }

    #[test]
    fn add_field() {
        let original = StructType::new(fields());
        let new_field = Field::optional(9, "new", DataType::Boolean);

        let front = original.add_field(0, new_field.clone()).unwrap();
        assert_eq!(front.field(0), Some(&new_field));
        assert_eq!(front.field_index("f0"), Some(1));

        let back = original.add_field(3, new_field.clone()).unwrap();
        assert_eq!(back.field(3), Some(&new_field));
        assert_eq!(back.field_index("new"), Some(3));

        assert!(matches!(
            original.add_field(4, new_field),
            Err(IcebergError::IndexOutOfBounds { operation: "add", index: 4, len: 3 })
        ));

        assert_eq!(original, StructType::new(fields()));
    }

    #[test]
    fn remove_field() {
        let original = StructType::new(fields());

        let removed = original.remove_field(1).unwrap();
        assert_eq!(removed.num_fields(), 2);
        assert_eq!(removed.field_index("f1"), None);
        assert_eq!(removed.field_index("f2"), Some(1));
        assert_eq!(removed.fields(), &[fields()[0].clone(), fields()[2].clone()]);

        assert!(matches!(
            original.remove_field(3),
            Err(IcebergError::IndexOutOfBounds { operation: "remove", .. })
        ));
        assert_eq!(original.num_fields(), 3);
    }

    #[test]
    fn set_field() {
        let original = StructType::new(fields());
        let replacement = Field::required(7, "renamed", DataType::Double);

        let updated = original.set_field(2, replacement.clone()).unwrap();
        assert_eq!(updated.field(2), Some(&replacement));
        assert_eq!(updated.field_index("f2"), None);
        assert_eq!(updated.field_index("renamed"), Some(2));
        assert_eq!(updated.field(0), original.field(0));
        assert_eq!(updated.field(1), original.field(1));

        assert!(matches!(
            original.set_field(3, replacement),
            Err(IcebergError::IndexOutOfBounds { operation: "set", .. })
        ));
    }
}
