//! Equivalence classes over quasi-identifiers.
//!
//! Rows sharing the exact same tuple of quasi-identifier values form one
//! class. The classes partition the row indices of the table.

use std::collections::HashMap;

use serde::Serialize;

use super::table::{CellKey, ColumnData, Table};
use crate::{PrivacyError, Result};

/// Tuple of quasi-identifier values, in quasi-identifier column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<CellKey>);

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// Rows sharing one quasi-identifier tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquivalenceClass {
    pub key: GroupKey,
    pub rows: Vec<usize>,
}

impl EquivalenceClass {
    #[must_use]
    pub fn size(&self) -> usize {
        self.rows.len()
    }
}

/// All equivalence classes of a table, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquivalenceClasses {
    quasi_identifiers: Vec<String>,
    classes: Vec<EquivalenceClass>,
    total_rows: usize,
}

impl EquivalenceClasses {
    /// Group the rows of `table` by the given quasi-identifier columns.
    ///
    /// Single pass over rows, hashing the tuple key. Missing quasi-identifier
    /// values group together as their own category.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for an empty quasi-identifier list and
    /// `InvalidColumn` for an unknown column.
    pub fn build<S: AsRef<str>>(table: &Table, quasi_identifiers: &[S]) -> Result<Self> {
        if quasi_identifiers.is_empty() {
            return Err(PrivacyError::InvalidParameter(
                "at least one quasi-identifier is required".to_string(),
            ));
        }

        let columns: Vec<&ColumnData> = quasi_identifiers
            .iter()
            .map(|name| table.column(name.as_ref()).map(|c| c.data()))
            .collect::<Result<_>>()?;

        let mut index: HashMap<GroupKey, usize> = HashMap::new();
        let mut classes: Vec<EquivalenceClass> = Vec::new();

        for row in 0..table.num_rows() {
            let key = GroupKey(columns.iter().map(|data| data.key_at(row)).collect());
            match index.get(&key) {
                Some(&slot) => classes[slot].rows.push(row),
                None => {
                    index.insert(key.clone(), classes.len());
                    classes.push(EquivalenceClass {
                        key,
                        rows: vec![row],
                    });
                }
            }
        }

        tracing::debug!(
            "Built {} equivalence classes over {} rows",
            classes.len(),
            table.num_rows()
        );

        Ok(Self {
            quasi_identifiers: quasi_identifiers
                .iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
            classes,
            total_rows: table.num_rows(),
        })
    }

    #[must_use]
    pub fn quasi_identifiers(&self) -> &[String] {
        &self.quasi_identifiers
    }

    #[must_use]
    pub fn classes(&self) -> &[EquivalenceClass] {
        &self.classes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EquivalenceClass> {
        self.classes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    #[must_use]
    pub fn smallest_class_size(&self) -> Option<usize> {
        self.classes.iter().map(EquivalenceClass::size).min()
    }
}

impl<'a> IntoIterator for &'a EquivalenceClasses {
    type Item = &'a EquivalenceClass;
    type IntoIter = std::slice::Iter<'a, EquivalenceClass>;

    fn into_iter(self) -> Self::IntoIter {
        self.classes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Column;

    fn sample_table() -> Table {
        Table::new(vec![
            Column::numeric("Age", [25.0, 30.0, 25.0, 30.0, 45.0]),
            Column::categorical("Gender", ["M", "F", "M", "F", "M"]),
            Column::categorical("Dx", ["Flu", "Flu", "Cold", "Cold", "Flu"]),
        ])
        .expect("Valid table")
    }

    #[test]
    fn test_grouping_in_first_appearance_order() {
        let classes = EquivalenceClasses::build(&sample_table(), &["Age", "Gender"])
            .expect("Classes should build");

        assert_eq!(classes.len(), 3);
        assert_eq!(classes.classes()[0].rows, vec![0, 2]);
        assert_eq!(classes.classes()[1].rows, vec![1, 3]);
        assert_eq!(classes.classes()[2].rows, vec![4]);
        assert_eq!(classes.classes()[0].key.to_string(), "(25, M)");
        assert_eq!(classes.smallest_class_size(), Some(1));
    }

    #[test]
    fn test_missing_values_form_their_own_group() {
        let table = Table::new(vec![Column::categorical_with_missing(
            "ZIP",
            [None, Some("94101".to_string()), None],
        )])
        .expect("Valid table");

        let classes = EquivalenceClasses::build(&table, &["ZIP"]).expect("Classes should build");
        assert_eq!(classes.len(), 2);
        assert_eq!(classes.classes()[0].key, GroupKey(vec![CellKey::Missing]));
        assert_eq!(classes.classes()[0].rows, vec![0, 2]);
    }

    #[test]
    fn test_unknown_quasi_identifier() {
        assert!(matches!(
            EquivalenceClasses::build(&sample_table(), &["ZIP"]),
            Err(PrivacyError::InvalidColumn(_))
        ));
    }

    #[test]
    fn test_empty_quasi_identifier_list() {
        let none: [&str; 0] = [];
        assert!(matches!(
            EquivalenceClasses::build(&sample_table(), &none),
            Err(PrivacyError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_empty_table_has_no_classes() {
        let table = Table::new(vec![Column::numeric("Age", Vec::<f64>::new())]).expect("Valid table");
        let classes = EquivalenceClasses::build(&table, &["Age"]).expect("Classes should build");
        assert!(classes.is_empty());
        assert_eq!(classes.total_rows(), 0);
        assert_eq!(classes.smallest_class_size(), None);
    }

    #[test]
    fn test_partition_covers_every_row_once() {
        let classes = EquivalenceClasses::build(&sample_table(), &["Dx"])
            .expect("Classes should build");
        let mut rows: Vec<usize> = classes.iter().flat_map(|c| c.rows.iter().copied()).collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
    }
}
