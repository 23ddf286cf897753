//! Result types returned by introspection backends.

use serde::Serialize;

/// One column of an introspected table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    /// Column name
    pub name: String,
    /// SQL type as reported by the database
    pub sql_type: String,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Default value expression
    pub default: Option<String>,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
}

impl ColumnDescription {
    /// Length parameter of the type, e.g. `30` for `varchar(30)`.
    pub fn max_length(&self) -> Option<u32> {
        let open = self.sql_type.find('(')?;
        let close = self.sql_type[open..].find(')')? + open;
        self.sql_type[open + 1..close]
            .split(',')
            .next()
            .and_then(|n| n.trim().parse().ok())
    }

    /// Type name without its length parameter, lowercased.
    pub fn base_type(&self) -> String {
        let base = match self.sql_type.find('(') {
            Some(i) => &self.sql_type[..i],
            None => self.sql_type.as_str(),
        };
        base.trim().to_lowercase()
    }
}

/// An index on an introspected table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    /// Index name
    pub name: String,
    /// Indexed columns, in index order
    pub columns: Vec<String>,
    /// Whether this is a unique index
    pub unique: bool,
    /// Whether this index backs the primary key
    pub primary: bool,
}

/// A foreign key from one column to a column of another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    /// Local column
    pub column: String,
    /// Referenced table
    pub foreign_table: String,
    /// Referenced column
    pub foreign_column: String,
    /// ON DELETE action, when not the default
    pub on_delete: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(sql_type: &str) -> ColumnDescription {
        ColumnDescription {
            name: "c".into(),
            sql_type: sql_type.into(),
            nullable: true,
            default: None,
            primary_key: false,
        }
    }

    #[test]
    fn test_max_length_parsing() {
        assert_eq!(column("varchar(30)").max_length(), Some(30));
        assert_eq!(column("decimal(10, 2)").max_length(), Some(10));
        assert_eq!(column("integer").max_length(), None);
    }

    #[test]
    fn test_base_type() {
        assert_eq!(column("VARCHAR(30)").base_type(), "varchar");
        assert_eq!(column("text").base_type(), "text");
    }
}
