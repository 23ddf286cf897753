//! Schema introspection for SQLite via `sqlite_master` and `PRAGMA`s.

use sqldispatch_core::{
    ColumnDescription, Executor, IndexInfo, IntrospectionBackend, Relation, Result, quote_ident,
};

/// Introspection submodule of the `sqlite3` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteIntrospection;

impl IntrospectionBackend for SqliteIntrospection {
    fn table_names(&self, conn: &mut dyn Executor) -> Result<Vec<String>> {
        let rows = conn.query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
            &[],
        )?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get_named::<String>("name").ok())
            .collect())
    }

    fn table_description(
        &self,
        conn: &mut dyn Executor,
        table: &str,
    ) -> Result<Vec<ColumnDescription>> {
        let sql = format!("PRAGMA table_info({})", quote_ident(table));
        let rows = conn.query(&sql, &[])?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.get_named::<String>("name").ok()?;
                let sql_type = row.get_named::<String>("type").ok().unwrap_or_default();
                let notnull = row.get_named::<i64>("notnull").ok().unwrap_or(0);
                let pk = row.get_named::<i64>("pk").ok().unwrap_or(0);
                Some(ColumnDescription {
                    name,
                    sql_type,
                    nullable: notnull == 0,
                    default: row.get_named::<Option<String>>("dflt_value").ok().flatten(),
                    primary_key: pk > 0,
                })
            })
            .collect())
    }

    fn indexes(&self, conn: &mut dyn Executor, table: &str) -> Result<Vec<IndexInfo>> {
        let sql = format!("PRAGMA index_list({})", quote_ident(table));
        let rows = conn.query(&sql, &[])?;

        let mut indexes = Vec::new();
        for row in &rows {
            let Ok(name) = row.get_named::<String>("name") else {
                continue;
            };
            let unique = row.get_named::<i64>("unique").ok().unwrap_or(0) == 1;
            let origin = row.get_named::<String>("origin").ok().unwrap_or_default();

            let info_sql = format!("PRAGMA index_info({})", quote_ident(&name));
            let columns = conn
                .query(&info_sql, &[])?
                .iter()
                .filter_map(|r| r.get_named::<String>("name").ok())
                .collect();

            indexes.push(IndexInfo {
                name,
                columns,
                unique,
                primary: origin == "pk",
            });
        }

        // Rowid aliases (INTEGER PRIMARY KEY) have no index of their own
        if !indexes.iter().any(|i| i.primary) {
            let pk: Vec<String> = self
                .table_description(conn, table)?
                .into_iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name)
                .collect();
            if !pk.is_empty() {
                indexes.push(IndexInfo {
                    name: format!("{table}_pkey"),
                    columns: pk,
                    unique: true,
                    primary: true,
                });
            }
        }
        Ok(indexes)
    }

    fn relations(&self, conn: &mut dyn Executor, table: &str) -> Result<Vec<Relation>> {
        let sql = format!("PRAGMA foreign_key_list({})", quote_ident(table));
        let rows = conn.query(&sql, &[])?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                let foreign_table = row.get_named::<String>("table").ok()?;
                let column = row.get_named::<String>("from").ok()?;
                // A NULL "to" references the parent's primary key
                let foreign_column = row
                    .get_named::<Option<String>>("to")
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| "id".to_string());
                let on_delete = row.get_named::<String>("on_delete").ok();
                Some(Relation {
                    column,
                    foreign_table,
                    foreign_column,
                    on_delete: on_delete.filter(|s| s != "NO ACTION"),
                })
            })
            .collect())
    }

    fn field_kind(&self, sql_type: &str) -> Option<&'static str> {
        field_kind_for(sql_type)
    }
}

/// Reverse type mapping. Case-insensitive; a length suffix such as
/// `varchar(30)` is ignored.
pub fn field_kind_for(sql_type: &str) -> Option<&'static str> {
    let lower = sql_type.trim().to_lowercase();
    let base = lower.split('(').next().unwrap_or_default().trim();
    let kind = match base {
        "bool" | "boolean" => "BooleanField",
        "smallint" | "smallinteger" => "SmallIntegerField",
        "smallint unsigned" => "PositiveSmallIntegerField",
        "int" | "integer" | "bigint" => "IntegerField",
        "integer unsigned" => "PositiveIntegerField",
        "decimal" | "numeric" => "DecimalField",
        "real" | "float" | "double" => "FloatField",
        "text" | "clob" => "TextField",
        "char" | "varchar" => "CharField",
        "date" => "DateField",
        "datetime" | "timestamp" => "DateTimeField",
        "time" => "TimeField",
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteConnection;

    fn schema() -> SqliteConnection {
        let mut conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw(
            "CREATE TABLE author (
                 id INTEGER PRIMARY KEY,
                 name varchar(50) NOT NULL,
                 email varchar(75) UNIQUE
             );
             CREATE TABLE book (
                 id INTEGER PRIMARY KEY,
                 title varchar(100) NOT NULL DEFAULT 'untitled',
                 author_id integer REFERENCES author (id) ON DELETE CASCADE,
                 editor_id integer REFERENCES author
             );
             CREATE INDEX book_title ON book (title);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_table_names_sorted() {
        let mut conn = schema();
        let names = SqliteIntrospection.table_names(&mut conn).unwrap();
        assert_eq!(names, vec!["author", "book"]);
    }

    #[test]
    fn test_table_description() {
        let mut conn = schema();
        let columns = SqliteIntrospection
            .table_description(&mut conn, "book")
            .unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "title", "author_id", "editor_id"]);

        assert!(columns[0].primary_key);
        let title = &columns[1];
        assert!(!title.nullable);
        assert_eq!(title.max_length(), Some(100));
        assert_eq!(title.default.as_deref(), Some("'untitled'"));
        assert!(columns[2].nullable);
    }

    #[test]
    fn test_indexes() {
        let mut conn = schema();
        let indexes = SqliteIntrospection.indexes(&mut conn, "book").unwrap();

        let title = indexes.iter().find(|i| i.name == "book_title").unwrap();
        assert_eq!(title.columns, vec!["title"]);
        assert!(!title.unique);

        let pk = indexes.iter().find(|i| i.primary).unwrap();
        assert_eq!(pk.columns, vec!["id"]);

        let author = SqliteIntrospection.indexes(&mut conn, "author").unwrap();
        assert!(
            author
                .iter()
                .any(|i| i.unique && !i.primary && i.columns == vec!["email"])
        );
    }

    #[test]
    fn test_relations() {
        let mut conn = schema();
        let mut relations = SqliteIntrospection.relations(&mut conn, "book").unwrap();
        relations.sort_by(|a, b| a.column.cmp(&b.column));

        assert_eq!(relations.len(), 2);
        assert_eq!(relations[0].column, "author_id");
        assert_eq!(relations[0].foreign_table, "author");
        assert_eq!(relations[0].foreign_column, "id");
        assert_eq!(relations[0].on_delete.as_deref(), Some("CASCADE"));
        assert_eq!(relations[1].column, "editor_id");
        assert_eq!(relations[1].on_delete, None);
    }

    #[test]
    fn test_field_kind_mapping() {
        assert_eq!(field_kind_for("varchar(30)"), Some("CharField"));
        assert_eq!(field_kind_for("INTEGER"), Some("IntegerField"));
        assert_eq!(
            field_kind_for("integer unsigned"),
            Some("PositiveIntegerField")
        );
        assert_eq!(field_kind_for("datetime"), Some("DateTimeField"));
        assert_eq!(field_kind_for("geometry"), None);
    }
}
