//! Semantic pass: statement AST to Schema.
//!
//! Tables and columns are registered as statements arrive. Table-level and
//! ALTER TABLE constraints are either applied on the spot
//! ([`Resolution::SourceOrder`]) or queued and applied once every table is
//! known ([`Resolution::Deferred`]).

use serde::{Deserialize, Serialize};

use super::ast::{
    AlterTable, Clause, ColumnDef, CreateTable, Reference, Statement, TableConstraint,
};
use crate::model::{Column, ForeignKeyRef, Schema, Table};

/// When table-level and ALTER TABLE constraints are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    /// Resolve against the complete set of tables after the whole script is read.
    #[default]
    Deferred,
    /// Resolve against what has been defined so far; constraints naming
    /// later columns or tables are dropped.
    SourceOrder,
}

/// A constraint waiting to be applied to `table`.
#[derive(Debug)]
struct Pending {
    table: String,
    constraint: TableConstraint,
    /// Set for constraints that came from the table's own CREATE statement
    from_create: bool,
}

pub struct Linker {
    resolution: Resolution,
    tables: Vec<Table>,
    pending: Vec<Pending>,
}

impl Linker {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            tables: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn add_statement(&mut self, statement: Statement) {
        match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::AlterTable(alter) => self.alter_table(alter),
        }
    }

    /// Apply queued constraints and return the finished schema.
    pub fn finish(mut self) -> Schema {
        let mut pending = std::mem::take(&mut self.pending);
        // Primary keys first: REFERENCES without a column list reads them
        pending.sort_by_key(|p| !is_primary_key(&p.constraint));
        for pending in pending {
            self.apply(&pending.table, &pending.constraint);
        }
        Schema::new(self.tables)
    }

    fn create_table(&mut self, create: CreateTable) {
        let CreateTable {
            name,
            if_not_exists,
            clauses,
        } = create;

        match self.tables.iter().position(|t| t.name == name) {
            Some(_) if if_not_exists => {
                tracing::debug!(table = %name, "IF NOT EXISTS keeps the first definition");
                return;
            }
            Some(index) => {
                tracing::debug!(table = %name, "table redefined, replacing earlier definition");
                self.tables[index] = Table::new(name.clone());
                self.pending.retain(|p| !(p.from_create && p.table == name));
            }
            None => self.tables.push(Table::new(name.clone())),
        }

        for clause in clauses {
            match clause {
                Clause::Column(def) => self.add_column(&name, def),
                Clause::Constraint(constraint) => self.submit(&name, constraint, true),
                Clause::Index | Clause::Check => {}
                Clause::Other => {
                    tracing::debug!(table = %name, "dropping unrecognized clause");
                }
            }
        }
    }

    fn alter_table(&mut self, alter: AlterTable) {
        for constraint in alter.constraints {
            self.submit(&alter.name, constraint, false);
        }
    }

    fn add_column(&mut self, table_name: &str, def: ColumnDef) {
        let Some(table) = self.table_mut(table_name) else {
            return;
        };
        if table.column(&def.name).is_some() {
            tracing::debug!(table = %table_name, column = %def.name, "duplicate column ignored");
            return;
        }

        let mut column = Column::new(def.name.clone(), def.data_type);
        column.nullable = !def.not_null;
        column.unique = def.unique;
        column.set_primary_key(def.primary_key);
        table.columns.push(column);

        if let Some(reference) = def.references {
            let constraint = TableConstraint::ForeignKey {
                columns: vec![def.name],
                reference,
            };
            if constraint_is_self_contained(&constraint) {
                // REFERENCES t(col) needs nothing but the column just added
                self.apply(table_name, &constraint);
            } else {
                self.submit(table_name, constraint, true);
            }
        }
    }

    fn submit(&mut self, table: &str, constraint: TableConstraint, from_create: bool) {
        match self.resolution {
            Resolution::SourceOrder => self.apply(table, &constraint),
            Resolution::Deferred => self.pending.push(Pending {
                table: table.to_string(),
                constraint,
                from_create,
            }),
        }
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    fn apply(&mut self, table_name: &str, constraint: &TableConstraint) {
        match constraint {
            TableConstraint::PrimaryKey { columns } => {
                let Some(table) = self.table_mut(table_name) else {
                    tracing::debug!(table = %table_name, "primary key on unknown table dropped");
                    return;
                };
                for name in columns {
                    match table.column_mut(name) {
                        Some(column) => column.set_primary_key(true),
                        None => tracing::debug!(
                            table = %table_name,
                            column = %name,
                            "primary key on unknown column dropped"
                        ),
                    }
                }
            }
            TableConstraint::ForeignKey { columns, reference } => {
                let Some(targets) = self.target_columns(reference) else {
                    tracing::debug!(
                        table = %table_name,
                        target = %reference.table,
                        "foreign key target has no resolvable key, dropped"
                    );
                    return;
                };
                if targets.len() != columns.len() {
                    tracing::debug!(table = %table_name, "foreign key arity mismatch, dropped");
                    return;
                }
                let Some(table) = self.table_mut(table_name) else {
                    tracing::debug!(table = %table_name, "foreign key on unknown table dropped");
                    return;
                };
                for (name, target) in columns.iter().zip(targets) {
                    match table.column_mut(name) {
                        Some(column) => {
                            column.foreign_key = Some(ForeignKeyRef {
                                table: reference.table.clone(),
                                column: target,
                            })
                        }
                        None => tracing::debug!(
                            table = %table_name,
                            column = %name,
                            "foreign key on unknown column dropped"
                        ),
                    }
                }
            }
        }
    }

    /// Referenced columns; an omitted list means the target's primary key.
    fn target_columns(&self, reference: &Reference) -> Option<Vec<String>> {
        if !reference.columns.is_empty() {
            return Some(reference.columns.clone());
        }
        let target = self.tables.iter().find(|t| t.name == reference.table)?;
        let keys: Vec<String> = target
            .primary_key_columns()
            .map(|c| c.name.clone())
            .collect();
        (!keys.is_empty()).then_some(keys)
    }
}

fn is_primary_key(constraint: &TableConstraint) -> bool {
    matches!(constraint, TableConstraint::PrimaryKey { .. })
}

fn constraint_is_self_contained(constraint: &TableConstraint) -> bool {
    match constraint {
        TableConstraint::ForeignKey { reference, .. } => !reference.columns.is_empty(),
        TableConstraint::PrimaryKey { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::model::ForeignKeyRef;
    use crate::sql::{ParseOptions, Resolution, parse_sql};

    fn parse(sql: &str) -> crate::model::Schema {
        parse_sql(sql, ParseOptions::default()).unwrap()
    }

    fn parse_in_order(sql: &str) -> crate::model::Schema {
        parse_sql(
            sql,
            ParseOptions {
                resolution: Resolution::SourceOrder,
            },
        )
        .unwrap()
    }

    fn fk(table: &str, column: &str) -> Option<ForeignKeyRef> {
        Some(ForeignKeyRef {
            table: table.to_string(),
            column: column.to_string(),
        })
    }

    #[test]
    fn test_users_roles_scenario() {
        let schema = parse(
            "CREATE TABLE users (id INT PRIMARY KEY, username VARCHAR(50) NOT NULL, role_id INT);
             CREATE TABLE roles (id INT PRIMARY KEY, name VARCHAR(50));
             ALTER TABLE users ADD FOREIGN KEY (role_id) REFERENCES roles (id);",
        );
        assert_eq!(schema.tables.len(), 2);

        let users = schema.table("users").unwrap();
        assert_eq!(users.columns.len(), 3);
        let role_id = users.column("role_id").unwrap();
        assert!(role_id.is_foreign_key());
        assert_eq!(role_id.foreign_key, fk("roles", "id"));
        assert!(!users.column("username").unwrap().nullable);

        let roles = schema.table("roles").unwrap();
        assert!(roles.columns.iter().all(|c| !c.is_foreign_key()));
    }

    #[test]
    fn test_columns_in_source_order() {
        let schema = parse("CREATE TABLE t (c INT, a INT, b DECIMAL(10,2), KEY k (a), d TEXT);");
        let columns = &schema.tables[0].columns;
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_primary_key_syntaxes() {
        let schema = parse(
            "CREATE TABLE a (id INT PRIMARY KEY);
             CREATE TABLE b (id INT, PRIMARY KEY (id));
             CREATE TABLE c (PRIMARY KEY (x, y), x INT, y INT, z INT);",
        );
        assert!(schema.table("a").unwrap().columns[0].primary_key);
        assert!(schema.table("b").unwrap().columns[0].primary_key);
        assert!(!schema.table("b").unwrap().columns[0].nullable);

        let c = schema.table("c").unwrap();
        let pks: Vec<_> = c.primary_key_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(pks, vec!["x", "y"]);
    }

    #[test]
    fn test_foreign_key_syntaxes() {
        let schema = parse(
            "CREATE TABLE roles (id INT PRIMARY KEY);
             CREATE TABLE inline_fk (role_id INT REFERENCES roles(id));
             CREATE TABLE table_fk (role_id INT, FOREIGN KEY (role_id) REFERENCES roles (id));
             CREATE TABLE named_fk (role_id INT, CONSTRAINT fk_r FOREIGN KEY (`role_id`) REFERENCES `roles` (`id`));
             CREATE TABLE alter_fk (role_id INT);
             ALTER TABLE alter_fk ADD CONSTRAINT fk_a FOREIGN KEY (role_id) REFERENCES roles (id);",
        );
        for name in ["inline_fk", "table_fk", "named_fk", "alter_fk"] {
            let column = &schema.table(name).unwrap().columns[0];
            assert_eq!(column.foreign_key, fk("roles", "id"), "table {}", name);
        }
    }

    #[test]
    fn test_deferred_resolution_ignores_order() {
        let sql = "CREATE TABLE t (PRIMARY KEY (id), FOREIGN KEY (o) REFERENCES other (id), id INT, o INT);
                   ALTER TABLE later ADD FOREIGN KEY (t_id) REFERENCES t (id);
                   CREATE TABLE later (t_id INT);";

        let schema = parse(sql);
        let t = schema.table("t").unwrap();
        assert!(t.column("id").unwrap().primary_key);
        assert_eq!(t.column("o").unwrap().foreign_key, fk("other", "id"));
        assert_eq!(
            schema.table("later").unwrap().columns[0].foreign_key,
            fk("t", "id")
        );
    }

    #[test]
    fn test_source_order_resolution_drops_forward_references() {
        let sql = "CREATE TABLE t (PRIMARY KEY (id), id INT, o INT, FOREIGN KEY (o) REFERENCES other (id));
                   ALTER TABLE later ADD FOREIGN KEY (t_id) REFERENCES t (id);
                   CREATE TABLE later (t_id INT);";

        let schema = parse_in_order(sql);
        let t = schema.table("t").unwrap();
        assert!(!t.column("id").unwrap().primary_key);
        assert_eq!(t.column("o").unwrap().foreign_key, fk("other", "id"));
        let later = schema.table("later").unwrap();
        assert!(later.columns[0].foreign_key.is_none());
    }

    #[test]
    fn test_missing_targets_are_dropped_silently() {
        let schema = parse(
            "CREATE TABLE t (a INT, FOREIGN KEY (nope) REFERENCES x (id), PRIMARY KEY (ghost));
             ALTER TABLE missing ADD FOREIGN KEY (a) REFERENCES t (a);",
        );
        assert_eq!(schema.tables.len(), 1);
        let a = &schema.tables[0].columns[0];
        assert!(!a.primary_key);
        assert!(a.foreign_key.is_none());
    }

    #[test]
    fn test_dangling_reference_is_kept() {
        let schema = parse("CREATE TABLE t (x_id INT REFERENCES nowhere(id));");
        assert_eq!(schema.tables[0].columns[0].foreign_key, fk("nowhere", "id"));
    }

    #[test]
    fn test_reference_without_columns_uses_primary_key() {
        let schema = parse(
            "CREATE TABLE orders (user_id INT REFERENCES users, x INT REFERENCES keyless);
             CREATE TABLE users (uid INT PRIMARY KEY);
             CREATE TABLE keyless (a INT);",
        );
        let orders = schema.table("orders").unwrap();
        assert_eq!(orders.columns[0].foreign_key, fk("users", "uid"));
        assert!(orders.columns[1].foreign_key.is_none());
    }

    #[test]
    fn test_reference_without_columns_sees_later_primary_keys() {
        let table_level = parse(
            "CREATE TABLE orders (user_id INT REFERENCES users);
             CREATE TABLE users (uid INT, PRIMARY KEY (uid));",
        );
        let altered = parse(
            "CREATE TABLE orders (user_id INT, FOREIGN KEY (user_id) REFERENCES users);
             CREATE TABLE users (uid INT NOT NULL);
             ALTER TABLE ONLY users ADD CONSTRAINT users_pkey PRIMARY KEY (uid);",
        );
        let swapped = parse(
            "CREATE TABLE users (uid INT, PRIMARY KEY (uid));
             CREATE TABLE orders (user_id INT REFERENCES users);",
        );
        for schema in [table_level, altered, swapped] {
            let orders = schema.table("orders").unwrap();
            assert_eq!(orders.columns[0].foreign_key, fk("users", "uid"));
        }
    }

    #[test]
    fn test_composite_foreign_key_pairs_columns() {
        let schema = parse(
            "CREATE TABLE child (a INT, b INT, FOREIGN KEY (a, b) REFERENCES parent (x, y));",
        );
        let child = &schema.tables[0];
        assert_eq!(child.columns[0].foreign_key, fk("parent", "x"));
        assert_eq!(child.columns[1].foreign_key, fk("parent", "y"));
    }

    #[test]
    fn test_alter_add_primary_key() {
        let schema = parse(
            "CREATE TABLE public.users (id integer NOT NULL);
             ALTER TABLE ONLY public.users ADD CONSTRAINT users_pkey PRIMARY KEY (id);",
        );
        assert!(schema.tables[0].columns[0].primary_key);
    }

    #[test]
    fn test_zero_column_table_is_registered() {
        let schema = parse("CREATE TABLE empty; CREATE TABLE junk (,,);");
        assert_eq!(schema.tables.len(), 2);
        assert!(schema.tables.iter().all(|t| t.columns.is_empty()));
    }

    #[test]
    fn test_duplicate_tables() {
        let schema = parse(
            "CREATE TABLE t (a INT, PRIMARY KEY (a));
             CREATE TABLE u (id INT);
             CREATE TABLE t (b INT);
             CREATE TABLE IF NOT EXISTS u (other INT);",
        );
        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.tables[0].name, "t");
        assert_eq!(schema.tables[0].columns.len(), 1);
        assert_eq!(schema.tables[0].columns[0].name, "b");
        assert!(!schema.tables[0].columns[0].primary_key);
        assert_eq!(schema.tables[1].columns[0].name, "id");
    }

    #[test]
    fn test_duplicate_column_keeps_first() {
        let schema = parse("CREATE TABLE t (a INT, a TEXT NOT NULL);");
        let t = &schema.tables[0];
        assert_eq!(t.columns.len(), 1);
        assert_eq!(t.columns[0].data_type, "INT");
    }

    #[test]
    fn test_insert_is_inert() {
        let with_insert = parse(
            "CREATE TABLE t (id INT);
             INSERT INTO t VALUES (1, 'CREATE TABLE x (y INT);');
             INSERT INTO t (id) VALUES (2);",
        );
        assert_eq!(with_insert, parse("CREATE TABLE t (id INT);"));
    }

    #[test]
    fn test_comments_do_not_change_columns() {
        let plain = parse("CREATE TABLE t (id INT PRIMARY KEY, name TEXT);");
        let commented = parse(
            "-- header
             /* block
                spanning lines */
             CREATE TABLE t ( -- trailing
                 id INT /* inline */ PRIMARY KEY,
                 # mysql style
                 name TEXT -- last
             );",
        );
        assert_eq!(plain, commented);
    }

    #[test]
    fn test_mysql_dump() {
        let schema = parse(
            "/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;
             SET NAMES utf8mb4;
             DROP TABLE IF EXISTS `orders`;
             CREATE TABLE `orders` (
               `id` int(11) NOT NULL AUTO_INCREMENT,
               `user_id` int(11) DEFAULT NULL,
               `total` decimal(10,2) NOT NULL DEFAULT '0.00',
               PRIMARY KEY (`id`),
               KEY `idx_user` (`user_id`),
               CONSTRAINT `fk_orders_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE
             ) ENGINE=InnoDB AUTO_INCREMENT=5 DEFAULT CHARSET=utf8mb4;
             LOCK TABLES `orders` WRITE;
             INSERT INTO `orders` VALUES (1,2,'3.50');
             UNLOCK TABLES;",
        );
        assert_eq!(schema.tables.len(), 1);
        let orders = &schema.tables[0];
        assert_eq!(orders.columns.len(), 3);
        assert!(orders.columns[0].primary_key);
        assert_eq!(orders.columns[1].foreign_key, fk("users", "id"));
        assert_eq!(orders.columns[2].data_type, "decimal(10,2)");
        assert!(!orders.columns[2].nullable);
    }
}
