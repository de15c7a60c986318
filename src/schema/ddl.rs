// src/schema/ddl.rs
use super::RelationPlan;
use crate::error::{EtlError, Result};
use crate::naming::quote_ident;

impl RelationPlan {
    fn typed(&self, idx: usize) -> Result<(String, String)> {
        let col = &self.columns[idx];
        let ty = col
            .kind
            .sql_type()
            .ok_or_else(|| EtlError::UnmappedColumnType {
                relation: self.relation.clone(),
                column: col.name.clone(),
            })?;
        Ok((quote_ident(&col.name), ty))
    }

    /// `CREATE TABLE` with only the first column, declared as primary key.
    /// Deliberately no `IF NOT EXISTS`: an existing relation is an error.
    pub fn create_statement(&self) -> Result<String> {
        let (name, ty) = self.typed(0)?;
        Ok(format!(
            "CREATE TABLE {} ({} {} PRIMARY KEY)",
            quote_ident(&self.relation),
            name,
            ty
        ))
    }

    /// One `ALTER TABLE … ADD` per remaining column, in column order.
    pub fn alter_statements(&self) -> Result<Vec<String>> {
        (1..self.columns.len())
            .map(|idx| {
                let (name, ty) = self.typed(idx)?;
                Ok(format!(
                    "ALTER TABLE {} ADD {} {}",
                    quote_ident(&self.relation),
                    name,
                    ty
                ))
            })
            .collect()
    }

    /// `COPY` reading the series file as CSV: header skipped, empty strings null.
    pub fn copy_statement(&self) -> String {
        let cols: Vec<String> = self.columns.iter().map(|c| quote_ident(&c.name)).collect();
        format!(
            "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER true, NULL '')",
            quote_ident(&self.relation),
            cols.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Column, ColumnKind};
    use super::*;
    use std::path::PathBuf;

    fn plan() -> RelationPlan {
        RelationPlan {
            relation: "gdp_growth".into(),
            source: PathBuf::from("gdp_growth.csv"),
            columns: vec![
                Column {
                    name: "country_code".into(),
                    kind: ColumnKind::Text,
                },
                Column {
                    name: "yr2000".into(),
                    kind: ColumnKind::Numeric,
                },
            ],
        }
    }

    #[test]
    fn renders_create_alter_and_copy() -> anyhow::Result<()> {
        let plan = plan();
        assert_eq!(
            plan.create_statement()?,
            r#"CREATE TABLE "gdp_growth" ("country_code" TEXT PRIMARY KEY)"#
        );
        assert_eq!(
            plan.alter_statements()?,
            vec![r#"ALTER TABLE "gdp_growth" ADD "yr2000" NUMERIC(38, 2)"#]
        );
        assert_eq!(
            plan.copy_statement(),
            r#"COPY "gdp_growth" ("country_code", "yr2000") FROM STDIN WITH (FORMAT csv, HEADER true, NULL '')"#
        );
        Ok(())
    }

    #[test]
    fn unrecognized_kind_never_renders() {
        let mut plan = plan();
        plan.columns[1].kind = ColumnKind::Unrecognized;
        assert!(matches!(
            plan.alter_statements(),
            Err(EtlError::UnmappedColumnType { column, .. }) if column == "yr2000"
        ));
    }
}
