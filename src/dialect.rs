use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// SQL dialects accepted by the conversion API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    BigQuery,
    Databricks,
    Spark,
    Hive,
    PostgreSQL,
    MySQL,
    Snowflake,
    TSQL,
    DuckDB,
    SQLite,
    Redshift,
    Trino,
    Presto,
    Oracle,
    ClickHouse,
}

impl Dialect {
    pub const ALL: [Dialect; 15] = [
        Dialect::BigQuery,
        Dialect::Databricks,
        Dialect::Spark,
        Dialect::Hive,
        Dialect::PostgreSQL,
        Dialect::MySQL,
        Dialect::Snowflake,
        Dialect::TSQL,
        Dialect::DuckDB,
        Dialect::SQLite,
        Dialect::Redshift,
        Dialect::Trino,
        Dialect::Presto,
        Dialect::Oracle,
        Dialect::ClickHouse,
    ];

    /// Canonical identifier used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::BigQuery => "bigquery",
            Dialect::Databricks => "databricks",
            Dialect::Spark => "spark",
            Dialect::Hive => "hive",
            Dialect::PostgreSQL => "postgres",
            Dialect::MySQL => "mysql",
            Dialect::Snowflake => "snowflake",
            Dialect::TSQL => "tsql",
            Dialect::DuckDB => "duckdb",
            Dialect::SQLite => "sqlite",
            Dialect::Redshift => "redshift",
            Dialect::Trino => "trino",
            Dialect::Presto => "presto",
            Dialect::Oracle => "oracle",
            Dialect::ClickHouse => "clickhouse",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Dialect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDialect(pub String);

impl fmt::Display for UnknownDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized dialect '{}'", self.0)
    }
}

impl std::error::Error for UnknownDialect {}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dialect = match s.trim().to_lowercase().as_str() {
            "bigquery" | "bq" => Dialect::BigQuery,
            "databricks" | "dbx" => Dialect::Databricks,
            "spark" | "spark2" | "sparksql" => Dialect::Spark,
            "hive" => Dialect::Hive,
            "postgres" | "postgresql" => Dialect::PostgreSQL,
            "mysql" => Dialect::MySQL,
            "snowflake" => Dialect::Snowflake,
            "tsql" | "mssql" | "sqlserver" => Dialect::TSQL,
            "duckdb" => Dialect::DuckDB,
            "sqlite" => Dialect::SQLite,
            "redshift" => Dialect::Redshift,
            "trino" => Dialect::Trino,
            "presto" => Dialect::Presto,
            "oracle" => Dialect::Oracle,
            "clickhouse" => Dialect::ClickHouse,
            _ => return Err(UnknownDialect(s.to_string())),
        };
        Ok(dialect)
    }
}
