//! Static registry of LMT database tables worth caching.
//!
//! Each entry maps a table name to its ordered column list and primary
//! key. The registry is configuration data, fixed at compile time;
//! validating at first use rules out a table accumulating rows under two
//! incompatible shapes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use lmta_cachedb::TableSchema;

static LMTDB_TABLES: LazyLock<BTreeMap<&'static str, TableSchema>> = LazyLock::new(|| {
    let mut tables = BTreeMap::new();
    tables.insert(
        "FILESYSTEM_INFO",
        TableSchema::new(
            [
                "FILESYSTEM_ID",
                "FILESYSTEM_NAME",
                "FILESYSTEM_MOUNT_NAME",
                "SCHEMA_VERSION",
            ],
            ["FILESYSTEM_ID"],
        ),
    );
    tables.insert(
        "MDS_DATA",
        TableSchema::new(
            [
                "MDS_ID",
                "TS_ID",
                "PCT_CPU",
                "KBYTES_FREE",
                "KBYTES_USED",
                "INODES_FREE",
                "INODES_USED",
            ],
            ["MDS_ID", "TS_ID"],
        ),
    );
    tables.insert(
        "MDS_INFO",
        TableSchema::new(
            ["MDS_ID", "FILESYSTEM_ID", "MDS_NAME", "HOSTNAME", "DEVICE_NAME"],
            ["MDS_ID"],
        ),
    );
    tables.insert(
        "MDS_OPS_DATA",
        TableSchema::new(
            ["MDS_ID", "TS_ID", "OPERATION_ID", "SAMPLES", "SUM", "SUMSQUARES"],
            ["MDS_ID", "TS_ID", "OPERATION_ID"],
        ),
    );
    tables.insert(
        "MDS_VARIABLE_INFO",
        TableSchema::new(
            [
                "VARIABLE_ID",
                "VARIABLE_NAME",
                "VARIABLE_LABEL",
                "THRESH_TYPE",
                "THRESH_VAL1",
                "THRESH_VAL2",
            ],
            ["VARIABLE_ID"],
        ),
    );
    tables.insert(
        "OPERATION_INFO",
        TableSchema::new(
            ["OPERATION_ID", "OPERATION_NAME", "UNITS"],
            ["OPERATION_ID"],
        ),
    );
    tables.insert(
        "OSS_DATA",
        TableSchema::new(
            ["OSS_ID", "TS_ID", "PCT_CPU", "PCT_MEMORY"],
            ["OSS_ID", "TS_ID"],
        ),
    );
    tables.insert(
        "OSS_INFO",
        TableSchema::new(
            ["OSS_ID", "FILESYSTEM_ID", "HOSTNAME", "FAILOVERHOST"],
            ["OSS_ID", "HOSTNAME"],
        ),
    );
    tables.insert(
        "OST_DATA",
        TableSchema::new(
            [
                "OST_ID",
                "TS_ID",
                "READ_BYTES",
                "WRITE_BYTES",
                "PCT_CPU",
                "KBYTES_FREE",
                "KBYTES_USED",
                "INODES_FREE",
                "INODES_USED",
            ],
            ["OST_ID", "TS_ID"],
        ),
    );
    tables.insert(
        "OST_INFO",
        TableSchema::new(
            [
                "OST_ID",
                "OSS_ID",
                "OST_NAME",
                "HOSTNAME",
                "OFFLINE",
                "DEVICE_NAME",
            ],
            ["OST_ID"],
        ),
    );
    tables.insert(
        "OST_VARIABLE_INFO",
        TableSchema::new(
            [
                "VARIABLE_ID",
                "VARIABLE_NAME",
                "VARIABLE_LABEL",
                "THRESH_TYPE",
                "THRESH_VAL1",
                "THRESH_VAL2",
            ],
            ["VARIABLE_ID"],
        ),
    );
    tables.insert(
        "TIMESTAMP_INFO",
        TableSchema::new(["TS_ID", "TIMESTAMP"], ["TS_ID"]),
    );
    tables
});

/// Look up a table's schema by name, case-insensitively.
pub fn table_schema(name: &str) -> Option<(&'static str, &'static TableSchema)> {
    let upper = name.to_ascii_uppercase();
    LMTDB_TABLES
        .get_key_value(upper.as_str())
        .map(|(k, v)| (*k, v))
}

/// Names of all registered tables, in deterministic order.
pub fn table_names() -> impl Iterator<Item = &'static str> {
    LMTDB_TABLES.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_twelve_tables() {
        assert_eq!(table_names().count(), 12);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let (name, schema) = table_schema("ost_data").expect("lookup");
        assert_eq!(name, "OST_DATA");
        assert_eq!(schema.columns.len(), 9);
        assert!(table_schema("NOT_A_TABLE").is_none());
    }

    #[test]
    fn every_schema_is_well_formed() {
        for name in table_names() {
            let (_, schema) = table_schema(name).expect("registered");
            schema.validate(name).expect("valid schema");
        }
    }

    #[test]
    fn timestamp_dimension_registered() {
        let (_, schema) = table_schema("TIMESTAMP_INFO").expect("lookup");
        assert_eq!(schema.columns, ["TS_ID", "TIMESTAMP"]);
        assert_eq!(schema.primary_key, ["TS_ID"]);
    }
}
