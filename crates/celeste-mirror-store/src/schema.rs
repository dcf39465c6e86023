use rusqlite_migration::{M, Migrations};

pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "CREATE TABLE passes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            kind            TEXT NOT NULL,
            recorded_at     INTEGER NOT NULL,
            dry_run         INTEGER NOT NULL DEFAULT 0,
            status          INTEGER NOT NULL,
            manifest_error  TEXT
        );

        CREATE TABLE category_results (
            pass_id         INTEGER NOT NULL,
            category        TEXT NOT NULL,
            to_delete       INTEGER,
            to_download     INTEGER,
            deleted         INTEGER NOT NULL,
            requested       INTEGER NOT NULL,
            failures_json   TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (pass_id, category),
            FOREIGN KEY (pass_id) REFERENCES passes(id)
        );

        CREATE INDEX idx_passes_kind ON passes(kind, recorded_at);",
    )])
}
