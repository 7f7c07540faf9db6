use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(read_dir) = fs::read_dir(&dir) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
                    files.push(path);
                }
            }
        }
    }
    files
}

#[test]
fn graph_sql_lives_only_in_the_postgres_store() {
    let src = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let needles = [
        "reactable_content",
        "profile_follows",
        "media_records",
        "FROM comments",
        "FROM reactions",
        "INTO comments",
        "INTO reactions",
    ];

    let mut offenders = Vec::new();
    for file in collect_rs_files(&src) {
        let path_str = file.to_string_lossy().replace('\\', "/");
        if path_str.ends_with("src/repository/postgres.rs") {
            continue;
        }
        let contents = fs::read_to_string(&file).unwrap_or_default();
        if needles.iter().any(|needle| contents.contains(needle)) {
            offenders.push(path_str);
        }
    }

    assert!(
        offenders.is_empty(),
        "Graph tables must only be touched through the GraphTx seam. Offenders: {:?}",
        offenders
    );
}

#[test]
fn services_reach_storage_only_through_graph_store() {
    let services = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src/services");

    let mut offenders = Vec::new();
    for file in collect_rs_files(&services) {
        let contents = fs::read_to_string(&file).unwrap_or_default();
        if contents.contains("sqlx::") || contents.contains("PgPool") {
            offenders.push(file.to_string_lossy().to_string());
        }
    }

    assert!(
        offenders.is_empty(),
        "Services must go through GraphStore::begin. Offenders: {:?}",
        offenders
    );
}
