use leafdb::{config::DbConfig, error::DbError, storage::{Row, Table}};
use std::fs;
use tempfile::tempdir;

fn user(id: i64) -> Row {
    Row::new(id, format!("user{}", id), format!("person{}@example.com", id)).unwrap()
}

#[test]
fn keeps_data_after_closing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("persist.db");
    {
        let mut table = Table::open(&path, &DbConfig::default()).unwrap();
        table.insert(&user(1)).unwrap();
        table.close().unwrap();
    }
    assert_eq!(fs::metadata(&path).unwrap().len(), 4096);

    let mut table = Table::open(&path, &DbConfig::default()).unwrap();
    assert_eq!(table.select().unwrap(), vec![user(1)]);
}

#[test]
fn split_tree_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("split.db");
    {
        let mut table = Table::open(&path, &DbConfig::default()).unwrap();
        for id in 1..=14 {
            table.insert(&user(id)).unwrap();
        }
        table.close().unwrap();
    }
    assert_eq!(fs::metadata(&path).unwrap().len(), 3 * 4096);

    let mut table = Table::open(&path, &DbConfig::default()).unwrap();
    assert_eq!(table.root_page(), 2);
    let ids: Vec<u32> = table.select().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=14).collect::<Vec<u32>>());
    assert_eq!(table.get(8).unwrap(), Some(user(8)));
}

#[test]
fn rejected_requests_do_not_reach_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("reject.db");
    {
        let mut table = Table::open(&path, &DbConfig::default()).unwrap();
        table.insert(&user(1)).unwrap();
        assert!(table.insert(&Row::new(1, "x", "y").unwrap()).is_err());
        table.close().unwrap();
    }
    let mut table = Table::open(&path, &DbConfig::default()).unwrap();
    assert_eq!(table.select().unwrap(), vec![user(1)]);
}

#[test]
fn partial_page_file_is_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corrupt.db");
    fs::write(&path, vec![0u8; 100]).unwrap();
    assert!(matches!(
        Table::open(&path, &DbConfig::default()),
        Err(DbError::CorruptFile(_))
    ));
}

#[test]
fn file_without_a_root_is_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rootless.db");
    // One leaf page whose root flag is clear and whose parent points at itself.
    let mut page = vec![0u8; 4096];
    page[0] = 1;
    fs::write(&path, page).unwrap();
    assert!(matches!(
        Table::open(&path, &DbConfig::default()),
        Err(DbError::CorruptFile(_))
    ));
}

#[test]
fn leaf_claiming_too_many_cells_is_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("overfull.db");
    let mut page = vec![0u8; 4096];
    page[0] = 1;
    page[1] = 1;
    page[6..10].copy_from_slice(&1000u32.to_le_bytes());
    fs::write(&path, page).unwrap();
    assert!(matches!(
        Table::open(&path, &DbConfig::default()),
        Err(DbError::CorruptFile(_))
    ));
}

#[test]
fn corrupt_child_leaf_is_reported_not_panicked() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad_child.db");
    {
        let mut table = Table::open(&path, &DbConfig::default()).unwrap();
        for id in 1..=14 {
            table.insert(&user(id)).unwrap();
        }
        table.close().unwrap();
    }
    let mut bytes = fs::read(&path).unwrap();
    bytes[4096 + 6..4096 + 10].copy_from_slice(&1000u32.to_le_bytes());
    fs::write(&path, bytes).unwrap();

    let mut table = Table::open(&path, &DbConfig::default()).unwrap();
    assert!(matches!(table.select(), Err(DbError::CorruptFile(_))));
    assert!(matches!(table.render_tree(), Err(DbError::CorruptFile(_))));
    assert!(matches!(table.get(10), Err(DbError::CorruptFile(_))));
    assert_eq!(table.get(3).unwrap(), Some(user(3)));
}

#[test]
fn rows_use_the_fixed_cell_stride_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stride.db");
    {
        let mut table = Table::open(&path, &DbConfig::default()).unwrap();
        table.insert(&user(2)).unwrap();
        table.insert(&user(1)).unwrap();
        table.close().unwrap();
    }
    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[6..10], &2u32.to_le_bytes());
    assert_eq!(&bytes[10..14], &1u32.to_le_bytes());
    assert_eq!(&bytes[10 + 297..10 + 297 + 4], &2u32.to_le_bytes());
    // Row of cell 0: id at +4, username at +8, email at +4 + 37.
    assert_eq!(&bytes[14..18], &1u32.to_le_bytes());
    assert_eq!(&bytes[18..23], b"user1");
    assert_eq!(&bytes[10 + 4 + 37..10 + 4 + 37 + 7], b"person1");
}
