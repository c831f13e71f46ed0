//! End-to-end: load a data file from disk, interact, restart with the same
//! storage file and check what survived.

use gallery_core::gallery::Gallery;
use gallery_core::loader::{self, LoadError};
use gallery_core::player::{PlayerCommand, PlayerEvent};
use gallery_core::sort::SortKey;
use gallery_core::storage::{JsonFileStore, KeyValueStore};
use gallery_core::viewed::VIEWED_KEY;

const DATA: &str = "\
id,url,title,thumb,size_formatted,how_long_ago
1,https://cdn.example/1.mp4,First,https://cdn.example/1.jpg,1.2 GB,2 days ago
2,,Broken,,,
3,https://cdn.example/3.mp4,Third,,800 MB,
4,https://cdn.example/4.mp4,Fourth,,unknown,1 hour ago
";

fn write_data(dir: &std::path::Path, body: &str) -> String {
    let path = dir.join("data.csv");
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn viewed_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_data(dir.path(), DATA);
    let storage_path = dir.path().join("state").join("storage.json");

    {
        let mut g = Gallery::new(Box::new(JsonFileStore::open(&storage_path)), "ph");
        assert!(g.apply_load(loader::load(&data).await).is_none());
        assert_eq!(g.store().len(), 3, "row without url is dropped");

        g.toggle_viewed("3").unwrap();

        // Play the first card through to a successful start.
        let cmds = g.open(0);
        let gen = match &cmds[..] {
            [PlayerCommand::Load { generation, url }] => {
                assert_eq!(url, "https://cdn.example/1.mp4");
                *generation
            }
            other => panic!("unexpected commands {:?}", other),
        };
        assert_eq!(
            g.handle_player_event(PlayerEvent::DataReady { generation: gen }),
            vec![PlayerCommand::Play { generation: gen }]
        );
        g.handle_player_event(PlayerEvent::PlaybackStarted { generation: gen });
        assert_eq!(g.close_player(), vec![PlayerCommand::Stop]);
    }

    let store = JsonFileStore::open(&storage_path);
    assert_eq!(store.get(VIEWED_KEY).as_deref(), Some("[\"3\",\"1\"]"));

    let mut g = Gallery::new(Box::new(store), "ph");
    g.apply_load(loader::load(&data).await);
    assert!(g.is_viewed("1"));
    assert!(g.is_viewed("3"));
    assert!(!g.is_viewed("4"));
    assert_eq!(g.viewed_count(), 2);
}

#[tokio::test]
async fn stale_ids_are_kept_when_rows_disappear() {
    let dir = tempfile::tempdir().unwrap();
    let storage_path = dir.path().join("storage.json");
    let mut g = Gallery::new(Box::new(JsonFileStore::open(&storage_path)), "ph");
    g.toggle_viewed("gone").unwrap();

    let data = write_data(dir.path(), DATA);
    g.apply_load(loader::load(&data).await);
    assert!(g.is_viewed("gone"));
    assert_eq!(g.viewed_count(), 0);
}

#[tokio::test]
async fn missing_columns_never_populate_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_data(dir.path(), "identifier,link,name\n1,a.mp4,A\n");
    let err = loader::load(&data).await.unwrap_err();
    assert!(matches!(err, LoadError::MissingColumns(_)));
    assert_eq!(err.to_string(), "Missing required columns in CSV: id, url, title");

    let mut g = Gallery::new(Box::new(JsonFileStore::open(dir.path().join("s.json"))), "ph");
    g.apply_load(Err(err));
    assert!(g.store().is_empty());
    assert!(g.view().cards.is_empty());
}

#[tokio::test]
async fn size_sort_orders_loaded_records() {
    let dir = tempfile::tempdir().unwrap();
    let data = write_data(dir.path(), DATA);
    let mut g = Gallery::new(Box::new(JsonFileStore::open(dir.path().join("s.json"))), "ph");
    g.apply_load(loader::load(&data).await);

    g.sort(SortKey::SizeFormatted);
    let ids: Vec<&str> = g.store().records().iter().map(|r| r.id.as_str()).collect();
    // 800 > 1.2 > unparseable (0)
    assert_eq!(ids, vec!["3", "1", "4"]);
}
