use geoprox::{AttributeTable, Base32Geohash, GeoHash, Operation, Position, StreamDB};

const RESOLUTION: usize = 12;

fn counter_db() -> StreamDB<u32> {
    let strategy = AttributeTable::new().with("n", |n: &u32| Some((*n).into()));
    StreamDB::new(strategy, Base32Geohash::default(), RESOLUTION).expect("Failed to create database")
}

fn pool() -> Vec<Position> {
    vec![
        Position::new(36.1447, -86.8027),
        Position::new(36.1445, -86.8035),
        Position::new(40.7128, -74.0060),
        Position::new(51.5074, -0.1278),
        Position::new(48.8566, 2.3522),
        Position::new(-33.8568, 151.2153),
        Position::new(35.6762, 139.6503),
        Position::new(-22.9068, -43.1729),
    ]
}

fn sorted_data(db: &StreamDB<u32>) -> Vec<u32> {
    let mut data: Vec<u32> = db.proximity_db().iter().map(|e| e.data).collect();
    data.sort_unstable();
    data
}

/// Test 1: Every snapshot matches a naive replay of the same operations
#[test]
fn test_snapshots_match_naive_model() {
    let mut db = counter_db();
    let pool = pool();

    let mut state: u64 = 7;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as usize
    };

    let mut model: Vec<(GeoHash, u32)> = Vec::new();
    let mut states: Vec<Vec<u32>> = vec![Vec::new()];

    for n in 0..200u32 {
        let position = pool[next() % pool.len()];
        let hash = db.proximity_db().geohash(&position).expect("Failed to hash");

        if next() % 4 == 0 {
            let precision = next() % (RESOLUTION + 1);
            let prefix = hash.prefix(precision).unwrap();
            db.delete_within(&position, precision).expect("Delete failed");
            model.retain(|(stored, _)| !stored.starts_with(&prefix));
        } else {
            db.insert(position, n).expect("Insert failed");
            model.push((hash, n));
        }

        let mut snapshot: Vec<u32> = model.iter().map(|(_, n)| *n).collect();
        snapshot.sort_unstable();
        states.push(snapshot);
    }

    assert_eq!(db.log_len(), 200);
    for (t, expected) in states.iter().enumerate() {
        let snapshot = db.database_state_at_time(t).expect("Replay failed");
        assert_eq!(&sorted_data(&snapshot), expected, "state after {} operations", t);
        assert_eq!(snapshot.log_len(), t);
    }
}

/// Test 2: Snapshots are frozen once taken
#[test]
fn test_snapshot_frozen_after_live_changes() {
    let mut db = counter_db();
    let pool = pool();
    for (i, position) in pool.iter().enumerate() {
        db.insert(*position, i as u32).unwrap();
    }

    let snapshot = db.database_state_at_time(4).unwrap();
    let before = sorted_data(&snapshot);

    db.delete_within(&pool[0], 0).unwrap();
    db.insert(pool[1], 99).unwrap();

    assert_eq!(sorted_data(&snapshot), before);
    assert_eq!(before, vec![0, 1, 2, 3]);
    assert!(db.database_state_at_time(db.log_len() + 1).is_err());
}

/// Test 3: Aggregates on a snapshot see only the replayed entries
#[test]
fn test_aggregates_on_snapshot() {
    let mut db = counter_db();
    let nashville = Position::new(36.1447, -86.8027);
    for n in [10, 20, 30, 40] {
        db.insert(nashville, n).unwrap();
    }
    db.delete(&nashville).unwrap();
    assert_eq!(db.average_nearby("n", &nashville, RESOLUTION).unwrap(), None);

    let halfway = db.database_state_at_time(2).unwrap();
    assert_eq!(halfway.average_nearby("n", &nashville, RESOLUTION).unwrap(), Some(15.0));

    let before_delete = db.database_state_at_time(4).unwrap();
    assert_eq!(before_delete.max_nearby("n", &nashville, RESOLUTION).unwrap(), Some(40.0));
}

/// Test 4: The log records inputs, not outcomes
#[test]
fn test_log_records_operation_inputs() {
    let mut db = counter_db();
    let sydney = Position::new(-33.8568, 151.2153);
    db.insert(sydney, 1).unwrap();
    db.delete_within(&sydney, 4).unwrap();
    // Deleting an empty group is still a logged mutation.
    db.delete_within(&sydney, 4).unwrap();

    let ops: Vec<&Operation<u32>> = db.log().records().iter().map(|r| &r.op).collect();
    assert_eq!(
        ops,
        vec![
            &Operation::Insert {
                position: sydney,
                data: 1
            },
            &Operation::Delete {
                position: sydney,
                precision: 4
            },
            &Operation::Delete {
                position: sydney,
                precision: 4
            },
        ]
    );

    let history = db.history_for(&sydney);
    assert_eq!(history.len(), 3);
    assert_eq!(history.last().map(|r| r.seq), Some(3));

    let json = serde_json::to_string(db.log()).unwrap();
    assert!(json.contains("\"op\":\"delete\""));
}
