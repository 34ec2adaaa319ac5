//! Rebuilding past states from the operation log.
//!
//! Run with: cargo run --example time_travel

use geoprox::{Base32Geohash, JsonAttributes, Operation, Position, StreamDB};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== geoprox - Time Travel ===\n");

    let mut db = StreamDB::new(JsonAttributes, Base32Geohash::default(), 16)?;

    let depot = Position::new(-33.8688, 151.2093);
    let harbour = Position::new(-33.8568, 151.2153);

    db.insert(depot, json!({ "vehicle": "van-1", "load": 120 }))?;
    db.insert(harbour, json!({ "vehicle": "van-2", "load": 80 }))?;
    db.insert(depot, json!({ "vehicle": "van-3", "load": 45.5 }))?;
    db.delete(&depot)?;
    db.insert(harbour, json!({ "vehicle": "van-4", "load": 200 }))?;

    println!("Operation log:");
    for record in db.log().records() {
        match &record.op {
            Operation::Insert { position, data } => println!(
                "  #{} insert {} at ({:.4}, {:.4})",
                record.seq,
                data["vehicle"],
                position.latitude(),
                position.longitude()
            ),
            Operation::Delete {
                position,
                precision,
            } => println!(
                "  #{} delete {} bits around ({:.4}, {:.4})",
                record.seq,
                precision,
                position.latitude(),
                position.longitude()
            ),
        }
    }
    println!();

    for t in 0..=db.log_len() {
        let snapshot = db.database_state_at_time(t)?;
        println!(
            "t={} entries={} total load nearby={:?}",
            t,
            snapshot.len(),
            snapshot.sum_nearby("load", &depot, 8)?
        );
    }

    println!("\nHistory of the depot position:");
    for record in db.history_for(&depot) {
        let kind = if record.op.is_insert() { "insert" } else { "delete" };
        println!("  #{} {}", record.seq, kind);
    }

    Ok(())
}
