use geoprox::{AttributeTable, Config, DBBuilder, Position};

#[derive(Debug, Clone)]
struct Station {
    name: &'static str,
    bikes: u32,
    network: &'static str,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug to see detailed logs)
    env_logger::init();

    println!("=== geoprox - Getting Started ===\n");

    let attributes = AttributeTable::new()
        .with("name", |s: &Station| Some(s.name.into()))
        .with("bikes", |s: &Station| Some(s.bikes.into()))
        .with("network", |s: &Station| Some(s.network.into()));

    let config = Config::default().with_resolution(20);
    let mut db = DBBuilder::new().config(config).build_stream(attributes)?;
    println!("✓ Created database with {} bits of resolution\n", db.resolution());

    // === STORING POSITIONS ===
    println!("1. Storing Positions");
    println!("--------------------");

    let stations = [
        (Position::new(40.7128, -74.0060), "City Hall", 12, "citi"),
        (Position::new(40.7130, -74.0062), "Broadway", 30, "citi"),
        (Position::new(40.7580, -73.9855), "Times Square", 8, "citi"),
        (Position::new(51.5074, -0.1278), "Trafalgar", 21, "santander"),
        (Position::new(48.8566, 2.3522), "Hotel de Ville", 17, "velib"),
    ];
    for (position, name, bikes, network) in stations {
        db.insert(
            position,
            Station {
                name,
                bikes,
                network,
            },
        )?;
    }
    println!("   Stored {} stations\n", db.len());

    // === PROXIMITY QUERIES ===
    println!("2. Proximity Queries");
    println!("--------------------");

    let city_hall = Position::new(40.7128, -74.0060);
    for precision in [20, 12, 4, 0] {
        let nearby = db.nearby(&city_hall, precision)?;
        let names: Vec<&str> = nearby.iter().map(|entry| entry.data.name).collect();
        println!("   {:>2} shared bits: {:?}", precision, names);
    }
    println!();

    // === ATTRIBUTE AGGREGATES ===
    println!("3. Attribute Aggregates");
    println!("-----------------------");

    let precision = 12;
    println!(
        "   Average bikes near City Hall: {:?}",
        db.average_nearby("bikes", &city_hall, precision)?
    );
    println!(
        "   Max bikes near City Hall:     {:?}",
        db.max_nearby("bikes", &city_hall, precision)?
    );
    println!(
        "   Stations per network:         {:?}",
        db.histogram_nearby("network", &city_hall, 0)?
    );
    println!(
        "   Missing attribute:            {:?}\n",
        db.average_nearby("docks", &city_hall, precision)?
    );

    // === STATISTICS ===
    println!("4. Statistics");
    println!("-------------");

    let stats = db.stats();
    println!("   Entries:        {}", stats.entry_count);
    println!("   Occupied slots: {} / {}", stats.occupied_slots, stats.slot_count);
    println!("   Operations:     {}", stats.operations_count);

    println!("\n=== Done ===");
    Ok(())
}
