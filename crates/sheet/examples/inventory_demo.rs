//! Walkthrough of generating, editing and exchanging a table of items.
//!
//! Run with: cargo run --example inventory_demo -p gridgraph-sheet

use gridgraph_sheet::{
    ObjectType, ObjectValue, SerializationOptions, SourceRoot, TableGenerator, TypeDesc,
    TypeRegistry, Value,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Inventory Table Demo ===\n");

    let mut registry = TypeRegistry::new();
    registry.register_object(
        ObjectType::new("Item")
            .field("name", "string".parse()?)
            .field("weight", "f32".parse()?)
            .field("tags", TypeDesc::list(TypeDesc::String))
            .field("prices", "dict<string, i32>".parse()?),
    );
    let generator = TableGenerator::new(registry).into_ref();

    let roots: Vec<_> = [("rope", 1.5_f32), ("lantern", 2.0)]
        .into_iter()
        .map(|(name, weight)| {
            SourceRoot::new(Value::Object(
                ObjectValue::new("Item")
                    .with_field("name", name)
                    .with_field("weight", weight)
                    .with_field("tags", vec![Value::from("gear")])
                    .with_field("prices", Value::Dictionary(Vec::new())),
            ))
        })
        .collect();

    let mut table = generator.generate_for_roots("Items", &roots)?;
    println!(
        "Generated {} rows x {} columns",
        table.row_count(),
        table.column_count()
    );

    // Edit through nested cells
    table.set_value_at("B2", Value::Float(2.5))?;
    let prices = table.cell_at_mut("D1")?;
    prices.add_item(Value::Int(12))?;
    println!("Prices of rope: {}", prices.get_items()?);

    let tsv = SerializationOptions::tsv().with_header(true);
    println!("\n--- TSV ---\n{}", table.export(&tsv)?);

    let json = SerializationOptions::json().with_pretty(true);
    println!("--- JSON ---\n{}", table.export(&json)?);

    // Paste a row back in
    table.import("lamp\t3\t[\"light\"]\t{}\n", &SerializationOptions::tsv())?;
    println!("After import: {}", roots[0].value());
    println!("Dirty roots: {}", roots.iter().filter(|r| r.is_dirty()).count());

    Ok(())
}
