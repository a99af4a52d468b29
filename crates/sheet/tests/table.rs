use gridgraph_sheet::{
    CellKind, ChangeEvent, EnumType, FloatKind, IntKind, ObjectType, ObjectValue, PathSegment,
    RootRef, SourceRoot, Table, TableError, TableGenerator, TypeDesc, TypeRegistry, Value,
    KEY_COLUMN, VALUES_COLUMN, VALUE_COLUMN,
};
use std::cell::RefCell;
use std::rc::Rc;

fn registry() -> TypeRegistry {
    let mut reg = TypeRegistry::new();
    reg.register_enum(EnumType::new("Rarity", ["Common", "Rare", "Epic"]));
    reg.register_object(
        ObjectType::new("Stats")
            .value_type()
            .field("hp", TypeDesc::Int(IntKind::I32))
            .field("speed", TypeDesc::Float(FloatKind::F32)),
    );
    reg.register_object(
        ObjectType::new("Hero")
            .field("name", TypeDesc::String)
            .field("stats", TypeDesc::object("Stats"))
            .field("tags", TypeDesc::list(TypeDesc::String))
            .field("parts", TypeDesc::list(TypeDesc::object("Stats")))
            .field(
                "attrs",
                TypeDesc::dictionary(TypeDesc::String, TypeDesc::Int(IntKind::I32)),
            )
            .field("mesh", TypeDesc::Other("Mesh".into())),
    );
    reg.register_object(ObjectType::new("Weapon").field("damage", TypeDesc::Int(IntKind::I32)));
    reg.register_object(
        ObjectType::new("Sword")
            .with_base("Weapon")
            .field("edge", TypeDesc::Float(FloatKind::F32)),
    );
    reg.register_object(
        ObjectType::new("Bow")
            .with_base("Weapon")
            .field("range", TypeDesc::Float(FloatKind::F32)),
    );
    reg
}

fn stats(hp: i64, speed: f32) -> Value {
    Value::Object(
        ObjectValue::new("Stats")
            .with_field("hp", hp)
            .with_field("speed", speed),
    )
}

fn hero(name: &str) -> RootRef {
    SourceRoot::new(Value::Object(
        ObjectValue::new("Hero")
            .with_field("name", name)
            .with_field("stats", stats(10, 1.5))
            .with_field("tags", vec![Value::from("a"), Value::from("b")])
            .with_field("parts", vec![stats(1, 0.5), stats(2, 0.25)])
            .with_field(
                "attrs",
                Value::Dictionary(vec![
                    (Value::from("a"), Value::Int(1)),
                    (Value::from("b"), Value::Int(2)),
                ]),
            )
            .with_field("mesh", Value::Null),
    ))
}

fn hero_table(roots: &[RootRef]) -> Table {
    TableGenerator::new(registry())
        .into_ref()
        .generate_for_roots("Heroes", roots)
        .unwrap()
}

fn names(table: &Table) -> Vec<String> {
    table.rows().map(|r| r.name().to_string()).collect()
}

// ===== Generation =====

#[test]
fn test_columns_follow_declared_fields() {
    let table = hero_table(&[hero("ayla")]);

    let columns: Vec<&str> = table.columns().map(|c| c.name()).collect();
    assert_eq!(columns, vec!["name", "stats", "tags", "parts", "attrs", "mesh"]);
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.row(1).unwrap().name(), "Row1");

    let kinds: Vec<CellKind> = table.row(1).unwrap().cells().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            CellKind::String,
            CellKind::Object,
            CellKind::List,
            CellKind::List,
            CellKind::Dictionary,
            CellKind::Unsupported,
        ]
    );
}

#[test]
fn test_row_names_use_asset_paths() {
    let root = SourceRoot::with_guid(
        uuid_like(),
        Some("Assets/Heroes/Ayla.asset".into()),
        hero("ayla").value(),
    );
    let table = hero_table(&[root, hero("brin")]);
    assert_eq!(names(&table), vec!["Assets/Heroes/Ayla.asset", "Row2"]);
}

fn uuid_like() -> uuid::Uuid {
    uuid::Uuid::from_u128(0x1234)
}

#[test]
fn test_mixed_roots_share_base_columns() {
    let sword = SourceRoot::new(Value::Object(
        ObjectValue::new("Sword")
            .with_field("damage", 7)
            .with_field("edge", 0.5_f32),
    ));
    let bow = SourceRoot::new(Value::Object(
        ObjectValue::new("Bow")
            .with_field("damage", 4)
            .with_field("range", 30.0_f32),
    ));
    let table = TableGenerator::new(registry())
        .into_ref()
        .generate_for_roots("Weapons", &[sword, bow])
        .unwrap();

    assert_eq!(table.column_count(), 1);
    assert_eq!(table.column(1).unwrap().name(), "damage");
    assert_eq!(table.cell(1, 2).unwrap().value(), &Value::Int(4));
}

#[test]
fn test_nested_object_is_one_row_collections_one_row_per_element() {
    let table = hero_table(&[hero("ayla")]);

    let stats = table.cell_at("B1").unwrap().sub_table().unwrap();
    assert_eq!(stats.row_count(), 1);
    assert_eq!(
        stats.columns().map(|c| c.name()).collect::<Vec<_>>(),
        vec!["hp", "speed"]
    );
    assert_eq!(stats.name(), "Heroes.B1");
    assert_eq!(stats.prefix(), Some("B1"));

    let tags = table.cell_at("C1").unwrap().sub_table().unwrap();
    assert_eq!(tags.row_count(), 2);
    assert_eq!(tags.column(1).unwrap().name(), VALUES_COLUMN);
    assert_eq!(names(tags), vec!["0", "1"]);

    let parts = table.cell_at("D1").unwrap().sub_table().unwrap();
    assert_eq!(parts.row_count(), 2);
    assert_eq!(parts.column_count(), 2);

    let attrs = table.cell_at("E1").unwrap().sub_table().unwrap();
    assert_eq!(attrs.row_count(), 2);
    assert_eq!(attrs.column(1).unwrap().name(), KEY_COLUMN);
    assert_eq!(attrs.column(2).unwrap().name(), VALUE_COLUMN);
    assert!(attrs.columns().all(|c| c.is_static()));
    assert_eq!(names(attrs), vec!["a", "b"]);
}

#[test]
fn test_appended_rows_are_located_without_moving_earlier_rows() {
    let roots: Vec<RootRef> = (0..300).map(|i| hero(&format!("hero{i}"))).collect();
    let mut table = hero_table(&roots);

    assert_eq!(table.row_count(), 300);
    assert_eq!(table.row(300).unwrap().position(), 300);
    assert_eq!(table.cell_at("A300").unwrap().value(), &Value::from("hero299"));
    assert_eq!(table.cell_at("D300.B2").unwrap().global_position(), "D300.B2");
    assert_eq!(
        table.cell_at("C150").unwrap().sub_table().unwrap().name(),
        "Heroes.C150"
    );

    let tags = table.cell_at_mut("C1").unwrap();
    tags.add_item(Value::from("c")).unwrap();
    assert_eq!(table.cell_at("C1.A3").unwrap().global_position(), "C1.A3");
    assert_eq!(table.cell_at("C1.A1").unwrap().global_position(), "C1.A1");
}

#[test]
fn test_cell_at_descends_into_sub_tables() {
    let table = hero_table(&[hero("ayla")]);

    assert_eq!(table.cell_at("A1").unwrap().value(), &Value::from("ayla"));
    assert_eq!(table.cell_at("B1.A1").unwrap().value(), &Value::Int(10));
    assert_eq!(table.cell_at("C1.A2").unwrap().value(), &Value::from("b"));
    assert_eq!(table.cell_at("D1.A2").unwrap().value(), &Value::Int(2));
    assert_eq!(table.cell_at("E1.B1").unwrap().value(), &Value::Int(1));
    assert_eq!(table.cell_at("D1.B2").unwrap().global_position(), "D1.B2");

    assert!(matches!(
        table.cell_at("A1.A1"),
        Err(TableError::CellNotFound(_))
    ));
    assert!(matches!(
        table.cell_at("Z9"),
        Err(TableError::CellNotFound(_))
    ));
    assert!(table.cell_at("not a cell").is_err());
}

#[test]
fn test_null_nested_object_has_columns_and_no_rows() {
    let root = hero("ayla");
    let mut table = hero_table(&[root]);
    table.set_value_by_name(1, "stats", Value::Null).unwrap();

    let stats = table.cell_at("B1").unwrap().sub_table().unwrap();
    assert_eq!(stats.row_count(), 0);
    assert_eq!(stats.column_count(), 2);
}

// ===== Editing =====

#[test]
fn test_set_value_marks_root_dirty_and_notifies() {
    let root = hero("ayla");
    let events: Rc<RefCell<Vec<ChangeEvent>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    root.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    let mut table = hero_table(&[root.clone()]);
    assert!(!root.is_dirty());

    table.set_value_at("C1.A1", Value::from("z")).unwrap();
    assert!(root.is_dirty());
    assert_eq!(
        events.borrow().last().unwrap().path,
        vec![PathSegment::Field("tags".into()), PathSegment::Index(0)]
    );
    assert_eq!(
        table.cell_at("C1").unwrap().value(),
        &Value::List(vec![Value::from("z"), Value::from("b")])
    );

    root.clear_dirty();
    table.set_value(1, 1, Value::from("brin")).unwrap();
    assert!(root.is_dirty());
    assert_eq!(events.borrow().len(), 2);
}

#[test]
fn test_set_value_coerces_and_rejects() {
    let mut table = hero_table(&[hero("ayla")]);

    table.set_value_at("B1.A1", Value::from("42")).unwrap();
    assert_eq!(table.cell_at("B1.A1").unwrap().value(), &Value::Int(42));
    assert_eq!(
        table.cell_at("B1").unwrap().value(),
        &stats(42, 1.5)
    );

    assert!(table.set_value_at("B1.A1", Value::from("fast")).is_err());
    assert!(table.set_value_by_name(1, "mesh", Value::from("cube")).is_err());
    assert!(matches!(
        table.set_value_by_name(1, "missing", Value::Null),
        Err(TableError::ColumnNameNotFound { .. })
    ));
}

#[test]
fn test_add_then_remove_restores_collection() {
    let root = hero("ayla");
    let mut table = hero_table(&[root.clone()]);
    let before = root.value();

    let cell = table.cell_at_mut("C1").unwrap();
    let position = cell.add_item(Value::from("c")).unwrap();
    assert_eq!(position, 3);
    assert_eq!(cell.item_count().unwrap(), 3);
    assert_eq!(cell.sub_table().unwrap().row_count(), 3);

    cell.remove_item(position).unwrap();
    assert_eq!(cell.item_count().unwrap(), 2);
    assert_eq!(cell.sub_table().unwrap().row_count(), 2);
    assert_eq!(root.value(), before);
}

#[test]
fn test_add_empty_item_uses_defaults() {
    let mut table = hero_table(&[hero("ayla")]);

    let parts = table.cell_at_mut("D1").unwrap();
    parts.add_empty_item().unwrap();
    assert_eq!(
        parts.get_items().unwrap().as_list().unwrap().last(),
        Some(&stats(0, 0.0))
    );

    let attrs = table.cell_at_mut("E1").unwrap();
    attrs.add_empty_item().unwrap();
    let items = attrs.get_items().unwrap();
    let keys: Vec<&Value> = items.as_dictionary().unwrap().iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![&Value::from("a"), &Value::from("b"), &Value::from("")]);
}

#[test]
fn test_collection_ops_on_scalar_cell_fail() {
    let mut table = hero_table(&[hero("ayla")]);
    let cell = table.cell_at_mut("A1").unwrap();
    assert!(matches!(
        cell.add_item(Value::from("x")),
        Err(TableError::Unsupported(_))
    ));
    assert!(cell.item_count().is_err());
}

#[test]
fn test_duplicate_dictionary_key_is_rejected() {
    let root = hero("ayla");
    let mut table = hero_table(&[root.clone()]);

    let err = table.set_value_at("E1.A1", Value::from("b")).unwrap_err();
    assert!(err.is_invalid_cell_value());

    let attrs = table.cell_at("E1").unwrap();
    let items = attrs.get_items().unwrap();
    let keys: Vec<&Value> = items.as_dictionary().unwrap().iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![&Value::from("a"), &Value::from("b")]);

    let attrs = table.cell_at_mut("E1").unwrap();
    assert!(attrs
        .edit_sub_table(|sub| sub.add_entry(Value::from("a"), Value::Int(5)))
        .unwrap_err()
        .is_invalid_cell_value());
    assert_eq!(attrs.sub_table().unwrap().row_count(), 2);
    assert_eq!(attrs.value().item_count(), Some(2));
}

#[test]
fn test_dictionary_key_rename_renames_row() {
    let mut table = hero_table(&[hero("ayla")]);

    table.set_value_at("E1.A1", Value::from("c")).unwrap();
    let attrs = table.cell_at("E1").unwrap();
    assert_eq!(names(attrs.sub_table().unwrap()), vec!["c", "b"]);
    assert_eq!(
        attrs.value(),
        &Value::Dictionary(vec![
            (Value::from("c"), Value::Int(1)),
            (Value::from("b"), Value::Int(2)),
        ])
    );
}

#[test]
fn test_list_row_removal_compacts() {
    let root = SourceRoot::new(Value::Object(
        ObjectValue::new("Hero")
            .with_field("name", "ayla")
            .with_field("stats", Value::Null)
            .with_field(
                "tags",
                vec![Value::from("x"), Value::from("y"), Value::from("z")],
            )
            .with_field("parts", Vec::<Value>::new())
            .with_field("attrs", Value::Dictionary(Vec::new()))
            .with_field("mesh", Value::Null),
    ));
    let mut table = hero_table(&[root]);

    let tags = table.cell_at_mut("C1").unwrap();
    tags.remove_item(2).unwrap();

    let sub = tags.sub_table().unwrap();
    assert_eq!(sub.row_count(), 2);
    assert_eq!(names(sub), vec!["0", "1"]);
    assert_eq!(sub.cell(1, 2).unwrap().value(), &Value::from("z"));
    assert_eq!(sub.cell(1, 2).unwrap().position(), "A2");
    assert_eq!(
        tags.value(),
        &Value::List(vec![Value::from("x"), Value::from("z")])
    );
    assert!(matches!(
        tags.remove_item(3),
        Err(TableError::RowNotFound { .. })
    ));
}

#[test]
fn test_plain_row_removal_leaves_data() {
    let roots = [hero("a"), hero("b"), hero("c"), hero("d")];
    let mut table = hero_table(&roots);

    table.remove_row(2).unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(names(&table), vec!["Row1", "Row3", "Row4"]);
    assert_eq!(
        table.rows().map(|r| r.position()).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(table.cell(1, 2).unwrap().value(), &Value::from("c"));
    assert_eq!(table.cell(1, 3).unwrap().value(), &Value::from("d"));
    assert_eq!(table.cell_at("B2.A1").unwrap().global_position(), "B2.A1");
    assert!(roots.iter().all(|r| !r.is_dirty()));
}

#[test]
fn test_sub_table_edits_keep_cached_value_in_step() {
    let root = hero("ayla");
    let mut table = hero_table(&[root]);
    let tags = table.cell_at_mut("C1").unwrap();
    tags.add_item(Value::from("c")).unwrap();

    tags.edit_sub_table(|sub| sub.remove_row(1)).unwrap();
    let expected = Value::List(vec![Value::from("b"), Value::from("c")]);
    assert_eq!(tags.sub_table().unwrap().row_count(), 2);
    assert_eq!(tags.value(), &expected);
    assert_eq!(tags.get_items().unwrap(), expected);

    assert!(tags.edit_sub_table(|sub| sub.remove_row(5)).is_err());
    assert_eq!(tags.value().item_count(), Some(2));

    let name = table.cell_at_mut("A1").unwrap();
    assert!(matches!(
        name.edit_sub_table(|sub| sub.remove_row(1)),
        Err(TableError::Unsupported(_))
    ));
}

// ===== Ordering =====

#[test]
fn test_move_row_in_list_reorders_live_list() {
    let mut table = hero_table(&[hero("ayla")]);
    let parts = table.cell_at_mut("D1").unwrap();
    parts.add_item(stats(3, 0.125)).unwrap();

    assert!(parts.edit_sub_table(|sub| sub.move_row(1, 3)).unwrap());
    let expected = Value::List(vec![stats(2, 0.25), stats(3, 0.125), stats(1, 0.5)]);
    assert_eq!(parts.get_items().unwrap(), expected);
    assert_eq!(parts.value(), &expected);

    let sub = parts.sub_table().unwrap();
    assert_eq!(sub.cell(1, 3).unwrap().value(), &Value::Int(1));
    assert_eq!(names(sub), vec!["0", "1", "2"]);
}

#[test]
fn test_static_anchors_block_moves() {
    let mut table = hero_table(&[hero("a"), hero("b"), hero("c")]);

    table.set_row_static(2, true).unwrap();
    assert!(!table.move_row(1, 3).unwrap());
    assert!(!table.move_row(2, 1).unwrap());
    assert_eq!(names(&table), vec!["Row1", "Row2", "Row3"]);

    table.set_row_static(2, false).unwrap();
    assert!(table.move_row(1, 3).unwrap());
    assert_eq!(names(&table), vec!["Row2", "Row3", "Row1"]);

    let attrs = table.cell_at_mut("E1").unwrap();
    assert!(!attrs.edit_sub_table(|sub| sub.move_column(1, 2)).unwrap());
    assert_eq!(
        attrs.sub_table().unwrap().column(1).unwrap().name(),
        KEY_COLUMN
    );
}

#[test]
fn test_move_and_swap_columns() {
    let mut table = hero_table(&[hero("ayla")]);

    assert!(table.move_column(1, 3).unwrap());
    let columns: Vec<&str> = table.columns().map(|c| c.name()).collect();
    assert_eq!(columns[..3], ["stats", "tags", "name"]);
    assert_eq!(table.cell(3, 1).unwrap().value(), &Value::from("ayla"));
    assert_eq!(table.cell_at("A1.A1").unwrap().value(), &Value::Int(10));
    assert_eq!(
        table.cell_at("A1").unwrap().sub_table().unwrap().name(),
        "Heroes.A1"
    );

    table.swap_columns(1, 3).unwrap();
    assert_eq!(table.column(1).unwrap().name(), "name");
    assert!(table.swap_columns(1, 40).is_err());
}

#[test]
fn test_dictionary_swap_only_moves_rows() {
    let mut table = hero_table(&[hero("ayla")]);
    let attrs = table.cell_at_mut("E1").unwrap();

    attrs.edit_sub_table(|sub| sub.swap_rows(1, 2)).unwrap();
    assert_eq!(names(attrs.sub_table().unwrap()), vec!["b", "a"]);
    assert_eq!(
        attrs.get_items().unwrap(),
        Value::Dictionary(vec![
            (Value::from("a"), Value::Int(1)),
            (Value::from("b"), Value::Int(2)),
        ])
    );

    attrs.refresh().unwrap();
    assert_eq!(names(attrs.sub_table().unwrap()), vec!["b", "a"]);
}

#[test]
fn test_sort_by_column() {
    let roots = [hero("cleo"), hero("ayla"), hero("brin")];
    let mut table = hero_table(&roots);

    table.sort_by_column(1, true).unwrap();
    assert_eq!(names(&table), vec!["Row2", "Row3", "Row1"]);

    table.sort_by_column(1, false).unwrap();
    assert_eq!(names(&table), vec!["Row1", "Row3", "Row2"]);

    // Unsupported columns are left alone.
    table.sort_by_column(6, true).unwrap();
    assert_eq!(names(&table), vec!["Row1", "Row3", "Row2"]);
}

#[test]
fn test_set_row_order_validation() {
    let mut table = hero_table(&[hero("a"), hero("b"), hero("c")]);

    assert!(matches!(
        table.set_row_order(&[1, 2]),
        Err(TableError::InvalidRowOrder(_))
    ));
    assert!(matches!(
        table.set_row_order(&[1, 1, 2]),
        Err(TableError::InvalidRowOrder(_))
    ));
    assert!(matches!(
        table.set_row_order(&[1, 2, 4]),
        Err(TableError::InvalidRowOrder(_))
    ));

    table.set_row_order(&[3, 1, 2]).unwrap();
    assert_eq!(names(&table), vec!["Row3", "Row1", "Row2"]);
    assert_eq!(table.row(1).unwrap().position(), 1);
}

// ===== Refresh =====

#[test]
fn test_refresh_picks_up_external_writes() {
    let root = hero("ayla");
    let mut table = hero_table(&[root.clone()]);

    let mut other = hero_table(&[root]);
    other
        .cell_at_mut("C1")
        .unwrap()
        .add_item(Value::from("c"))
        .unwrap();

    assert_eq!(table.cell_at("C1").unwrap().sub_table().unwrap().row_count(), 2);
    table.refresh().unwrap();
    assert_eq!(table.cell_at("C1").unwrap().sub_table().unwrap().row_count(), 3);
    assert_eq!(table.cell_at("C1.A3").unwrap().value(), &Value::from("c"));
}
