use gridgraph_primitives::{
    get_position, parse_path, parse_position, to_letters, to_number, AddressError, Position,
};

#[test]
fn test_letters_number_roundtrip() {
    for n in 1..=100_000 {
        let letters = to_letters(n).unwrap();
        assert_eq!(to_number(&letters).unwrap(), n, "roundtrip failed for {n}");
    }
}

#[test]
fn test_known_letters() {
    let cases = [(1, "A"), (26, "Z"), (27, "AA"), (702, "ZZ"), (703, "AAA")];
    for (n, letters) in cases {
        assert_eq!(to_letters(n).unwrap(), letters);
        assert_eq!(to_number(letters).unwrap(), n);
    }
}

#[test]
fn test_position_roundtrip() {
    assert_eq!(get_position(2, 3).unwrap(), "B3");
    assert_eq!(parse_position("B3").unwrap(), Position::new(2, 3));

    for column in 1..=60 {
        for row in 1..=40 {
            let notation = get_position(column, row).unwrap();
            assert_eq!(parse_position(&notation).unwrap(), Position::new(column, row));
        }
    }
}

#[test]
fn test_invalid_inputs() {
    assert_eq!(to_letters(0), Err(AddressError::NonPositive(0)));
    assert!(matches!(
        to_number("A-"),
        Err(AddressError::InvalidLetters(_))
    ));
    assert!(matches!(
        parse_position("Bx"),
        Err(AddressError::InvalidPosition(_))
    ));
    for notation in ["B+3", "B-3", "B 3", "B3x"] {
        assert!(
            matches!(parse_position(notation), Err(AddressError::InvalidPosition(_))),
            "{notation} should not parse"
        );
    }
    assert!(get_position(0, 1).is_err());
    assert!(get_position(1, 0).is_err());
}

#[test]
fn test_nested_path() {
    let segments = parse_path("C2.B1.A4").unwrap();
    assert_eq!(
        segments,
        vec![Position::new(3, 2), Position::new(2, 1), Position::new(1, 4)]
    );
    assert!(parse_path("C2..A1").is_err());
}
