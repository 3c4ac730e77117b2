use nosh_kernel::safe_nanoid;

#[test]
fn default_length_is_twelve() {
    let id = safe_nanoid!();
    assert_eq!(id.len(), 12);
}

#[test]
fn custom_length_is_respected() {
    let id = safe_nanoid!(21);
    assert_eq!(id.len(), 21);
}

#[test]
fn no_ambiguous_characters() {
    for _ in 0..100 {
        let id = safe_nanoid!();
        assert!(
            !id.chars().any(|c| matches!(c, 'I' | 'O' | 'l' | '0' | '1')),
            "ambiguous character in {id}"
        );
    }
}

#[test]
fn ids_are_unique() {
    let mut seen = std::collections::HashSet::new();
    for _ in 0..1000 {
        assert!(seen.insert(safe_nanoid!()), "duplicate id generated");
    }
}
