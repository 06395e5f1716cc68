use super::*;

#[test]
fn empty_string_is_pre_interned() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.lookup(Name::EMPTY), "");
    assert_eq!(interner.len(), 1);
}

#[test]
fn interning_is_idempotent() {
    let interner = StringInterner::new();
    let a = interner.intern("main");
    let b = interner.intern("main");
    let c = interner.intern("init");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.lookup(a), "main");
    assert_eq!(interner.lookup(c), "init");
}

#[test]
fn unknown_name_resolves_to_placeholder() {
    let interner = StringInterner::new();
    assert_eq!(interner.lookup(Name::from_raw(999)), "<unknown>");
}

#[test]
fn shared_interner_is_usable_across_threads() {
    let interner = StringInterner::shared();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let interner = Arc::clone(&interner);
            std::thread::spawn(move || interner.intern(&format!("v{}", i % 2)))
        })
        .collect();
    let names: Vec<Name> = handles
        .into_iter()
        .map(|h| h.join().unwrap_or(Name::EMPTY))
        .collect();
    assert_eq!(names[0], names[2]);
    assert_eq!(names[1], names[3]);
}
