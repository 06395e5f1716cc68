use pretty_assertions::assert_eq;

use super::*;

#[test]
fn basics_at_fixed_indices() {
    let pool = Pool::new();
    for (i, tag) in Tag::BASICS.into_iter().enumerate() {
        assert_eq!(pool.tag(Idx::from_raw(i as u32)), tag);
    }
    assert_eq!(pool.tag(Idx::BYTE), Tag::Uint8);
    assert_eq!(pool.len(), Idx::FIRST_DYNAMIC as usize);
}

#[test]
fn predeclared_types() {
    let pool = Pool::new();
    assert_eq!(pool.format_type(Idx::ERROR), "error");
    assert_eq!(pool.format_type(Idx::ANY), "interface{}");
    assert_eq!(pool.format_type(Idx::ERROR_IFACE), "interface{Error() string}");
    assert_eq!(pool.format_type(Idx::RUNTIME_ERROR), "runtime.Error");
    assert_eq!(pool.format_type(Idx::EMPTY_TUPLE), "()");
    assert_eq!(pool.underlying(Idx::ERROR), Idx::ERROR_IFACE);
    assert!(pool.is_interface(Idx::ERROR));
    assert_eq!(pool.named_info(Idx::RUNTIME_ERROR).methods.len(), 1);
}

#[test]
fn structural_types_are_hash_consed() {
    let mut pool = Pool::new();
    let a = pool.slice(Idx::INT);
    let b = pool.slice(Idx::INT);
    assert_eq!(a, b);

    let m1 = pool.map(Idx::STRING, a);
    let m2 = pool.map(Idx::STRING, b);
    assert_eq!(m1, m2);
    assert_ne!(m1, pool.map(Idx::STRING, Idx::INT));

    let s1 = pool.signature(&[Idx::INT], &[Idx::STRING], false);
    let s2 = pool.signature(&[Idx::INT], &[Idx::STRING], false);
    assert_eq!(s1, s2);
}

#[test]
fn struct_identity_includes_names_and_tags() {
    let mut pool = Pool::new();
    let x = pool.intern_name("x");
    let y = pool.intern_name("y");
    let json = pool.intern_name("json:\"x\"");

    let s1 = pool.struct_type(&[Field::new(x, Idx::INT)]);
    let s2 = pool.struct_type(&[Field::new(x, Idx::INT)]);
    let s3 = pool.struct_type(&[Field::new(y, Idx::INT)]);
    let s4 = pool.struct_type(&[Field {
        tag: json,
        ..Field::new(x, Idx::INT)
    }]);
    assert_eq!(s1, s2);
    assert_ne!(s1, s3);
    assert_ne!(s1, s4);
    assert_eq!(pool.format_type(s4), "struct{x int \"json:\\\"x\\\"\"}");
}

#[test]
fn interface_methods_are_canonical() {
    let mut pool = Pool::new();
    let a = pool.intern_name("A");
    let b = pool.intern_name("B");
    let sig = pool.signature(&[], &[], false);
    let m_a = IfaceMethod { name: a, sig };
    let m_b = IfaceMethod { name: b, sig };

    let i1 = pool.interface(&[m_b, m_a], None);
    let i2 = pool.interface(&[m_a, m_b], None);
    assert_eq!(i1, i2);
    assert_eq!(pool.format_type(i1), "interface{A(); B()}");
}

#[test]
fn named_types_are_nominal() {
    let mut pool = Pool::new();
    let t1 = pool.named("main", "T", Idx::INT);
    let t2 = pool.named("main", "T", Idx::INT);
    assert_ne!(t1, t2);
    assert_eq!(pool.underlying(t1), pool.underlying(t2));
    assert!(pool.flags(t1).contains(TypeFlags::IS_NAMED | TypeFlags::IS_INTEGER));
}

#[test]
fn underlying_of_named_chain_is_flattened() {
    let mut pool = Pool::new();
    let a = pool.named("main", "A", Idx::STRING);
    let b = pool.named("main", "B", a);
    assert_eq!(pool.underlying(b), Idx::STRING);
}

#[test]
fn unset_underlying_reads_as_invalid() {
    let mut pool = Pool::new();
    let name = pool.intern_name("Later");
    let t = pool.new_named(Name::EMPTY, name);
    assert_eq!(pool.underlying(t), Idx::INVALID);
}

#[test]
fn format_go_syntax() {
    let mut pool = Pool::new();
    let t = pool.named("main", "T", Idx::INT);
    let pt = pool.pointer(t);
    assert_eq!(pool.format_type(pt), "*main.T");

    let sig = pool.signature(&[Idx::INT], &[Idx::STRING], false);
    assert_eq!(pool.format_type(sig), "func(int) string");

    let ints = pool.slice(Idx::INT);
    let variadic = pool.signature(&[Idx::STRING, ints], &[Idx::INT, Idx::ERROR], true);
    assert_eq!(pool.format_type(variadic), "func(string, ...int) (int, error)");

    let send = pool.chan(ChanDir::Send, Idx::INT);
    let recv = pool.chan(ChanDir::Recv, Idx::INT);
    let both = pool.chan(ChanDir::Both, recv);
    assert_eq!(pool.format_type(send), "chan<- int");
    assert_eq!(pool.format_type(recv), "<-chan int");
    assert_eq!(pool.format_type(both), "chan (<-chan int)");

    let arr = pool.array(Idx::UINT8, 4);
    assert_eq!(pool.format_type(arr), "[4]uint8");

    let m = pool.map(Idx::STRING, ints);
    assert_eq!(pool.format_type(m), "map[string][]int");

    let tup = pool.tuple(&[Idx::INT, Idx::BOOL]);
    assert_eq!(pool.format_type(tup), "(int, bool)");
}

#[test]
fn queries_see_through_named() {
    let mut pool = Pool::new();
    let ints = pool.slice(Idx::INT);
    let list = pool.named("main", "List", ints);
    assert_eq!(pool.elem(list), Idx::INT);

    let arr = pool.array(Idx::BOOL, 1 << 40);
    assert_eq!(pool.array_len(arr), 1 << 40);

    let sig = pool.signature(&[Idx::INT, Idx::INT], &[Idx::BOOL], false);
    assert_eq!(pool.params(sig), vec![Idx::INT, Idx::INT]);
    assert_eq!(pool.results(sig), vec![Idx::BOOL]);
    assert!(!pool.is_variadic(sig));
}

#[test]
fn nil_flags() {
    let mut pool = Pool::new();
    let p = pool.pointer(Idx::INT);
    let s = pool.slice(Idx::INT);
    let arr = pool.array(Idx::INT, 2);
    assert!(pool.flags(p).contains(TypeFlags::HAS_NIL));
    assert!(pool.flags(s).contains(TypeFlags::HAS_NIL));
    assert!(!pool.flags(arr).contains(TypeFlags::HAS_NIL));
    assert!(pool.flags(Idx::ANY).contains(TypeFlags::HAS_NIL | TypeFlags::IS_INTERFACE));
}
