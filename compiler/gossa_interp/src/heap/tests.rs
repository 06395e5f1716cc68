use pretty_assertions::assert_eq;

use super::*;

#[test]
fn projected_store_aliases_the_cell() {
    let mut heap = Heap::new();
    let p = heap.alloc(Value::Struct(vec![
        Value::Int(1),
        Value::Array(vec![Value::Int(0), Value::Int(0)]),
    ]));
    let elem = p.project(1).project(1);
    heap.store(&elem, Value::Int(9)).unwrap();
    assert_eq!(
        heap.load(&p).unwrap(),
        Value::Struct(vec![
            Value::Int(1),
            Value::Array(vec![Value::Int(0), Value::Int(9)])
        ])
    );
}

#[test]
fn projecting_through_a_scalar_is_an_internal_error() {
    let mut heap = Heap::new();
    let p = heap.alloc(Value::Int(1));
    assert!(matches!(heap.load(&p.project(0)), Err(Fatal::Internal(_))));
}

#[test]
fn slices_share_their_backing_array() {
    let mut heap = Heap::new();
    let Value::Slice(whole) = heap.alloc_slice(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    else {
        panic!("expected a slice");
    };
    let tail = SliceRef {
        offset: 1,
        len: 2,
        cap: 2,
        ..whole.clone()
    };
    heap.store(&tail.elem(0), Value::Int(20)).unwrap();
    assert_eq!(
        heap.slice_elems(&whole).unwrap(),
        vec![Value::Int(1), Value::Int(20), Value::Int(3)]
    );
    assert_eq!(heap.elems_of(&Value::Nil).unwrap(), Vec::new());
}

#[test]
fn map_delete_keeps_index_consistent() {
    let mut m = MapObject::default();
    for i in 0..4 {
        m.insert(MapKey::Int(i), Value::Int(i), Value::Int(i * 10));
    }
    m.remove(&MapKey::Int(1));
    assert_eq!(m.len(), 3);
    assert_eq!(m.get(&MapKey::Int(3)), Some(&Value::Int(30)));
    assert_eq!(m.get(&MapKey::Int(1)), None);
    m.insert(MapKey::Int(3), Value::Int(3), Value::Int(33));
    assert_eq!(m.get(&MapKey::Int(3)), Some(&Value::Int(33)));
    assert_eq!(m.len(), 3);
    m.remove(&MapKey::Int(42));
    assert_eq!(m.len(), 3);
    m.clear();
    assert!(m.is_empty());
}
