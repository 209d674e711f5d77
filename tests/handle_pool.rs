use glslbox::utils::handle::{Handle, HandleLike};
use glslbox::utils::handle_pool::HandlePool;
use glslbox::utils::object_pool::ObjectPool;

#[test]
fn handle_pool_reuses_indices_with_new_versions() {
    let mut pool = HandlePool::<Handle>::new();

    let h1 = pool.create();
    let h2 = pool.create();
    assert_ne!(h1, h2);
    assert_eq!(pool.len(), 2);

    assert!(pool.free(h1));
    assert!(!pool.free(h1));
    assert!(!pool.is_alive(h1));

    let h3 = pool.create();
    assert_eq!(h3.index(), h1.index());
    assert_ne!(h3.version(), h1.version());
    assert!(pool.is_alive(h3));
}

#[test]
fn object_pool_frees_values() {
    let mut pool = ObjectPool::<Handle, String>::new();

    let h1 = pool.create("wall".to_string());
    let h2 = pool.create("dirt".to_string());

    assert_eq!(pool.get(h1).map(String::as_str), Some("wall"));
    assert_eq!(pool.free(h1), Some("wall".to_string()));
    assert_eq!(pool.get(h1), None);

    let values: Vec<&String> = pool.values().collect();
    assert_eq!(values.len(), 1);
    assert_eq!(pool.get(h2).map(String::as_str), Some("dirt"));
}
