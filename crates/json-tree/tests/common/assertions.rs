use json_tree::TreeSession;

/// Checks the structural invariants and that the flat array is in
/// depth-first order.
pub fn assert_consistent(session: &TreeSession) {
    if let Err(err) = session.validate_invariants() {
        panic!("{err}");
    }
    assert_eq!(
        session.index().order(),
        session.ordered_ids().as_slice(),
        "flat array is not in depth-first order"
    );
}

/// Every node's depth field equals its number of ancestors.
pub fn assert_depths(session: &TreeSession, depth_key: &str) {
    for key in session.ordered_ids() {
        let mut ancestors = 0;
        let mut current = key.clone();
        while let Some(parent) = session.find_parent(&current).and_then(|l| l.parent) {
            ancestors += 1;
            current = parent;
        }
        let stored = session.payload(&key).and_then(|p| p.get(depth_key)).and_then(|d| d.as_i64());
        assert_eq!(stored, Some(ancestors), "depth of {key}");
    }
}
