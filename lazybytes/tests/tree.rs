use lazybytes::array::encode_elements;
use lazybytes::{ByteArray, Error, TREE_MAX_ELEMENTS, Tree, TreePath};

/// Root: [ [ "in0", "in1" ], "plain", [ [ "deep" ] ] ]
fn sample_bytes() -> Vec<u8> {
    let inputs = encode_elements(&[b"in0".as_slice(), b"in1".as_slice()]).unwrap();
    let deep = encode_elements(&[b"deep".as_slice()]).unwrap();
    let nested = encode_elements(&[deep]).unwrap();
    encode_elements(&[inputs, b"plain".to_vec(), nested]).unwrap()
}

#[test]
fn reads_by_path() {
    let mut tree = Tree::from_bytes(sample_bytes());
    assert_eq!(tree.num_elements_at_path(&[]).unwrap(), 3);
    assert_eq!(tree.bytes_at_path(&[0, 1]).unwrap(), b"in1");
    assert_eq!(tree.bytes_at_path(&[1]).unwrap(), b"plain");
    assert_eq!(tree.bytes_at_path(&[2, 0, 0]).unwrap(), b"deep");
    assert_eq!(tree.num_elements_at_path(&[2, 0]).unwrap(), 1);
}

#[test]
fn unmodified_tree_reserializes_identically() {
    let raw = sample_bytes();
    let mut tree = Tree::from_bytes(raw.clone());
    tree.bytes_at_path(&[2, 0, 0]).unwrap();
    tree.bytes_at_path(&[0, 0]).unwrap();
    let first = tree.bytes().unwrap();
    let second = tree.bytes().unwrap();
    assert_eq!(first, raw);
    assert_eq!(first, second);
}

#[test]
fn deep_write_propagates_to_root() {
    let mut tree = Tree::from_bytes(sample_bytes());
    tree.push_data_at_path(b"deeper".to_vec(), &[2, 0]).unwrap();
    tree.set_data_at_path_at_idx(0, b"IN0".to_vec(), &[0]).unwrap();

    let mut reread = Tree::from_bytes(tree.bytes().unwrap());
    assert_eq!(reread.bytes_at_path(&[2, 0, 1]).unwrap(), b"deeper");
    assert_eq!(reread.bytes_at_path(&[0, 0]).unwrap(), b"IN0");
    assert_eq!(reread.bytes_at_path(&[1]).unwrap(), b"plain");
}

#[test]
fn reading_a_parent_element_sees_child_writes() {
    let mut tree = Tree::from_bytes(sample_bytes());
    tree.push_data_at_path(b"in2".to_vec(), &[0]).unwrap();

    let inputs = tree.bytes_at_path(&[0]).unwrap();
    let mut arr = ByteArray::from_bytes(inputs);
    assert_eq!(arr.len().unwrap(), 3);
    assert_eq!(arr.at(2).unwrap(), b"in2");
}

#[test]
fn reading_through_a_child_keeps_the_root_in_step() {
    let mut tree = Tree::new();
    tree.push_new_subtree_at_path(&[]).unwrap();
    tree.bytes().unwrap();
    tree.push_data_at_path(b"x".to_vec(), &[0]).unwrap();
    assert_eq!(tree.bytes_at_path(&[0]).unwrap(), encode_elements(&[b"x"]).unwrap());

    let mut reread = Tree::from_bytes(tree.bytes().unwrap());
    assert_eq!(reread.num_elements_at_path(&[0]).unwrap(), 1);
    assert_eq!(reread.bytes_at_path(&[0, 0]).unwrap(), b"x");

    // Same through two levels, reading the deepest node first.
    let mut tree = Tree::from_bytes(sample_bytes());
    tree.push_data_at_path(b"deeper".to_vec(), &[2, 0]).unwrap();
    tree.bytes_at_path(&[2, 0]).unwrap();
    tree.bytes_at_path(&[2]).unwrap();
    let mut reread = Tree::from_bytes(tree.bytes().unwrap());
    assert_eq!(reread.bytes_at_path(&[2, 0, 1]).unwrap(), b"deeper");
}

#[test]
fn building_from_scratch() {
    let mut tree = Tree::new();
    let tx = tree.push_new_subtree_at_path(&[]).unwrap();
    let outputs = tree.push_new_subtree_at_path(&[tx]).unwrap();
    tree.push_data_at_path(vec![1, 2, 3], &[tx, outputs]).unwrap();

    let mut sub = Tree::new();
    sub.push_data_at_path(b"lock".to_vec(), &[]).unwrap();
    tree.push_subtree_at_path(&mut sub, &[tx, outputs]).unwrap();

    assert_eq!(tree.bytes_at_path(&[0, 0, 1, 0]).unwrap(), b"lock");
    let mut copy = tree.subtree_at_path(&[0, 0]).unwrap();
    assert_eq!(copy.num_elements_at_path(&[]).unwrap(), 2);
}

#[test]
fn missing_paths_are_distinct_errors() {
    let mut tree = Tree::from_bytes(sample_bytes());
    assert_eq!(
        tree.bytes_at_path(&[7]),
        Err(Error::PathNotFound {
            path: TreePath::from([7])
        })
    );
    assert_eq!(
        tree.bytes_at_path(&[0, 9]),
        Err(Error::PathNotFound {
            path: TreePath::from([0, 9])
        })
    );
    assert_eq!(
        tree.push_data_at_path(vec![1], &[1]),
        Err(Error::NotAnArray {
            path: TreePath::from([1])
        })
    );
    assert!(tree.bytes_at_path(&[1, 0]).unwrap_err().is_not_an_array());
}

#[test]
fn tree_arrays_cap_at_255_elements() {
    let mut tree = Tree::new();
    for i in 0..TREE_MAX_ELEMENTS {
        assert_eq!(tree.push_data_at_path(vec![], &[]).unwrap() as usize, i);
    }
    assert!(tree.is_full_at_path(&[]).unwrap());
    assert_eq!(
        tree.push_data_at_path(vec![], &[]),
        Err(Error::TooManyElements {
            max: TREE_MAX_ELEMENTS
        })
    );
}

#[test]
fn replacing_a_subtree() {
    let mut tree = Tree::from_bytes(sample_bytes());
    let mut replacement = Tree::new();
    replacement.push_data_at_path(b"x".to_vec(), &[]).unwrap();
    tree.bytes_at_path(&[0, 0]).unwrap();
    tree.set_subtree_at_path_at_idx(0, &mut replacement, &[]).unwrap();
    assert_eq!(tree.num_elements_at_path(&[0]).unwrap(), 1);
    assert_eq!(tree.bytes_at_path(&[0, 0]).unwrap(), b"x");
}
