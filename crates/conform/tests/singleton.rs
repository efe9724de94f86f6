mod common;

use std::sync::Arc;

use common::{config, project};

#[test]
fn test_architecture_is_loaded_once() {
    let first_dir = project(&[("main.go", "package main\n\nfunc main() {}\n")]);
    let other_dir = project(&[("lib/lib.go", "package lib\n")]);

    let first = conform::architecture(first_dir.path(), &config(&[])).unwrap();
    let again = conform::architecture(other_dir.path(), &config(&[])).unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    conform::reset();
    let fresh = conform::architecture(other_dir.path(), &config(&[])).unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert!(fresh.artifact().package("example.com/app/lib").is_some());
    conform::reset();
}
