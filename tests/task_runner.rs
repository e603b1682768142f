use gofer_lib::{Error, Registry, TaskList};
use std::fs;

#[test]
fn test_yaml_tasks_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src/sub")).unwrap();
    fs::create_dir(root.join("dst")).unwrap();
    fs::create_dir(root.join("inbox")).unwrap();
    fs::write(root.join("src/a.txt"), "A").unwrap();
    fs::write(root.join("src/sub/b.txt"), "B").unwrap();
    fs::write(root.join("dst/old.txt"), "old").unwrap();
    fs::write(root.join("inbox/report.csv"), "1,2").unwrap();

    let yaml = format!(
        r#"
all-tasks:
- recipe: one-way-sync
  options:
    dry-run: "no"
    delete: "yes"
  names:
  - {root}/dst
  - {root}/src
- recipe: move-new-files
  options:
    dry-run: "no"
    suffix: ".csv"
  names:
  - {root}/dst/sub
  - {root}/inbox
"#,
        root = root.display()
    );
    let task_file = root.join("tasks.yaml");
    fs::write(&task_file, yaml).unwrap();

    let registry = Registry::builtin().unwrap();
    let tasks = TaskList::load(&task_file).unwrap();
    tasks.exec_all(&registry, true).unwrap();

    assert_eq!(fs::read_to_string(root.join("dst/a.txt")).unwrap(), "A");
    assert_eq!(fs::read_to_string(root.join("dst/sub/b.txt")).unwrap(), "B");
    assert!(!root.join("dst/old.txt").exists());
    assert!(root.join("dst/sub/report.csv").exists());
    assert!(!root.join("inbox/report.csv").exists());
}

#[test]
fn test_failing_task_stops_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "A").unwrap();
    fs::write(&b, "B").unwrap();

    let yaml = format!(
        r#"
all-tasks:
- recipe: swap
  names: ["{a}", "{missing}"]
- recipe: swap
  names: ["{a}", "{b}"]
"#,
        a = a.display(),
        b = b.display(),
        missing = dir.path().join("missing").display()
    );
    let tasks = TaskList::from_yaml(&yaml).unwrap();
    let registry = Registry::builtin().unwrap();

    match tasks.exec_all(&registry, true) {
        Err(Error::Task { index, recipe, source }) => {
            assert_eq!(index, 1);
            assert_eq!(recipe, "swap");
            assert!(matches!(*source, Error::PathNotFound(_)));
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(fs::read_to_string(&a).unwrap(), "A");
}

#[test]
fn test_global_names_override_task_names() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "A").unwrap();
    fs::write(&b, "B").unwrap();

    let yaml = format!(
        r#"
names: ["{a}", "{b}"]
all-tasks:
- recipe: swap
  names: [nowhere1, nowhere2]
"#,
        a = a.display(),
        b = b.display()
    );
    let mut tasks = TaskList::from_yaml(&yaml).unwrap();
    tasks.apply_names(vec![]);
    tasks.exec_all(&Registry::builtin().unwrap(), true).unwrap();
    assert_eq!(fs::read_to_string(&a).unwrap(), "B");
}
