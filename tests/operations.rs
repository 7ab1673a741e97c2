use jail_fs::{EntryKind, Jail, JailError, JailConfig, Lookup, Mode, OpenMode};
use std::collections::HashSet;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::tempdir;

fn jail() -> (tempfile::TempDir, Jail) {
    let dir = tempdir().unwrap();
    let jail = Jail::new(dir.path()).unwrap();
    (dir, jail)
}

// ============================================================================
// stat
// ============================================================================

#[test]
fn stat_missing_is_absent() {
    let (_dir, jail) = jail();
    assert!(jail.stat("nope.txt").is_absent());
    assert!(jail.lstat("nope.txt").is_absent());
}

#[test]
fn stat_regular_file() {
    let (dir, jail) = jail();
    fs::write(dir.path().join("hello.txt"), b"hello").unwrap();

    let entry = jail.stat("/hello.txt").unwrap_found();
    assert_eq!(entry.kind, EntryKind::File);
    assert!(entry.is_file());
    assert_eq!(entry.size, Some(5));
    assert_eq!(entry.virtual_path, "/hello.txt");
    assert_eq!(entry.physical_path, jail.root().join("hello.txt"));
    assert!(entry.mtime > std::time::UNIX_EPOCH);
    assert!(entry.ctime > std::time::UNIX_EPOCH);
}

#[test]
fn stat_directory_has_no_size() {
    let (dir, jail) = jail();
    fs::create_dir(dir.path().join("docs")).unwrap();

    let entry = jail.stat("docs").unwrap_found();
    assert_eq!(entry.kind, EntryKind::Directory);
    assert!(entry.is_dir());
    assert_eq!(entry.size, None);

    let root = jail.stat("/").unwrap_found();
    assert!(root.is_dir());
    assert!(root.virtual_path.is_root());
}

#[test]
#[cfg(unix)]
fn lstat_describes_the_link() {
    let (dir, jail) = jail();
    fs::write(dir.path().join("real.txt"), b"x").unwrap();
    std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();

    assert_eq!(jail.stat("link.txt").unwrap_found().kind, EntryKind::File);
    assert_eq!(jail.lstat("link.txt").unwrap_found().kind, EntryKind::Symlink);
    assert!(jail.lstat("/").unwrap_found().is_dir());
}

#[test]
fn jailed_path_entry_is_fresh() {
    let (dir, jail) = jail();
    fs::write(dir.path().join("grow.txt"), b"ab").unwrap();

    let resolved = jail.resolve("grow.txt").unwrap_found();
    assert_eq!(resolved.entry().unwrap_found().size, Some(2));
    fs::write(dir.path().join("grow.txt"), b"abcd").unwrap();
    assert_eq!(resolved.entry().unwrap_found().size, Some(4));

    fs::remove_file(dir.path().join("grow.txt")).unwrap();
    assert!(resolved.entry().is_absent());
}

// ============================================================================
// open / read / write
// ============================================================================

#[test]
fn append_creates_then_read_returns_bytes() {
    let (_dir, jail) = jail();

    let mut file = jail.open("log.txt", OpenMode::Append).unwrap_found();
    file.write_all(b"first ").unwrap();
    drop(file);
    let mut file = jail.open("log.txt", "a".parse().unwrap()).unwrap_found();
    file.write_all(b"second").unwrap();
    drop(file);

    let mut contents = String::new();
    jail.open("log.txt", OpenMode::Read)
        .unwrap_found()
        .read_to_string(&mut contents)
        .unwrap();
    assert_eq!(contents, "first second");
}

#[test]
fn read_mode_on_missing_is_absent() {
    let (_dir, jail) = jail();
    assert!(jail.open("missing.txt", OpenMode::Read).is_absent());
    assert!(jail.open("missing.txt", OpenMode::ReadWrite).is_absent());
    assert!(jail.read("missing.txt").is_absent());
    assert!(jail.read_to_string("missing.txt").is_absent());
}

#[test]
fn create_without_parent_fails() {
    let (_dir, jail) = jail();
    let err = jail.open("no/such/dir.txt", OpenMode::Write).err().unwrap();
    assert!(matches!(err, JailError::ParentNotFound { .. }));
    assert_eq!(err.op(), Some("open"));
}

#[test]
fn create_under_a_file_fails() {
    let (dir, jail) = jail();
    fs::write(dir.path().join("plain"), b"x").unwrap();
    assert!(jail.open("plain/child.txt", OpenMode::Write).is_failed());
}

#[test]
fn write_truncates() {
    let (_dir, jail) = jail();
    jail.write("data.txt", b"a long first version").unwrap();
    jail.write("data.txt", "short").unwrap();
    assert_eq!(jail.read_to_string("data.txt").unwrap_found(), "short");
}

#[test]
fn read_write_modes() {
    let (_dir, jail) = jail();
    jail.write("rw.txt", b"hello world").unwrap();

    let mut file = jail.open("rw.txt", OpenMode::ReadWrite).unwrap_found();
    file.write_all(b"HELLO").unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "HELLO world");
    assert_eq!(file.virtual_path(), "/rw.txt");

    let mut file = jail.open("rw.txt", OpenMode::WriteRead).unwrap_found();
    file.write_all(b"new").unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "new");
}

#[test]
fn writing_a_directory_fails() {
    let (dir, jail) = jail();
    fs::create_dir(dir.path().join("folder")).unwrap();
    assert!(jail.open("folder", OpenMode::Write).is_failed());
    assert!(jail.open("/", OpenMode::Append).is_failed());
}

#[test]
fn resolve_for_create_appends_leaf() {
    let (dir, jail) = jail();
    fs::create_dir(dir.path().join("uploads")).unwrap();

    let target = jail.resolve_for_create("uploads/../uploads/new.bin").unwrap();
    assert_eq!(target.as_path(), jail.root().join("uploads").join("new.bin"));
    assert_eq!(target.virtual_path(), "/uploads/new.bin");
    assert!(!target.exists());

    assert!(matches!(
        jail.resolve_for_create("/"),
        Err(JailError::RootNotAllowed { .. })
    ));
    assert!(matches!(
        jail.resolve_for_create("missing/new.bin"),
        Err(JailError::ParentNotFound { .. })
    ));
}

// ============================================================================
// directories
// ============================================================================

#[test]
fn readdir_lists_each_child_once() {
    let (dir, jail) = jail();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join(".hidden"), b"h").unwrap();
    fs::write(dir.path().join("sub/nested.txt"), b"n").unwrap();

    let names = jail.readdir("/").unwrap_found();
    let unique: HashSet<&str> = names.iter().map(String::as_str).collect();
    assert_eq!(names.len(), unique.len());
    assert_eq!(unique, HashSet::from(["sub", "a.txt", ".hidden"]));
    assert!(!unique.contains(".") && !unique.contains(".."));
}

#[test]
fn readdir_missing_or_file() {
    let (dir, jail) = jail();
    fs::write(dir.path().join("file.txt"), b"x").unwrap();

    assert!(jail.readdir("nope").is_absent());
    assert!(jail.readdir("file.txt").is_failed());
}

#[test]
fn opendir_iterates_names() {
    let (dir, jail) = jail();
    fs::create_dir(dir.path().join("d")).unwrap();
    fs::write(dir.path().join("d/one"), b"1").unwrap();

    let handle = jail.opendir("d").unwrap_found();
    assert_eq!(handle.virtual_path(), "/d");
    let names: Vec<String> = handle.map(Result::unwrap).collect();
    assert_eq!(names, ["one"]);
}

#[test]
fn mkdir_creates_parents() {
    let (_dir, jail) = jail();
    jail.mkdir("a/b/c", Mode::default(), true).unwrap();
    assert!(jail.stat("a/b/c").unwrap_found().is_dir());

    // Existing directory is fine when creating parents
    jail.mkdir("a/b", Mode::default(), true).unwrap();
    jail.mkdir("/", Mode::default(), true).unwrap();
}

#[test]
fn mkdir_without_parents() {
    let (_dir, jail) = jail();
    assert!(matches!(
        jail.mkdir("x/y", Mode::default(), false),
        Err(JailError::ParentNotFound { .. })
    ));

    jail.mkdir("x", Mode::default(), false).unwrap();
    let err = jail.mkdir("x", Mode::default(), false).unwrap_err();
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::AlreadyExists));
}

#[test]
fn mkdir_over_file_fails() {
    let (_dir, jail) = jail();
    jail.write("taken", b"x").unwrap();
    assert!(matches!(
        jail.mkdir("taken", Mode::default(), true),
        Err(JailError::NotADirectory { .. })
    ));
    assert!(jail.mkdir("taken/sub", Mode::default(), true).is_err());
}

#[test]
#[cfg(unix)]
fn mkdir_applies_mode() {
    use std::os::unix::fs::PermissionsExt;

    let (dir, jail) = jail();
    jail.mkdir("private", "0700".parse().unwrap(), false).unwrap();
    let bits = fs::metadata(dir.path().join("private")).unwrap().permissions().mode();
    assert_eq!(bits & 0o777, 0o700);
}

#[test]
fn rmdir_non_empty_requires_recursive() {
    let (_dir, jail) = jail();
    jail.mkdir("tree/branch", Mode::default(), true).unwrap();
    jail.write("tree/branch/leaf.txt", b"leaf").unwrap();

    assert!(jail.rmdir("tree", false).is_failed());
    assert!(jail.stat("tree/branch/leaf.txt").is_found());

    assert!(jail.rmdir("tree", true).is_found());
    assert!(jail.stat("tree").is_absent());
}

#[test]
fn rmdir_edge_cases() {
    let (_dir, jail) = jail();
    jail.write("file.txt", b"x").unwrap();
    jail.mkdir("empty", Mode::default(), false).unwrap();

    assert!(jail.rmdir("missing", false).is_absent());
    assert!(matches!(
        jail.rmdir("file.txt", false).err(),
        Some(JailError::NotADirectory { .. })
    ));
    assert!(matches!(
        jail.rmdir("/", true).err(),
        Some(JailError::RootNotAllowed { .. })
    ));
    assert!(jail.rmdir("empty", false).is_found());
    assert!(jail.stat("empty").is_absent());
}

// ============================================================================
// remove / rename / put
// ============================================================================

#[test]
fn remove_file() {
    let (_dir, jail) = jail();
    jail.write("gone.txt", b"x").unwrap();

    assert!(jail.remove("gone.txt").is_found());
    assert!(jail.stat("gone.txt").is_absent());
    assert!(jail.remove("gone.txt").is_absent());
}

#[test]
fn remove_directory_fails() {
    let (_dir, jail) = jail();
    jail.mkdir("dir", Mode::default(), false).unwrap();
    assert!(jail.remove("dir").is_failed());
    assert!(jail.stat("dir").is_found());
}

#[test]
fn rename_moves_entry() {
    let (_dir, jail) = jail();
    jail.mkdir("in", Mode::default(), false).unwrap();
    jail.mkdir("out", Mode::default(), false).unwrap();
    jail.write("in/a.txt", b"payload").unwrap();

    assert!(jail.rename("in/a.txt", "/out/b.txt").is_found());
    assert!(jail.stat("in/a.txt").is_absent());
    assert_eq!(jail.read("out/b.txt").unwrap_found(), b"payload");
}

#[test]
fn rename_directory() {
    let (_dir, jail) = jail();
    jail.mkdir("old/inner", Mode::default(), true).unwrap();

    assert!(jail.rename("old", "new").is_found());
    assert!(jail.stat("old").is_absent());
    assert!(jail.stat("new/inner").unwrap_found().is_dir());
}

#[test]
fn rename_failures() {
    let (_dir, jail) = jail();
    jail.write("a.txt", b"x").unwrap();

    assert!(jail.rename("missing.txt", "b.txt").is_absent());
    assert!(matches!(
        jail.rename("a.txt", "no/parent.txt").err(),
        Some(JailError::ParentNotFound { .. })
    ));
    assert!(matches!(
        jail.rename("/", "root-moved").err(),
        Some(JailError::RootNotAllowed { .. })
    ));
    assert!(jail.stat("a.txt").is_found());
}

#[test]
fn put_imports_external_file() {
    // Staging area next to the jail, on the same filesystem
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("jail")).unwrap();
    let jail = Jail::new(dir.path().join("jail")).unwrap();
    let incoming = dir.path().join("incoming.bin");
    fs::write(&incoming, b"upload").unwrap();

    jail.put(&incoming, "uploads.bin").unwrap();
    assert!(!incoming.exists());
    assert_eq!(jail.read("uploads.bin").unwrap_found(), b"upload");
}

#[test]
fn put_imports_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("jail")).unwrap();
    let jail = Jail::new(dir.path().join("jail")).unwrap();
    fs::create_dir_all(dir.path().join("batch/nested")).unwrap();
    fs::write(dir.path().join("batch/nested/item.txt"), b"item").unwrap();

    jail.put(dir.path().join("batch"), "imported").unwrap();
    assert_eq!(jail.read("imported/nested/item.txt").unwrap_found(), b"item");
}

#[test]
fn put_missing_source_fails() {
    let (dir, jail) = jail();
    let err = jail.put(dir.path().join("does-not-exist"), "x").unwrap_err();
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
    assert!(matches!(
        jail.put(dir.path().join("whatever"), "/"),
        Err(JailError::RootNotAllowed { .. })
    ));
}

// ============================================================================
// outcome plumbing
// ============================================================================

#[test]
fn lookup_works_with_question_mark() -> Result<(), JailError> {
    let (_dir, jail) = jail();
    jail.write("q.txt", b"q")?;

    let found = jail.read("q.txt").into_result()?;
    assert_eq!(found.as_deref(), Some(&b"q"[..]));
    assert_eq!(jail.read("nope").into_result()?, None);
    assert!(jail.exists("q.txt")?);
    Ok(())
}

#[test]
fn config_builds_working_jail() {
    let dir = tempdir().unwrap();
    let jail: Jail = JailConfig::new(dir.path()).try_into().unwrap();
    jail.write("c.txt", b"c").unwrap();
    match jail.stat("c.txt") {
        Lookup::Found(entry) => assert_eq!(entry.size, Some(1)),
        other => panic!("expected Found, got {other:?}"),
    }
}
