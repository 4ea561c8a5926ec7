mod common;

use common::{session, temp_store, write_raw_image};
use lepton::{Flow, Geometry, Shell, HELP};

#[test]
fn test_create_and_list() {
    let out = session(temp_store("sh-list"), &["in d1", "cr foo", "dr"]);
    assert_eq!(out, "Disk initialized\nFile foo created\n\tfoo <0>\n");
}

#[test]
fn test_write_and_read_back() {
    let out = session(
        temp_store("sh-rw"),
        &["in d1", "cr foo", "op foo", "wr 1 a 5", "sk 1 0", "rd 1 5", "dr"],
    );
    assert_eq!(
        out,
        "Disk initialized\n\
         File foo created\n\
         File foo opened, index=1\n\
         <5> bytes written\n\
         Current position is 0\n\
         <5> bytes read: <aaaaa>\n\
         \tfoo <64>\n"
    );
}

#[test]
fn test_write_past_max_size() {
    let out = session(temp_store("sh-max"), &["in d1", "cr foo", "op foo", "wr 1 x 200", "wr 1 x 1"]);
    assert_eq!(
        out,
        "Disk initialized\n\
         File foo created\n\
         File foo opened, index=1\n\
         <192> bytes written\n\
         <0> bytes written\n"
    );
}

#[test]
fn test_second_block_after_reopen() {
    let out = session(
        temp_store("sh-reopen"),
        &["in d1", "cr foo", "op foo", "wr 1 a 70", "cl 1", "op foo", "sk 1 64", "rd 1 6"],
    );
    assert_eq!(
        out,
        "Disk initialized\n\
         File foo created\n\
         File foo opened, index=1\n\
         <70> bytes written\n\
         File 1 closed\n\
         File foo opened, index=1\n\
         Current position is 64\n\
         <6> bytes read: <aaaaaa>\n"
    );
}

#[test]
fn test_save_and_restore() {
    let store = temp_store("sh-save");
    let out = session(
        store.clone(),
        &["in d1", "cr foo", "op foo", "wr 1 a 10", "sv d1", "in d1", "op foo", "rd 1 10"],
    );
    assert_eq!(
        out,
        "Disk initialized\n\
         File foo created\n\
         File foo opened, index=1\n\
         <10> bytes written\n\
         File 1 closed\n\
         Disk saved\n\
         Disk restored\n\
         File foo opened, index=1\n\
         <10> bytes read: <aaaaaaaaaa>\n"
    );
    assert!(store.exists("d1"));

    // A new session picks the image up again.
    let out = session(store, &["in d1", "dr"]);
    assert_eq!(out, "Disk restored\n\tfoo <64>\n");
}

#[test]
fn test_open_deleted_file() {
    let out = session(temp_store("sh-deleted"), &["in d1", "cr foo", "de foo", "op foo"]);
    assert_eq!(
        out,
        "Disk initialized\n\
         File foo created\n\
         File foo deleted\n\
         Error occurred:\n\tNo such file foo\n"
    );
}

#[test]
fn test_commands_before_init() {
    let out = session(temp_store("sh-unmounted"), &["cr foo", "dr"]);
    assert_eq!(out, "Error occurred:\n\tNo disk is mounted\n".repeat(2));
}

#[test]
fn test_bad_arguments() {
    let out = session(
        temp_store("sh-args"),
        &["in d1", "cl 0", "cl x", "rd 1 z", "wr 1 a -3", "sk 2 0", "cr toolong"],
    );
    assert_eq!(
        out,
        "Disk initialized\n\
         Error occurred:\n\tOpen files indexing starts from 1\n\
         Error occurred:\n\tClose operation arg must be integer\n\
         Error occurred:\n\tRead operation args must be integer\n\
         Error occurred:\n\tCount must not be negative\n\
         Error occurred:\n\tOpen file index 2 does not exist\n\
         Error occurred:\n\tFile name must be at most 4 bytes long\n"
    );
}

#[test]
fn test_empty_file_read() {
    let out = session(temp_store("sh-empty"), &["in d1", "cr foo", "op foo", "rd 1 3"]);
    assert!(out.ends_with("<File is empty>\n"));
}

#[test]
fn test_unknown_commands_print_help() {
    let out = session(temp_store("sh-help"), &["in d1", "ls", "cr", "rd 1"]);
    assert_eq!(out, format!("Disk initialized\n{}", format!("{}\n", HELP).repeat(3)));
}

#[test]
fn test_drop_image() {
    let store = temp_store("sh-drop");
    let out = session(store.clone(), &["in d1", "sv d1", "drop d1", "drop d1"]);
    assert_eq!(out, "Disk initialized\nDisk saved\nd1 deleted\nDrop operation failed\n");
    assert!(!store.exists("d1"));
}

#[test]
fn test_corrupt_image_starts_fresh() {
    let store = temp_store("sh-corrupt");
    std::fs::write(store.path_of("d1"), b"garbage").unwrap();
    let out = session(store, &["in d1", "dr"]);
    assert_eq!(out, "Disk initialized\n");
}

#[test]
fn test_end_stops_the_session() {
    let mut shell = Shell::new(temp_store("sh-end"), Geometry::default(), Vec::new());
    assert_eq!(shell.execute("").unwrap(), Flow::Continue);
    assert_eq!(shell.execute("in d1").unwrap(), Flow::Continue);
    assert_eq!(shell.execute("end").unwrap(), Flow::Exit);
    assert!(shell.filesystem().is_some());

    let out = common::session(temp_store("sh-end-run"), &["in d1", "end", "cr foo"]);
    assert_eq!(out, "Disk initialized\n");
}

#[test]
fn test_overflowing_image_starts_fresh() {
    let store = temp_store("sh-overflow");
    write_raw_image(&store, "d1", [u64::MAX / 2, 2, 8, 64], &[]);
    let out = session(store, &["in d1", "cr foo", "dr"]);
    assert_eq!(out, "Disk initialized\nFile foo created\n\tfoo <0>\n");
}

#[test]
fn test_garbled_line_does_not_end_the_session() {
    let mut shell = Shell::new(temp_store("sh-garbled"), Geometry::default(), Vec::new());
    shell.run(&b"in d1\ncr \xff\ncr foo\ndr\n"[..]).unwrap();
    let out = String::from_utf8(shell.into_output()).unwrap();

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "Disk initialized");
    assert_eq!(lines[1], "Error occurred:");
    assert!(out.ends_with("File foo created\n\tfoo <0>\n"), "{:?}", out);
}

#[test]
fn test_help_header() {
    assert!(HELP.starts_with("Available commands: \n (in <diskName>), (sv <diskName>),\n"));
    assert!(HELP.ends_with(" (drop <diskName>)\n (end)"));
}

#[test]
fn test_session_banners() {
    let mut shell = Shell::new(temp_store("sh-banners"), Geometry::default(), Vec::new());
    shell.start(&b"in d1\nend\ncr foo\n"[..]).unwrap();
    let out = String::from_utf8(shell.into_output()).unwrap();
    assert_eq!(out, "CLI started\nDisk initialized\nFinishing CLI\n");

    // End of input finishes the session the same way.
    let mut shell = Shell::new(temp_store("sh-banners-eof"), Geometry::default(), Vec::new());
    shell.start(&b"dr"[..]).unwrap();
    let out = String::from_utf8(shell.into_output()).unwrap();
    assert_eq!(out, "CLI started\nError occurred:\n\tNo disk is mounted\nFinishing CLI\n");
}
