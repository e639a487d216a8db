/// Integration tests for loading, editing and saving shape files on disk

use std::fs;

use trackshape_core::{find_directory_files, load_shape, Encoding, Point};

const TRACK: &str = include_str!("data/track.s");

#[test]
fn test_utf16_shape_edit_and_copy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("A1t10mStrt.s");
    let original = TRACK.replace('\n', "\r\n");
    fs::write(&path, Encoding::Utf16Le.encode(&original)).unwrap();

    let mut file = load_shape(&path).unwrap();
    assert_eq!(file.encoding(), Encoding::Utf16Le);
    assert_eq!(file.filename(), "A1t10mStrt.s");

    let shape = file.shape_mut().unwrap();
    assert!(shape.set_point_value(0, Point::new(0.7175, 0.2, 0.0)));
    assert!(!shape.set_point_value(99, Point::default()));

    let copy = file.copy("A1t10mStrt_gauge.s", None).unwrap();
    copy.save().unwrap();

    // the source file is untouched until saved
    assert_eq!(Encoding::Utf16Le.decode(&fs::read(&path).unwrap()).unwrap(), original);

    let reloaded = load_shape(dir.path().join("A1t10mStrt_gauge.s")).unwrap();
    assert_eq!(reloaded.encoding(), Encoding::Utf16Le);
    let shape = reloaded.shape().unwrap();
    assert_eq!(shape.point(0), Some(Point::new(0.7175, 0.2, 0.0)));
    assert_eq!(shape.points().len(), 8);
    let lines = reloaded.lines().unwrap();
    assert!(lines.iter().any(|line| line.trim() == "point ( 0.7175 0.2 0 )"));
}

#[test]
fn test_find_shapes_in_directory() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["A1t10mStrt.s", "A4t50mStrt.S", "A1t10mStrt.sd", "Bend.s"] {
        fs::write(dir.path().join(name), TRACK).unwrap();
    }
    fs::create_dir(dir.path().join("a_dir_t.s")).unwrap();

    let found = find_directory_files(dir.path(), &["a*t*.s"], &["*.sd"]).unwrap();
    assert_eq!(found, vec!["A1t10mStrt.s", "A4t50mStrt.S"]);
}
