use super::*;

#[test]
fn normalize_path_slash_normalization() {
    assert_eq!(normalize_rel_path("a/b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("./a//b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("../x.png").is_err());
    assert!(normalize_rel_path("/abs.png").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn image_ref_list_assigns_ordinals() {
    let refs = ImageRef::list(["a.png", "b.png", "c.png"]);
    assert_eq!(refs.len(), 3);
    assert_eq!(refs[2], ImageRef::new("c.png", 2));
}

#[test]
fn memory_source_fetches_registered_bytes() {
    let src = MemoryImageSource::new().with("x", vec![1, 2, 3]);
    assert_eq!(src.fetch("x").unwrap(), vec![1, 2, 3]);
    assert!(src.fetch("y").is_err());
    assert_eq!(src.len(), 1);
}

#[test]
fn fs_source_reads_relative_and_gates_absolute() {
    let dir = std::env::temp_dir().join(format!("gridsheet_fs_source_{}", std::process::id()));
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    std::fs::write(dir.join("sub/img.bin"), b"abc").unwrap();

    let src = FsImageSource::new(&dir);
    assert_eq!(src.fetch("sub/img.bin").unwrap(), b"abc");
    assert!(src.fetch("../img.bin").is_err());

    let abs = dir.join("sub/img.bin");
    let abs = abs.to_string_lossy();
    assert!(src.fetch(&abs).is_err());
    let src = src.allow_absolute(true);
    assert_eq!(src.fetch(&abs).unwrap(), b"abc");

    let _ = std::fs::remove_dir_all(&dir);
}
