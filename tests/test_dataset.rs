use anyhow::Result;
use std::path::Path;
use tempfile::TempDir;
use voclabel::dataset::{folder_name, list_images};

fn touch(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"image bytes").expect("Failed to write test file");
}

fn jpg() -> Vec<String> {
    vec!["jpg".to_string()]
}

#[test]
fn test_missing_directory_is_fatal() {
    let err = list_images(Path::new("/nonexistent/images"), &jpg()).unwrap_err();
    assert!(err.to_string().contains("Input directory not found"));
}

#[test]
fn test_directory_without_images_is_fatal() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("notes.txt"), "not an image")?;

    assert!(list_images(dir.path(), &jpg()).is_err());
    Ok(())
}

#[test]
fn test_extension_filter_ignores_case() -> Result<()> {
    let dir = TempDir::new()?;
    touch(dir.path(), "upper.JPG");
    touch(dir.path(), "lower.jpg");
    touch(dir.path(), "other.png");
    std::fs::create_dir(dir.path().join("nested.jpg"))?;

    let mut names: Vec<String> = list_images(dir.path(), &jpg())?
        .into_iter()
        .map(|e| e.filename)
        .collect();
    names.sort();

    assert_eq!(names, vec!["lower.jpg".to_string(), "upper.JPG".to_string()]);
    Ok(())
}

#[test]
fn test_extensions_accept_leading_dot() -> Result<()> {
    let dir = TempDir::new()?;
    touch(dir.path(), "a.png");
    touch(dir.path(), "b.jpg");

    let images = list_images(dir.path(), &[".PNG".to_string(), "jpg".to_string()])?;
    assert_eq!(images.len(), 2);
    for image in &images {
        assert_eq!(image.path, dir.path().join(&image.filename));
    }
    Ok(())
}

#[test]
fn test_folder_name_is_last_component() {
    assert_eq!(folder_name(Path::new("./data/images")), "images");
    assert_eq!(folder_name(Path::new("images/")), "images");
}
