use ocrd::{Resolver, ResolverConfig, Workspace};
use ocrd_models::NewFile;
use ocrd_utils::constants::MIMETYPE_PAGE;
use ocrd_validators::{PageStrictness, ValidationReport, ValidatorOptions, WorkspaceValidator};
use std::path::Path;
use tempfile::TempDir;

fn resolver() -> Resolver {
    Resolver::new(ResolverConfig::default()).unwrap()
}

async fn empty_workspace(dir: &Path) -> Workspace {
    resolver()
        .workspace_from_nothing(Some(dir), None, false)
        .await
        .unwrap()
}

async fn validate(dir: &Path, skip: &[&str]) -> ValidationReport {
    let mets = dir.join("mets.xml");
    WorkspaceValidator::validate(
        &resolver(),
        Some(&*mets.to_string_lossy()),
        ValidatorOptions {
            skip: skip.iter().map(|s| s.to_string()).collect(),
            ..ValidatorOptions::default()
        },
    )
    .await
}

/// A grayscale PNG with the given pixels per meter.
fn png(ppm: u32) -> Vec<u8> {
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, 16, 16);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[0; 16 * 16]).unwrap();
    writer.finish().unwrap();
    out
}

/// A grayscale TIFF with the given pixels per centimeter.
fn tiff_cm(ppcm: u32) -> Vec<u8> {
    use tiff::encoder::{Rational, TiffEncoder, colortype};
    let mut out = std::io::Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut out).unwrap();
        let mut image = encoder.new_image::<colortype::Gray8>(16, 16).unwrap();
        image.resolution(tiff::tags::ResolutionUnit::Centimeter, Rational { n: ppcm, d: 1 });
        image.write_data(&[0; 16 * 16]).unwrap();
    }
    out.into_inner()
}

// ============================================================================
// METS checks
// ============================================================================

#[tokio::test]
async fn test_validate_empty() {
    let dir = TempDir::new().unwrap();
    let mut ws = empty_workspace(dir.path()).await;
    let report = validate(dir.path(), &[]).await;
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].contains("no unique identifier"));
    assert!(report.errors[1].contains("No files"));

    ws.mets.set_unique_identifier("foobar");
    ws.save_mets().await.unwrap();
    let report = validate(dir.path(), &[]).await;
    assert_eq!(report.errors.len(), 1);
}

#[tokio::test]
async fn test_validate_twice() {
    let dir = TempDir::new().unwrap();
    empty_workspace(dir.path()).await;
    let mets = dir.path().join("mets.xml").to_string_lossy().to_string();
    let validator = WorkspaceValidator::new(resolver(), Some(mets.as_str()), ValidatorOptions::default());
    let first = validator.run().await;
    let second = validator.run().await;
    assert_eq!(first, second);
    assert_eq!(second.errors.len(), 2);
}

#[tokio::test]
async fn test_validate_file_groups_non_ocrd() {
    let dir = TempDir::new().unwrap();
    let mut ws = empty_workspace(dir.path()).await;
    ws.mets.set_unique_identifier("foobar");
    ws.mets.add_file_group("FOO").unwrap();
    ws.save_mets().await.unwrap();
    let report = validate(dir.path(), &[]).await;
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("No files"));
    assert_eq!(report.notices.len(), 1);
    assert!(report.notices[0].contains("USE does not begin with 'OCR-D-'"));
}

#[tokio::test]
async fn test_validate_file_groups_unspecified() {
    let dir = TempDir::new().unwrap();
    let mut ws = empty_workspace(dir.path()).await;
    ws.mets.set_unique_identifier("foobar");
    ws.mets.add_file_group("OCR-D-INVALID-FILEGRP").unwrap();
    ws.save_mets().await.unwrap();
    let report = validate(dir.path(), &[]).await;
    assert_eq!(report.errors.len(), 2);
    assert_eq!(
        report.errors[0],
        "Unspecified USE category 'INVALID' in fileGrp 'OCR-D-INVALID-FILEGRP'"
    );
    assert!(report.errors[1].contains("No files"));
}

#[tokio::test]
async fn test_validate_file_groups_bad_name() {
    let dir = TempDir::new().unwrap();
    let mut ws = empty_workspace(dir.path()).await;
    ws.mets.set_unique_identifier("foobar");
    ws.mets.add_file_group("OCR-D-GT-X").unwrap();
    ws.save_mets().await.unwrap();
    let report = validate(dir.path(), &[]).await;
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].contains("Invalid USE name 'X' in fileGrp"));
    assert!(report.errors[1].contains("No files"));
}

#[tokio::test]
async fn test_validate_files_nopageid() {
    let dir = TempDir::new().unwrap();
    let mut ws = empty_workspace(dir.path()).await;
    ws.mets.set_unique_identifier("foobar");
    ws.mets
        .add_file("OCR-D-GT-PAGE", NewFile::new("file1").mimetype("image/png"), false)
        .unwrap();
    ws.save_mets().await.unwrap();
    let report = validate(dir.path(), &["pixel_density"]).await;
    assert_eq!(report.errors.len(), 1, "{report}");
    assert!(report.errors[0].contains("does not manifest any physical page."));
}

#[tokio::test]
async fn test_validate_weird_urls() {
    let dir = TempDir::new().unwrap();
    let mut ws = empty_workspace(dir.path()).await;
    ws.mets.set_unique_identifier("foobar");
    ws.mets
        .add_file(
            "OCR-D-GT-PAGE",
            NewFile::new("file1")
                .mimetype("image/png")
                .page_id("page1")
                .url("file:/java-file-url"),
            false,
        )
        .unwrap();
    ws.mets
        .add_file(
            "OCR-D-GT-PAGE",
            NewFile::new("file2")
                .mimetype("image/png")
                .page_id("page2")
                .url("nothttp://unusual.scheme"),
            false,
        )
        .unwrap();
    ws.mets
        .file_element_mut("file2")
        .unwrap()
        .set_attr("GROUPID", "donotuse");
    ws.save_mets().await.unwrap();

    let report = validate(dir.path(), &["pixel_density"]).await;
    assert_eq!(report.errors.len(), 0, "{report}");
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings[0].contains("Java-specific"));
    assert!(report.warnings[1].contains("non-HTTP"));
    assert_eq!(report.notices.len(), 1);
    assert!(report.notices[0].contains("has GROUPID attribute"));
}

// ============================================================================
// Pixel density
// ============================================================================

async fn workspace_with_image(dir: &Path, image: &Path) {
    workspace_with_typed_image(dir, image, "image/png").await;
}

async fn workspace_with_typed_image(dir: &Path, image: &Path, mimetype: &str) {
    let mut ws = empty_workspace(dir).await;
    ws.mets.set_unique_identifier("foobar");
    ws.mets
        .add_file(
            "OCR-D-GT-BIN",
            NewFile::new("file1")
                .mimetype(mimetype)
                .page_id("page1")
                .url(format!("file://{}", image.display())),
            false,
        )
        .unwrap();
    ws.save_mets().await.unwrap();
}

#[tokio::test]
async fn test_validate_pixel_density_ok() {
    let assets = TempDir::new().unwrap();
    let image = assets.path().join("BIN_0020.png");
    // 300 dpi
    std::fs::write(&image, png(11811)).unwrap();
    let dir = TempDir::new().unwrap();
    workspace_with_image(dir.path(), &image).await;

    let report = validate(dir.path(), &[]).await;
    assert!(report.errors.is_empty(), "{report}");
    assert!(report.warnings.is_empty());
    assert!(report.notices.is_empty());
}

#[tokio::test]
async fn test_validate_pixel_density_too_low() {
    let assets = TempDir::new().unwrap();
    let image = assets.path().join("BIN_0017.png");
    // 72 dpi
    std::fs::write(&image, png(2835)).unwrap();
    let dir = TempDir::new().unwrap();
    workspace_with_image(dir.path(), &image).await;

    let report = validate(dir.path(), &[]).await;
    assert_eq!(report.errors.len(), 2, "{report}");
    assert!(report.errors[0].contains("xResolution"));
    assert!(report.errors[1].contains("yResolution"));
    assert!(report.errors[0].contains("72 pixels per inches"));
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn test_validate_pixel_density_in_centimeters() {
    let assets = TempDir::new().unwrap();
    // 40 px/cm is about 102 dpi
    let image = assets.path().join("ok.tif");
    std::fs::write(&image, tiff_cm(40)).unwrap();
    let dir = TempDir::new().unwrap();
    workspace_with_typed_image(dir.path(), &image, "image/tiff").await;
    let report = validate(dir.path(), &[]).await;
    assert!(report.errors.is_empty(), "{report}");

    // 28 px/cm is about 71 dpi
    let image = assets.path().join("low.tif");
    std::fs::write(&image, tiff_cm(28)).unwrap();
    let dir = TempDir::new().unwrap();
    workspace_with_typed_image(dir.path(), &image, "image/tiff").await;
    let report = validate(dir.path(), &[]).await;
    assert_eq!(report.errors.len(), 2, "{report}");
    assert!(report.errors[0].contains("28 pixels per cm"));
}

#[tokio::test]
async fn test_validate_remote_image_without_download() {
    let dir = TempDir::new().unwrap();
    let mut ws = empty_workspace(dir.path()).await;
    ws.mets.set_unique_identifier("foobar");
    ws.mets
        .add_file(
            "OCR-D-IMG",
            NewFile::new("img1")
                .mimetype("image/tiff")
                .page_id("page1")
                .url("https://example.org/0001.tif"),
            false,
        )
        .unwrap();
    ws.save_mets().await.unwrap();

    let report = validate(dir.path(), &[]).await;
    assert!(report.is_valid(), "{report}");
    assert_eq!(report.notices.len(), 1);
    assert!(report.notices[0].starts_with("Won't download remote image"));
}

// ============================================================================
// PAGE and workspace setup
// ============================================================================

#[tokio::test]
async fn test_validate_page_consistency() {
    let dir = TempDir::new().unwrap();
    let mut ws = empty_workspace(dir.path()).await;
    ws.mets.set_unique_identifier("foobar");
    let page = r#"<PcGts xmlns="http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15"><Page><TextRegion id="r1"><TextLine id="l1"><Word id="w1"><TextEquiv><Unicode>foo</Unicode></TextEquiv></Word><Word id="w2"><TextEquiv><Unicode>bar</Unicode></TextEquiv></Word><TextEquiv><Unicode>foo  bar</Unicode></TextEquiv></TextLine></TextRegion></Page></PcGts>"#;
    ws.add_file(
        "OCR-D-GT-PAGE",
        NewFile::new("PAGE_0001").mimetype(MIMETYPE_PAGE).page_id("page1"),
        Some(page.as_bytes()),
        false,
    )
    .await
    .unwrap();
    ws.save_mets().await.unwrap();

    let report = validate(dir.path(), &[]).await;
    assert_eq!(report.errors.len(), 1, "{report}");
    assert!(report.errors[0].contains("TextLine ID 'l1'"));

    let mets = dir.path().join("mets.xml").to_string_lossy().to_string();
    let lax = WorkspaceValidator::validate(
        &resolver(),
        Some(mets.as_str()),
        ValidatorOptions {
            page_strictness: PageStrictness::Lax,
            ..ValidatorOptions::default()
        },
    )
    .await;
    assert!(lax.is_valid(), "{lax}");
}

#[tokio::test]
async fn test_bad_workspace() {
    let report = WorkspaceValidator::validate(&resolver(), Some("non existe"), ValidatorOptions::default()).await;
    assert!(!report.is_valid());
    assert!(report.errors[0].contains("Failed to instantiate workspace:"));
}

#[tokio::test]
async fn test_skip_all_with_src_dir() {
    let dir = TempDir::new().unwrap();
    empty_workspace(dir.path()).await;
    let report = WorkspaceValidator::validate(
        &resolver(),
        None,
        ValidatorOptions {
            src_dir: Some(dir.path().to_path_buf()),
            download: true,
            skip: ocrd_validators::CHECKS.iter().map(|s| s.to_string()).collect(),
            ..ValidatorOptions::default()
        },
    )
    .await;
    assert!(report.is_valid(), "{report}");
}
