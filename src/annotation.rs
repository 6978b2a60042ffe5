// Pascal VOC XML annotation files

use anyhow::{Context, Result, anyhow, bail};
use log::info;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{BoxCoords, ImageAnnotation, Label, LabeledBox};

/// What to do when the annotation file for an image already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Replace the file without asking
    #[default]
    Overwrite,
    /// Leave the file alone and skip the image
    SkipExisting,
}

/// Render the document: no declaration, compact `source`/`size`/`bndbox`
/// lines, no trailing newline.
pub fn to_xml(annotation: &ImageAnnotation) -> String {
    let mut lines = vec!["<annotation>".to_string()];
    lines.push(format!("  <folder>{}</folder>", escape(annotation.folder.as_str())));
    lines.push(format!("  <filename>{}</filename>", escape(annotation.filename.as_str())));
    lines.push(format!("  <path>{}</path>", escape(annotation.path.as_str())));
    lines.push("  <source><database>Unknown</database></source>".to_string());
    lines.push(format!(
        "  <size><width>{}</width><height>{}</height><depth>{}</depth></size>",
        annotation.width, annotation.height, annotation.depth
    ));
    lines.push("  <segmented>0</segmented>".to_string());

    for obj in &annotation.objects {
        let b = obj.bbox;
        lines.push("  <object>".to_string());
        lines.push(format!("    <name>{}</name>", escape(obj.label.as_str())));
        lines.push("    <pose>Unspecified</pose>".to_string());
        lines.push("    <truncated>0</truncated>".to_string());
        lines.push("    <difficult>0</difficult>".to_string());
        lines.push(format!(
            "    <bndbox><xmin>{}</xmin><ymin>{}</ymin><xmax>{}</xmax><ymax>{}</ymax></bndbox>",
            b.xmin, b.ymin, b.xmax, b.ymax
        ));
        lines.push("  </object>".to_string());
    }

    lines.push("</annotation>".to_string());
    lines.join("\n")
}

/// Writes one XML file per image into `output_dir`.
#[derive(Debug, Clone)]
pub struct AnnotationWriter {
    output_dir: PathBuf,
    policy: OverwritePolicy,
}

impl AnnotationWriter {
    pub fn new(output_dir: impl Into<PathBuf>, policy: OverwritePolicy) -> Self {
        Self {
            output_dir: output_dir.into(),
            policy,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output_dir>/<image base name>.xml`
    pub fn output_path(&self, image_filename: &str) -> PathBuf {
        let xml_filename = Path::new(image_filename).with_extension("xml");
        let xml_filename = xml_filename.file_name().map(PathBuf::from).unwrap_or(xml_filename);
        self.output_dir.join(xml_filename)
    }

    /// True when the policy says this image must not be written again.
    pub fn keeps_existing(&self, image_filename: &str) -> bool {
        self.policy == OverwritePolicy::SkipExisting && self.output_path(image_filename).exists()
    }

    /// Write the document, creating directories as needed. An existing file
    /// is replaced under [`OverwritePolicy::Overwrite`].
    pub fn write(&self, annotation: &ImageAnnotation) -> Result<PathBuf> {
        let path = self.output_path(&annotation.filename);
        if self.keeps_existing(&annotation.filename) {
            bail!("{} already exists", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        fs::write(&path, to_xml(annotation))
            .with_context(|| format!("Failed to write VOC XML {}", path.display()))?;
        info!("XML saved to: {}", path.display());
        Ok(path)
    }
}

#[derive(Default)]
struct PartialObject {
    name: Option<String>,
    xmin: Option<u32>,
    ymin: Option<u32>,
    xmax: Option<u32>,
    ymax: Option<u32>,
}

impl PartialObject {
    fn finish(self) -> Result<LabeledBox> {
        let name = self.name.ok_or_else(|| anyhow!("object without <name>"))?;
        let label = Label::new(&name).ok_or_else(|| anyhow!("object with empty <name>"))?;
        let (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) = (self.xmin, self.ymin, self.xmax, self.ymax)
        else {
            bail!("object '{}' has an incomplete <bndbox>", name);
        };
        let bbox = BoxCoords::new(xmin, ymin, xmax, ymax)
            .ok_or_else(|| anyhow!("object '{}' has an empty box", name))?;
        Ok(LabeledBox { label, bbox })
    }
}

fn parse_number(text: &str, field: &str) -> Result<u32> {
    text.trim()
        .parse()
        .with_context(|| format!("<{}> is not a non-negative integer: {:?}", field, text))
}

/// Parse a VOC document back into an [`ImageAnnotation`].
pub fn parse_xml(xml: &str) -> Result<ImageAnnotation> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut annotation = ImageAnnotation {
        folder: String::new(),
        filename: String::new(),
        path: String::new(),
        width: 0,
        height: 0,
        depth: 0,
        objects: Vec::new(),
    };
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<PartialObject> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if stack.is_empty() {
                    if name != "annotation" {
                        bail!("root element is <{}>, expected <annotation>", name);
                    }
                    saw_root = true;
                }
                if name == "object" {
                    current = Some(PartialObject::default());
                }
                stack.push(name);
            }
            Event::End(_) => {
                if stack.pop().as_deref() == Some("object") {
                    if let Some(obj) = current.take() {
                        annotation.objects.push(obj.finish()?);
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                let path: Vec<&str> = stack.iter().map(String::as_str).collect();
                match path.as_slice() {
                    ["annotation", "folder"] => annotation.folder = text,
                    ["annotation", "filename"] => annotation.filename = text,
                    ["annotation", "path"] => annotation.path = text,
                    ["annotation", "size", "width"] => annotation.width = parse_number(&text, "width")?,
                    ["annotation", "size", "height"] => annotation.height = parse_number(&text, "height")?,
                    ["annotation", "size", "depth"] => annotation.depth = parse_number(&text, "depth")?,
                    ["annotation", "object", field] | ["annotation", "object", "bndbox", field] => {
                        let Some(obj) = current.as_mut() else {
                            continue;
                        };
                        match *field {
                            "name" => obj.name = Some(text),
                            "xmin" => obj.xmin = Some(parse_number(&text, "xmin")?),
                            "ymin" => obj.ymin = Some(parse_number(&text, "ymin")?),
                            "xmax" => obj.xmax = Some(parse_number(&text, "xmax")?),
                            "ymax" => obj.ymax = Some(parse_number(&text, "ymax")?),
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        bail!("document has no <annotation> element");
    }
    Ok(annotation)
}

pub fn read_annotation(path: &Path) -> Result<ImageAnnotation> {
    let xml = fs::read_to_string(path)
        .with_context(|| format!("Failed to read VOC XML {}", path.display()))?;
    parse_xml(&xml).with_context(|| format!("Failed to parse VOC XML {}", path.display()))
}
