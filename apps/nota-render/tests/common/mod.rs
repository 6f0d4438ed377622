//! In-process doubles for the external tools
//!
//! Fake sources are small text files describing how the score should behave:
//!
//! ```text
//! pages 3            three pages
//! pages 2 fail 2     page 2 fails to render
//! pages 2 bad 1      page 1 renders but fails to convert
//! pages 2 panic 2    converting page 2 panics
//! broken             the engine refuses to load it
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use lopdf::{Dictionary, Document, Object, Stream};
use nota_engine::{
    ConvertedSource, EngineError, FormatConverter, LoadedScore, NotationEngine, PageConverter,
};
use nota_render::{JobLayout, Pipeline, RenderConfig};
use nota_types::EngineOptions;
use tempfile::TempDir;

pub const JOB: &str = "thesis";

/// Directive line fields after the source path
pub const A4_TAIL: &str = "Leipzig|9|1000pt|2000pt|0pt|0pt|0pt|0pt";

#[derive(Default)]
pub struct FakeEngine {
    /// Source file name and options of every load
    pub loads: Mutex<Vec<(String, EngineOptions)>>,
}

struct FakeScore {
    name: String,
    pages: usize,
    fail: Option<usize>,
    bad: Option<usize>,
    panic: Option<usize>,
}

impl NotationEngine for FakeEngine {
    fn load(
        &self,
        source: &Path,
        options: &EngineOptions,
    ) -> Result<Box<dyn LoadedScore>, EngineError> {
        let name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.loads
            .lock()
            .unwrap()
            .push((name.clone(), options.clone()));

        let text = fs::read_to_string(source)?;
        let mut score = FakeScore {
            name,
            pages: 0,
            fail: None,
            bad: None,
            panic: None,
        };
        let mut words = text.split_whitespace();
        while let Some(word) = words.next() {
            let value = words.next().and_then(|v| v.parse().ok());
            match (word, value) {
                ("pages", Some(n)) => score.pages = n,
                ("fail", Some(n)) => score.fail = Some(n),
                ("bad", Some(n)) => score.bad = Some(n),
                ("panic", Some(n)) => score.panic = Some(n),
                _ => return Err(EngineError::InvalidOutput(format!("cannot load {}", text))),
            }
        }
        Ok(Box::new(score))
    }
}

impl LoadedScore for FakeScore {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn render_page(&self, page: usize) -> Result<String, EngineError> {
        if self.fail == Some(page) {
            return Err(EngineError::InvalidOutput(format!("page {} exploded", page)));
        }
        let tag = if self.bad == Some(page) {
            "bad"
        } else if self.panic == Some(page) {
            "panic"
        } else {
            "page"
        };
        Ok(format!("<svg>{}-{}-{}</svg>", self.name, tag, page))
    }
}

/// Writes a single-page PDF carrying the SVG's text as its marker
pub struct FakePageConverter;

impl PageConverter for FakePageConverter {
    fn svg_to_pdf(&self, svg: &str, output: &Path) -> Result<(), EngineError> {
        let marker = svg
            .trim_start_matches("<svg>")
            .trim_end_matches("</svg>")
            .to_string();
        if marker.contains("-panic-") {
            panic!("converter crashed on {}", marker);
        }
        if marker.contains("-bad-") {
            return Err(EngineError::ToolFailed {
                tool: "fake-rsvg".to_string(),
                exit_code: Some(1),
                stderr: "bad page".to_string(),
            });
        }

        // Earlier pages finish later so completion order differs from page order
        let page: u64 = marker
            .rsplit('-')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);
        thread::sleep(Duration::from_millis(40 / page));

        fs::write(output, single_page_pdf(&marker))?;
        Ok(())
    }
}

/// Treats `.mscz` sources as convertible by copying them to a temporary file
#[derive(Default)]
pub struct FakeFormatConverter {
    pub produced: Mutex<Vec<PathBuf>>,
}

impl FormatConverter for FakeFormatConverter {
    fn needs_conversion(&self, source: &Path) -> bool {
        source.extension().is_some_and(|ext| ext == "mscz")
    }

    fn convert(&self, source: &Path) -> Result<ConvertedSource, EngineError> {
        let content = fs::read(source)?;
        if content.starts_with(b"corrupt") {
            return Err(EngineError::ToolFailed {
                tool: "fake-mscore".to_string(),
                exit_code: Some(2),
                stderr: "unreadable archive".to_string(),
            });
        }
        let file = tempfile::Builder::new()
            .prefix("converted-")
            .suffix(".mxl")
            .tempfile()?;
        fs::write(file.path(), content)?;
        let converted = ConvertedSource::new(file.into_temp_path());
        self.produced.lock().unwrap().push(converted.location());
        Ok(converted)
    }
}

/// A job directory wired to the fakes
pub struct Harness {
    pub dir: TempDir,
    pub engine: Arc<FakeEngine>,
    pub converter: Arc<FakeFormatConverter>,
    pub pipeline: Pipeline,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = RenderConfig::default().layout(JOB, dir.path());
        let engine = Arc::new(FakeEngine::default());
        let converter = Arc::new(FakeFormatConverter::default());
        let pipeline = Pipeline {
            engine: engine.clone(),
            format_converter: converter.clone(),
            page_converter: Arc::new(FakePageConverter),
            layout,
        };
        Self {
            dir,
            engine,
            converter,
            pipeline,
        }
    }

    pub fn layout(&self) -> &JobLayout {
        &self.pipeline.layout
    }

    pub fn write_source(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn write_directives(&self, lines: &[String]) {
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(&self.layout().directive_path, content).unwrap();
    }

    pub fn artifact(&self, id: &str) -> PathBuf {
        self.layout().artifact_path(id)
    }

    pub fn snippet(&self, id: &str) -> PathBuf {
        self.layout().snippet_path(id)
    }

    /// Sorted file names in the output directory
    pub fn outputs(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.layout().output_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn directive(id: &str, category: &str, source: &str) -> String {
    format!("{}|{}|{}|{}", id, category, source, A4_TAIL)
}

/// A one-page PDF whose content stream carries `marker`
pub fn single_page_pdf(marker: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let content_id = doc.new_object_id();

    let content = format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", marker);
    doc.objects.insert(
        content_id,
        Object::Stream(Stream::new(Dictionary::new(), content.into_bytes())),
    );

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set("Contents", Object::Reference(content_id));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(595),
            Object::Integer(200),
        ]),
    );
    doc.objects.insert(page_id, Object::Dictionary(page));

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(1));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Marker text of each page of a PDF file, in page order
pub fn page_markers(path: &Path) -> Vec<String> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).unwrap();
            let text = String::from_utf8_lossy(&content).into_owned();
            let start = text.find('(').unwrap() + 1;
            let end = text.find(')').unwrap();
            text[start..end].to_string()
        })
        .collect()
}
