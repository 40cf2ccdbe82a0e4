use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marginalia_core::{
    logging, reply_thread, shared_store, Annotation, AnnotationStore, MarginaliaConfig, Motivation, ParentRef,
};
use marginalia_render::{MonospaceLayout, Point, Rect, TextLayout};
use marginalia_sync::{AnnotationSync, HttpAnnotationApi};
use marginalia_ui::{DocumentView, HoverConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};
use std::time::Instant;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "marginalia-cli")]
#[command(about = "Marginalia annotation CLI")]
pub struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch one bucket's annotations on a document element.
    Fetch {
        #[arg(long, value_name = "ID")]
        element: String,
        #[arg(long, default_value = "commenting")]
        motivation: Motivation,
        #[arg(long)]
        classroom: Option<String>,
        /// Overrides the configured API base URL
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Lay out a paragraph and print highlight rectangles.
    Layout {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, default_value_t = 640.0)]
        width: f32,
    },
    /// Print the annotation ids under a point of a laid-out paragraph.
    Hover {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        x: f32,
        #[arg(long, allow_negative_numbers = true)]
        y: f32,
        #[arg(long, default_value_t = 640.0)]
        width: f32,
    },
    /// Print the reply tree under an annotation.
    Thread {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, value_name = "ID")]
        root: String,
    },
    /// Print CLI version.
    Version,
}

/// A paragraph and the annotations on it
#[derive(Debug, Deserialize)]
struct ParagraphInput {
    element_id: String,
    text: String,
    #[serde(default)]
    annotations: Vec<Annotation>,
}

/// Parse `args` and run the selected command
pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    if let Commands::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = MarginaliaConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    logging::init(&config.log_level);

    match cli.command {
        Commands::Fetch {
            element,
            motivation,
            classroom,
            api_url,
        } => run_fetch(&config, &element, motivation, classroom.as_deref(), api_url),
        Commands::Layout { input, width } => run_layout(&config, &input, width),
        Commands::Hover { input, x, y, width } => run_hover(&config, &input, Point::new(x, y), width),
        Commands::Thread { input, root } => run_thread(&config, &input, &root),
        Commands::Version => Ok(()),
    }
}

fn run_fetch(
    config: &MarginaliaConfig,
    element: &str,
    motivation: Motivation,
    classroom: Option<&str>,
    api_url: Option<String>,
) -> Result<()> {
    let base_url = api_url.unwrap_or_else(|| config.api_base_url.clone());
    let parent = ParentRef::element(element);
    let store = shared_store();
    let sync = AnnotationSync::new(Arc::new(HttpAnnotationApi::new(base_url)), Arc::clone(&store));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime
        .block_on(sync.bucket(motivation).fetch(&parent, classroom))
        .with_context(|| format!("failed to fetch {motivation} annotations for {parent}"))?;

    let store = store.read().unwrap_or_else(PoisonError::into_inner);
    let records = store.bucket(motivation).get_by_parent(&parent);
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run_layout(config: &MarginaliaConfig, input: &Path, width: f32) -> Result<()> {
    let paragraph = read_input(input)?;
    let (view, parent) = lay_out(config, &paragraph, width);

    let rects: BTreeMap<&str, &Vec<Rect>> = view
        .registry()
        .get_all()
        .into_iter()
        .filter(|highlight| highlight.parent() == &parent)
        .map(|highlight| (highlight.annotation_id(), &highlight.boxes))
        .collect();

    println!("{}", serde_json::to_string_pretty(&rects)?);
    Ok(())
}

fn run_hover(config: &MarginaliaConfig, input: &Path, point: Point, width: f32) -> Result<()> {
    let paragraph = read_input(input)?;
    let (mut view, _) = lay_out(config, &paragraph, width);

    let now = Instant::now();
    view.pointer_moved(point, now);
    view.tick(now + config.motion_debounce());

    let hovered: Vec<String> = view.hover().hovered().into_iter().collect();
    println!("{}", serde_json::to_string(&hovered)?);
    Ok(())
}

fn run_thread(config: &MarginaliaConfig, input: &Path, root: &str) -> Result<()> {
    let paragraph = read_input(input)?;
    let mut store = AnnotationStore::new();
    store.add_many(paragraph.annotations);

    let thread = reply_thread(&store, root, config.max_thread_depth)
        .with_context(|| format!("annotation not found: {root}"))?;
    tracing::debug!(%root, replies = thread.reply_count(), depth = thread.depth(), "reply thread built");

    println!("{}", serde_json::to_string_pretty(&thread)?);
    Ok(())
}

fn read_input(path: &Path) -> Result<ParagraphInput> {
    if !path.is_file() {
        anyhow::bail!("file does not exist: {}", path.display());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("invalid paragraph input in {}", path.display()))
}

/// Run the paragraph through the store and a document view, as the reader
/// would render it in a container `width` pixels wide
fn lay_out(config: &MarginaliaConfig, paragraph: &ParagraphInput, width: f32) -> (DocumentView, ParentRef) {
    let parent = ParentRef::element(paragraph.element_id.as_str());
    let store = shared_store();
    store
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add_many(paragraph.annotations.iter().cloned());

    let layout = MonospaceLayout::new(&paragraph.text, width);
    let bounds = layout.container_rect();
    let container = Rect::new(bounds.left, bounds.top, bounds.width, bounds.height.max(1.0));
    let mut view = DocumentView::new(store, container, HoverConfig::from(config));

    view.mount_paragraph(parent.clone(), paragraph.text.as_str());
    for (pending, trigger) in view.pending_layouts() {
        tracing::debug!(parent = %pending, ?trigger, origin = ?layout.container_origin(), "layout pass");
        view.layout_paragraph(&pending, &layout);
    }
    (view, parent)
}
