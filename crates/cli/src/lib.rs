use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_markup_core::{
    AnnotationStore, MarkupConfig, PersistenceManager, Session, ShareCodec, SvgSurface,
};
use pdf_markup_engine::{LopdfEngine, OpenSource};
use pdf_markup_storage::{FileStorage, MemoryStorage};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use url::Url;

mod logging;

/// Overrides the directory holding locally saved annotations
pub const DATA_DIR_ENV: &str = "PDF_MARKUP_DATA_DIR";

#[derive(Debug, Parser)]
#[command(name = "pdf-markup")]
#[command(about = "Annotate PDF pages and share the markup as links")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// JSON configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for locally saved annotations.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a link carrying an annotations file.
    Share {
        #[arg(long, value_name = "FILE")]
        annotations: PathBuf,
        #[arg(long, value_name = "URL")]
        base_url: String,
    },
    /// Print the annotations carried by a link or fragment.
    Decode {
        #[arg(value_name = "LINK")]
        link: String,
    },
    /// Replace the locally saved annotations with a file.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Write the locally saved annotations as JSON.
    Export {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Paint one page's annotations into an SVG sized to the rendered page.
    RenderOverlay {
        #[arg(value_name = "PDF")]
        pdf: PathBuf,
        #[arg(long, value_name = "FILE")]
        annotations: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    logging::init(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Share { annotations, base_url } => run_share(&config, &annotations, &base_url),
        Commands::Decode { link } => run_decode(&config, &link),
        Commands::Import { file } => run_import(&config, cli.data_dir, &file),
        Commands::Export { output } => run_export(&config, cli.data_dir, output.as_deref()),
        Commands::RenderOverlay { pdf, annotations, page, scale, output } => {
            run_render_overlay(config, &pdf, &annotations, page, scale, output.as_deref())
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MarkupConfig> {
    let config = match path {
        Some(path) => MarkupConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MarkupConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn open_storage(data_dir: Option<PathBuf>) -> Result<FileStorage> {
    let data_dir = data_dir.or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from));

    match data_dir {
        Some(dir) => Ok(FileStorage::with_root(dir)),
        None => FileStorage::from_default_project().context("failed to resolve a data directory"),
    }
}

fn read_annotations(path: &Path) -> Result<AnnotationStore> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read annotations {}", path.display()))?;

    AnnotationStore::from_json(&text)
        .with_context(|| format!("invalid annotations file {}", path.display()))
}

fn run_share(config: &MarkupConfig, annotations: &Path, base_url: &str) -> Result<()> {
    let store = read_annotations(annotations)?;
    let base = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url:?}"))?;

    let codec = ShareCodec::from_config(config)?;
    let url = codec.share_url(&base, &store)?;
    println!("{url}");

    Ok(())
}

fn run_decode(config: &MarkupConfig, link: &str) -> Result<()> {
    // Accept a full link or just its fragment
    let fragment = match Url::parse(link) {
        Ok(url) => url.fragment().unwrap_or_default().to_string(),
        Err(_) => link.to_string(),
    };

    let codec = ShareCodec::from_config(config)?;
    let Some(store) = codec.decode(&fragment) else {
        anyhow::bail!("link carries no annotations");
    };

    println!("{}", store.to_json()?);
    Ok(())
}

fn run_import(config: &MarkupConfig, data_dir: Option<PathBuf>, file: &Path) -> Result<()> {
    let store = read_annotations(file)?;

    let mut persistence = PersistenceManager::new(open_storage(data_dir)?, config);
    persistence.save_now(&store).context("failed to save annotations")?;

    println!("imported {} strokes", store.stroke_count());
    Ok(())
}

fn run_export(
    config: &MarkupConfig,
    data_dir: Option<PathBuf>,
    output: Option<&Path>,
) -> Result<()> {
    let persistence = PersistenceManager::new(open_storage(data_dir)?, config);

    let mut store = AnnotationStore::new();
    persistence.load(&mut store);
    let json = store.to_json_pretty()?;

    match output {
        Some(path) => {
            write_output(path, &json)?;
            println!("{}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn run_render_overlay(
    config: MarkupConfig,
    pdf: &Path,
    annotations: &Path,
    page: u32,
    scale: f32,
    output: Option<&Path>,
) -> Result<()> {
    ensure_pdf_exists(pdf)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let text = fs::read_to_string(annotations)
        .with_context(|| format!("failed to read annotations {}", annotations.display()))?;

    let mut session = Session::boot(
        LopdfEngine::new(),
        OpenSource::from(pdf),
        MemoryStorage::new(),
        config,
        "",
    )
    .context("failed to open PDF")?;

    if page > session.page_count() {
        anyhow::bail!("page {page} out of range (page_count={})", session.page_count());
    }

    let mut surface = SvgSurface::default();
    session
        .import_json(&text, &mut surface, Instant::now())
        .with_context(|| format!("invalid annotations file {}", annotations.display()))?;
    session.go_to_page(page);
    session.set_scale(scale);
    if session.scale() != scale {
        tracing::warn!(requested = scale, used = session.scale(), "scale clamped to zoom range");
    }

    session.render_current_page(&mut surface).context("failed to render page")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_overlay_output(pdf, page));
    write_output(&output, &surface.to_svg())?;
    println!("{}", output.display());

    session.shutdown()?;
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_overlay_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("overlay");

    file.with_file_name(format!("{stem}-page-{page}-overlay.svg"))
}
