use chrono::{Local, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use mets_packager::derive::{DeriveOptions, FulltextMode};
use mets_packager::imaging::{DeliveryConfig, Quality, RustBackend};
use mets_packager::naming::file_name;
use mets_packager::ocr::TesseractCli;
use mets_packager::pipeline::{self, RunOptions};
use mets_packager::{config, logging, output, package};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "mets-packager")]
#[command(about = "Build METS/MODS digitization packages from folders of page scans")]
#[command(long_about = "\
Build METS/MODS digitization packages from folders of page scans

Each subfolder of --folder is one unit and yields one {identifier}_mets.xml
in the output folder, with delivery files under binaries/.

Input layouts by document type (objects.type in the metadata file):

  monograph   books/
              ├── MyBook_Title/          # unit, title = first _ token
              │   ├── 01_Preface/        # optional chapters, label = last _ token
              │   │   └── scan_1.tif
              │   └── 02_Main Part/
              └── Other_Book/
                  └── 001.jpg            # flat book, no chapters

  journal     volumes/
              └── Times_1920/            # unit, {title}_{YYYY}
                  ├── 01_Issue1/         # optional issues
                  └── 02_Issue2/

  newspaper   2345678-9/                 # folder name = ZDB id
              └── Gazette_1920-05-03/    # one issue, ISO date required

JPEGs are preferred over TIFFs in the same folder; files containing 'thumb'
are reused as thumbnails.

Run 'mets-packager gen-config' to print a documented metadata file.")]
#[command(version)]
#[command(subcommand_negates_reqs = true)]
#[command(group(ArgGroup::new("text").args(["ocr", "fulltext"])))]
struct Cli {
    /// Metadata file (TOML)
    #[arg(long, required = true)]
    metadata: Option<PathBuf>,

    /// Input folder holding one subfolder per unit
    #[arg(long, required = true)]
    folder: Option<PathBuf>,

    /// Output folder
    #[arg(long, default_value = "./structmeta_output")]
    output: PathBuf,

    /// Generate thumbnails when a folder has none
    #[arg(long)]
    thumbnails: bool,

    /// Run OCR and add a FULLTEXT file group
    #[arg(long)]
    ocr: bool,

    /// Add a FULLTEXT file group referencing {image name}.xml without running OCR
    #[arg(long)]
    fulltext: bool,

    /// Rename delivery files to {identifier}_{NNN}
    #[arg(long)]
    rename: bool,

    /// Pack binaries and METS files into ZIP archives
    #[arg(long)]
    zip: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a stock metadata file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_metadata_toml());
        return Ok(());
    }

    let metadata_path = cli.metadata.ok_or("--metadata is required")?;
    let input = cli.folder.ok_or("--folder is required")?;

    let started = Local::now();
    let log_file = logging::init(&cli.output, started)?;

    let metadata = config::load_metadata(&metadata_path).inspect_err(|e| {
        error!(file = %metadata_path.display(), error = %e, "metadata rejected");
    })?;

    let fulltext = if cli.ocr {
        FulltextMode::Ocr
    } else if cli.fulltext {
        FulltextMode::FromImageNames
    } else {
        FulltextMode::Off
    };

    let ocr = TesseractCli::from_config(&metadata.ocr);
    if fulltext == FulltextMode::Ocr {
        let version = ocr.version().inspect_err(|e| error!(error = %e, "OCR unavailable"))?;
        info!(engine = %version, "OCR engine");
    }

    init_thread_pool(&metadata.processing);

    let options = RunOptions {
        input: input.clone(),
        output: cli.output.clone(),
        derive: DeriveOptions {
            rename: cli.rename,
            thumbnails: cli.thumbnails,
            fulltext,
            delivery: DeliveryConfig {
                max_dimensions: metadata.objects.max_dimensions,
                quality: Quality::new(metadata.objects.jpg_quality),
            },
        },
        created: started.with_timezone(&Utc),
    };
    info!(
        metadata = %metadata_path.display(),
        log = %log_file.display(),
        zip = cli.zip,
        "parameters"
    );

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_unit_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = pipeline::run(&metadata, &options, &RustBackend::new(), &ocr, Some(tx));
    printer.join().ok();
    let summary = result?;
    output::print_summary(&summary);

    if cli.zip {
        let stamp = started.format("%Y-%m-%d_%H-%M-%S").to_string();
        let packed = package::package(
            &cli.output,
            &file_name(&input),
            &stamp,
            fulltext == FulltextMode::Ocr,
        )?;
        output::print_package(&packed);
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
