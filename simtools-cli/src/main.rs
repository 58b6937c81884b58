use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use simtools_core::config::{default_config_path, save_config};
use simtools_core::stats::report_file;
use simtools_core::{
    build_mapping, join_candidate, load_config, locate_script, optimize_assets, Backend,
    OptimizeSettings, Result, ToolsConfig, ToolsError,
};

#[derive(Debug, Parser)]
#[command(name = "simtools", version, about = "Asset and script tooling for the simulator game")]
struct Args {
    /// Project root; relative paths in the config resolve against it.
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// JSON config file (defaults to the per-user config when present).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Count narrative screens and words in the game script
    Stats {
        #[arg(long, value_name = "PATH")]
        script: Option<String>,

        /// Characters after a `function showIntroScreen(` header in which
        /// intro calls are ignored.
        #[arg(long)]
        lookback: Option<usize>,

        /// Print per-category counts after the totals.
        #[arg(long, default_value_t = false)]
        breakdown: bool,
    },
    /// Build the obfuscated asset lookup table
    Obfuscate {
        #[arg(long, value_name = "DIR")]
        assets: Option<String>,

        #[arg(long, value_name = "FILE")]
        output: Option<String>,

        /// Also rename the files on disk to their hashed names.
        #[arg(long, default_value_t = false)]
        rename: bool,
    },
    /// Compress PNG assets and create WebP versions
    Optimize {
        #[arg(long, value_name = "DIR")]
        assets: Option<String>,

        #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
        backend: BackendArg,

        /// pngquant quality range, e.g. 75-90.
        #[arg(long, value_name = "RANGE")]
        png_quality: Option<String>,

        #[arg(long, value_name = "N")]
        webp_quality: Option<u8>,

        #[arg(long, default_value_t = false)]
        no_webp: bool,
    },
    /// Print the effective configuration
    Config {
        /// Write it to the config file instead of printing.
        #[arg(long, default_value_t = false)]
        save: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Auto,
    Pngquant,
    Builtin,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Pngquant => Backend::Pngquant,
            BackendArg::Builtin => Backend::Builtin,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_stats(
    root: &Path,
    cfg: &ToolsConfig,
    script: Option<String>,
    lookback: Option<usize>,
    breakdown: bool,
) -> Result<()> {
    let script_path = match script {
        // An explicit script must exist as given.
        Some(s) => join_candidate(root, &s),
        None => locate_script(root, &cfg.script)?,
    };
    let report = report_file(&script_path, lookback.unwrap_or(cfg.lookback))?;

    println!("{report}");
    if breakdown {
        for line in report.breakdown_lines() {
            println!("{line}");
        }
    }
    Ok(())
}

fn run_obfuscate(
    root: &Path,
    cfg: &ToolsConfig,
    assets: Option<String>,
    output: Option<String>,
    rename: bool,
) -> Result<()> {
    let assets_dir = join_candidate(root, assets.as_deref().unwrap_or(&cfg.assets_dir));
    let output = join_candidate(root, output.as_deref().unwrap_or(&cfg.mapping_output));

    let mapping = build_mapping(&assets_dir, &cfg.keep_names)?;
    println!("Found {} files to obfuscate", mapping.len());
    if !mapping.is_empty() {
        println!("Examples:");
        for (original, obfuscated) in mapping.iter().take(5) {
            println!("  {original} -> {obfuscated}");
        }
    }

    mapping.write_js(&output)?;
    println!("Mapping saved to {}", output.display());

    if rename {
        let renamed = mapping.apply_renames()?;
        println!("Renamed {renamed} files in {}", assets_dir.display());
    } else {
        println!("Add the snippet to the top of game.js and wrap asset paths:");
        println!("  changeScene(getAssetPath('assets/background-office.png'))");
    }
    Ok(())
}

fn run_optimize(
    root: &Path,
    cfg: &ToolsConfig,
    assets: Option<String>,
    backend: BackendArg,
    png_quality: Option<String>,
    webp_quality: Option<u8>,
    no_webp: bool,
) -> Result<()> {
    let assets_dir = join_candidate(root, assets.as_deref().unwrap_or(&cfg.assets_dir));

    let mut settings = OptimizeSettings::from_config(cfg);
    settings.backend = backend.into();
    settings.webp = !no_webp;
    if let Some(q) = png_quality {
        settings.png_quality = q;
    }
    if let Some(q) = webp_quality {
        settings.webp_quality = q;
    }

    let summary = optimize_assets(&assets_dir, &settings)?;
    println!(
        "Optimised {}/{} PNG files with {}",
        summary.optimized, summary.found, summary.backend
    );
    if settings.webp {
        println!("Wrote {} WebP files", summary.webp_written);
    }
    for failure in &summary.failures {
        eprintln!("Failed: {}: {}", failure.path.display(), failure.message);
    }
    Ok(())
}

fn run_config(explicit: Option<&Path>, cfg: &ToolsConfig, save: bool) -> Result<()> {
    if save {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(default_config_path)
            .ok_or_else(|| ToolsError::Config("no config directory on this platform".to_string()))?;
        save_config(cfg, &path)?;
        println!("Config saved to {}", path.display());
    } else {
        println!("{}", cfg.to_json()?);
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let explicit = args.config.as_deref();
    // `config --save` may target a file that does not exist yet.
    let cfg = match (&args.command, explicit) {
        (Command::Config { save: true }, Some(path)) if !path.exists() => ToolsConfig::default(),
        _ => load_config(explicit)?,
    };

    match args.command {
        Command::Stats {
            script,
            lookback,
            breakdown,
        } => run_stats(&args.root, &cfg, script, lookback, breakdown),
        Command::Obfuscate {
            assets,
            output,
            rename,
        } => run_obfuscate(&args.root, &cfg, assets, output, rename),
        Command::Optimize {
            assets,
            backend,
            png_quality,
            webp_quality,
            no_webp,
        } => run_optimize(
            &args.root,
            &cfg,
            assets,
            backend,
            png_quality,
            webp_quality,
            no_webp,
        ),
        Command::Config { save } => run_config(explicit, &cfg, save),
    }
}

fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
