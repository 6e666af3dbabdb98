use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use uniquegen::{
    config::{Settings, normalize_extension, normalize_prefix, parse_count, parse_size},
    generator::{CharacterClass, CharacterClasses},
    logging,
    materializer::{FileMaterializer, Progress, RunConfig, SpaceCheck},
};

#[derive(Parser)]
#[command(name = "uniquegen")]
#[command(about = "create any number of files with unique names and, optionally, unique contents")]
struct Cli {
    /// number of files to create, e.g. 10 or 1,000
    #[arg(value_parser = parse_count)]
    count: u64,

    /// file name prefix; a space is added after it unless it ends in a symbol
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// file extension, the leading period is optional
    #[arg(short, long, default_value = "")]
    extension: String,

    /// output directory, created if needed
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// size of each file (e.g. 1000, 10KB, 1MB), filled with random characters;
    /// without it each file contains its own name
    #[arg(short, long, value_parser = parse_size)]
    size: Option<u64>,

    /// milliseconds to wait between files
    #[arg(short, long, default_value_t = 0)]
    delay: u64,

    /// character classes used for names and contents
    #[arg(long, value_enum, value_delimiter = ',')]
    chars: Vec<Chars>,

    /// seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// start each file with a UTF-8 byte order mark
    #[arg(long)]
    bom: bool,

    /// settings file (defaults to ./uniquegen.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// skip confirmation prompts for large requests
    #[arg(short, long)]
    yes: bool,

    /// print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Chars {
    Upper,
    Lower,
    Number,
}

impl From<Chars> for CharacterClass {
    fn from(chars: Chars) -> Self {
        match chars {
            Chars::Upper => CharacterClass::UpperCaseLetter,
            Chars::Lower => CharacterClass::LowerCaseLetter,
            Chars::Number => CharacterClass::Number,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Cancelled due to error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load_or_default(cli.config.as_deref())?;
    let _log_guard = logging::init(&settings.logging);

    let run_config = resolve(&cli, &settings)?;

    if !cli.yes && !confirm_high_values(&run_config, &settings)? {
        println!("Operation cancelled.");
        return Ok(());
    }

    let mut materializer = FileMaterializer::new()
        .with_seed(cli.seed)
        .with_space_check(settings.space.check)
        .with_safety_margin(settings.space.safety_margin);

    let bar = if cli.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(run_config.file_count)
    };
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ({percent}%) {elapsed_precise}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let result = materializer.run_with_progress(&run_config, |progress: Progress| {
        bar.set_position(progress.created)
    });
    bar.finish_and_clear();
    let summary = result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.space_check == SpaceCheck::Inconclusive {
        println!("Free space could not be checked before starting.");
    }
    println!(
        "{} files created in {} ({} bytes, {:.2?}).",
        summary.files_created,
        summary.output_directory.display(),
        summary.bytes_written,
        summary.elapsed
    );
    Ok(())
}

fn resolve(cli: &Cli, settings: &Settings) -> Result<RunConfig, Box<dyn std::error::Error>> {
    let size_in_bytes = match cli.size {
        Some(0) => return Err("file size cannot be 0".into()),
        Some(size) => Some(usize::try_from(size)?),
        None => None,
    };

    let character_classes = if cli.chars.is_empty() {
        CharacterClasses::ALL
    } else {
        cli.chars.iter().copied().map(CharacterClass::from).collect()
    };

    Ok(RunConfig::new(cli.count)
        .with_prefix(normalize_prefix(&cli.prefix))
        .with_extension(normalize_extension(&cli.extension))
        .with_output_directory(&cli.output)
        .with_size(size_in_bytes)
        .with_delay(Duration::from_millis(cli.delay))
        .with_character_classes(character_classes)
        .with_name_length(settings.generation.name_length)
        .with_bom(cli.bom))
}

fn confirm_high_values(config: &RunConfig, settings: &Settings) -> io::Result<bool> {
    let warnings = &settings.warnings;

    if config.file_count > warnings.file_count
        && !confirm("You've requested the creation of many files. Do you want to continue?")?
    {
        return Ok(false);
    }
    if config
        .size_in_bytes
        .is_some_and(|size| size as u64 > warnings.file_size)
        && !confirm("You've requested very large files. Do you want to continue?")?
    {
        return Ok(false);
    }
    if config.creation_delay > Duration::from_millis(warnings.delay_ms)
        && !confirm("You've requested a very long delay between files. Do you want to continue?")?
    {
        return Ok(false);
    }
    Ok(true)
}

fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
