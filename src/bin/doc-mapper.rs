use std::{
    env, fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use doc_mapper::{DocumentMapper, DocumentMapperParser, IndexSettings, MappingSource};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct ParseOptions {
    type_name: Option<String>,
    settings: Option<PathBuf>,
    pretty: bool,
    expect_digest: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    if args.len() < 3 {
        return Err("not enough arguments".to_string());
    }

    let command = args[1].as_str();
    let file = PathBuf::from(&args[2]);
    let options = parse_options(command, &args[3..])?;

    match command {
        "validate" => {
            let mapper = parse_file(&file, &options)?;
            println!("OK: type [{}]", mapper.type_name());
            Ok(())
        }
        "normalize" => {
            let mapper = parse_file(&file, &options)?;
            let out = mapper
                .to_json_string(options.pretty)
                .map_err(|e| e.to_string())?;
            println!("{out}");
            Ok(())
        }
        "digest" => {
            let mapper = parse_file(&file, &options)?;
            let source = mapper.mapping_source().map_err(|e| e.to_string())?;
            if let Some(expected) = &options.expect_digest {
                source.verify_digest(expected).map_err(|e| e.to_string())?;
            }
            println!("{}", source.digest());
            Ok(())
        }
        _ => Err(format!("unknown command '{command}'")),
    }
}

fn parse_file(file: &Path, options: &ParseOptions) -> Result<DocumentMapper, String> {
    let settings = match &options.settings {
        Some(path) => IndexSettings::from_path(path).map_err(|e| e.to_string())?,
        None => IndexSettings::new(default_index_name(file)),
    };
    let input = fs::read(file).map_err(|e| format!("failed to read '{}': {e}", file.display()))?;

    let parser = DocumentMapperParser::from_settings(settings).map_err(|e| e.to_string())?;
    parser
        .parse(options.type_name.as_deref(), Some(&MappingSource::from_bytes(input)))
        .map_err(|e| e.to_string())
}

fn default_index_name(file: &Path) -> String {
    file.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("index")
        .to_string()
}

fn parse_options(command: &str, args: &[String]) -> Result<ParseOptions, String> {
    let mut options = ParseOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--type" => {
                options.type_name = Some(option_value(args, i, "--type")?);
                i += 2;
            }
            "--settings" => {
                options.settings = Some(PathBuf::from(option_value(args, i, "--settings")?));
                i += 2;
            }
            "--pretty" if command == "normalize" => {
                options.pretty = true;
                i += 1;
            }
            "--expect" if command == "digest" => {
                options.expect_digest = Some(option_value(args, i, "--expect")?);
                i += 2;
            }
            other => return Err(format!("unknown option '{other}'")),
        }
    }

    Ok(options)
}

fn option_value(args: &[String], i: usize, flag: &str) -> Result<String, String> {
    args.get(i + 1)
        .cloned()
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  doc-mapper validate <mapping.json> [--type NAME] [--settings FILE]");
    eprintln!("  doc-mapper normalize <mapping.json> [--type NAME] [--settings FILE] [--pretty]");
    eprintln!("  doc-mapper digest <mapping.json> [--type NAME] [--settings FILE] [--expect sha256:HEX]");
    eprintln!();
    eprintln!("settings file: JSON index settings, e.g. {{\"index_name\": \"logs\"}}");
    eprintln!("logging: set RUST_LOG=doc_mapper=debug for parse events");
}
