//! forge – command-line template exporter and template store.
//!
//! Usage:
//!   forge export <template.json> [--products <records.json>] [--out <dir>]
//!                [--landscape] [--title "My Labels"]
//!   forge templates list|show <id>|save <template.json>|delete <id>
//!                [--store <dir>]
//!
//! Exported PDFs are named after the template (`<name>_template.pdf`, or
//! `<name>_products.pdf` when records are given) and written to `--out`
//! (default: the current directory).

use std::path::{Path, PathBuf};
use std::{env, fs, process};

use label_forge::document::{export_file_name, ExportKind};
use label_forge::pipeline::{Assembler, CancelFlag, ExportConfig, PageOrientation};
use label_forge::store::{FileBackend, TemplateStore};
use label_forge::widget::{Record, Template};

const DEFAULT_STORE_DIR: &str = ".label-forge";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("forge");

    match args.get(1).map(String::as_str) {
        Some("export") => run_export(prog, &args[2..]),
        Some("templates") => run_templates(prog, &args[2..]),
        Some("--help" | "-h") => {
            print_usage(prog);
            process::exit(0);
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_usage(prog);
            process::exit(1);
        }
        None => {
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn run_export(prog: &str, args: &[String]) {
    let mut template_path: Option<PathBuf> = None;
    let mut products_path: Option<PathBuf> = None;
    let mut out_dir = PathBuf::from(".");
    let mut landscape = false;
    let mut title: Option<String> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--landscape" | "-l" => landscape = true,
            "--title" | "-t" => title = Some(flag_value(prog, arg, iter.next())),
            "--products" | "-p" => products_path = Some(PathBuf::from(flag_value(prog, arg, iter.next()))),
            "--out" | "-o" => out_dir = PathBuf::from(flag_value(prog, arg, iter.next())),
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(prog);
                process::exit(1);
            }
            path if template_path.is_none() => template_path = Some(PathBuf::from(path)),
            path => {
                eprintln!("Unexpected argument: {path}");
                print_usage(prog);
                process::exit(1);
            }
        }
    }

    let Some(template_path) = template_path else {
        eprintln!("Error: no template file specified.");
        print_usage(prog);
        process::exit(1);
    };

    let template = read_template(&template_path);
    let config = ExportConfig {
        title: title.unwrap_or_default(),
        orientation: if landscape {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        },
        ..ExportConfig::default()
    };
    let assembler = Assembler::new(config);

    let result = match &products_path {
        Some(path) => {
            let json = read_file(path);
            let records = Record::list_from_json(&json).unwrap_or_else(|e| {
                eprintln!("Error parsing records '{}': {e}", path.display());
                process::exit(1);
            });
            assembler
                .export_batch(&template, &records, &CancelFlag::new())
                .map(|doc| (doc, ExportKind::Products))
        }
        None => assembler
            .export_single(&template)
            .map(|doc| (doc, ExportKind::Template)),
    };

    let (doc, kind) = result.unwrap_or_else(|e| {
        eprintln!("Error exporting template: {e}");
        process::exit(1);
    });
    let bytes = doc.to_pdf().unwrap_or_else(|e| {
        eprintln!("Error generating PDF: {e}");
        process::exit(1);
    });

    if let Err(e) = fs::create_dir_all(&out_dir) {
        eprintln!("Error creating output directory: {e}");
        process::exit(1);
    }
    let output = out_dir.join(export_file_name(&template.name, kind));
    if let Err(e) = fs::write(&output, &bytes) {
        eprintln!("Error writing '{}': {e}", output.display());
        process::exit(1);
    }
    let pages = doc.page_count();
    eprintln!(
        "Wrote '{}' ({} bytes, {} page{})",
        output.display(),
        bytes.len(),
        pages,
        if pages == 1 { "" } else { "s" }
    );
}

fn run_templates(prog: &str, args: &[String]) {
    let mut store_dir = PathBuf::from(DEFAULT_STORE_DIR);
    let mut positional: Vec<&str> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--store" | "-s" => store_dir = PathBuf::from(flag_value(prog, arg, iter.next())),
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(prog);
                process::exit(1);
            }
            other => positional.push(other),
        }
    }

    let backend = FileBackend::open(&store_dir).unwrap_or_else(|e| {
        eprintln!("Error opening store '{}': {e}", store_dir.display());
        process::exit(1);
    });
    let mut store = TemplateStore::new(backend);

    match positional.as_slice() {
        ["list"] => {
            for t in store.list() {
                println!("{}\t{}\t{} widget(s)", t.id, t.name, t.widgets.len());
            }
        }
        ["show", id] => match store.get_by_id(parse_id(id)) {
            Some(t) => match t.to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serialising template {id}: {e}");
                    process::exit(1);
                }
            },
            None => {
                eprintln!("No template with id {id}");
                process::exit(1);
            }
        },
        ["save", path] => {
            let template = read_template(Path::new(path));
            let id = template.id;
            match store.save(template) {
                Ok(all) => eprintln!("Saved template {id} ({} stored)", all.len()),
                Err(e) => {
                    eprintln!("Error saving template: {e}");
                    process::exit(1);
                }
            }
        }
        ["delete", id] => match store.delete(parse_id(id)) {
            Ok(all) => eprintln!("Deleted template {id} ({} stored)", all.len()),
            Err(e) => {
                eprintln!("Error deleting template: {e}");
                process::exit(1);
            }
        },
        _ => {
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn flag_value(prog: &str, flag: &str, value: Option<&String>) -> String {
    match value {
        Some(v) => v.clone(),
        None => {
            eprintln!("Missing value for {flag}");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn parse_id(s: &str) -> u64 {
    s.parse().unwrap_or_else(|_| {
        eprintln!("Invalid template id: {s}");
        process::exit(1);
    })
}

fn read_file(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading '{}': {e}", path.display());
        process::exit(1);
    })
}

fn read_template(path: &Path) -> Template {
    Template::from_json(&read_file(path)).unwrap_or_else(|e| {
        eprintln!("Error parsing template '{}': {e}", path.display());
        process::exit(1);
    })
}

fn print_usage(prog: &str) {
    eprintln!("forge – widget template to PDF exporter (label-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} export <template.json> [--products <records.json>] [--out <dir>] [--landscape] [--title \"My Labels\"]");
    eprintln!("  {prog} templates list|show <id>|save <template.json>|delete <id> [--store <dir>]");
    eprintln!();
    eprintln!("Export flags:");
    eprintln!("  --products, -p  JSON array of records; one page group per record");
    eprintln!("  --out, -o       Output directory (default: current directory)");
    eprintln!("  --title, -t     Document title in PDF metadata (default: template name)");
    eprintln!("  --landscape     Use landscape page orientation (A4 841×595 pt)");
    eprintln!();
    eprintln!("Template store flags:");
    eprintln!("  --store, -s     Store directory (default: {DEFAULT_STORE_DIR})");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for pipeline diagnostics.");
}
