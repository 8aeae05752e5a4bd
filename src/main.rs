use clap::{Arg, Command};
use inquiry_reader::materializer::PdfCapability;
use inquiry_reader::runner::{render_csv, FileOutcome, FileReport, RunLogEntry};
use inquiry_reader::{
    Config, Runner, SupabaseStorage, SupabaseTable, TextMaterializer, TreeWalker,
};
use log::LevelFilter;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("inquiry-reader")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Reads vendor PDF/HTML documents from Supabase Storage, detects payment-status inquiries, checks the invoice table, and drafts reply emails")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("inquiry-reader.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("bucket")
                .short('b')
                .long("bucket")
                .value_name("NAME")
                .help("Storage bucket to scan (overrides configuration)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("prefix")
                .short('p')
                .long("prefix")
                .value_name("PATH")
                .help("Folder prefix to scan from (overrides configuration)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Maximum folder depth to scan, 0-10")
                .value_parser(clap::value_parser!(u32))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("show-listing")
                .long("show-listing")
                .help("Print the raw per-level listing trace (troubleshooting storage policies)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-only")
                .long("list-only")
                .help("List qualifying files and exit without processing")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("PATH")
                .help("Process only this file (repeatable); default is every listed file")
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("export-csv")
                .long("export-csv")
                .value_name("FILE")
                .help("Write the run log as CSV")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };
    config.apply_env();

    if let Some(bucket) = matches.get_one::<String>("bucket") {
        config.bucket = bucket.clone();
    }
    if let Some(prefix) = matches.get_one::<String>("prefix") {
        config.prefix = prefix.clone();
    }
    if let Some(max_depth) = matches.get_one::<u32>("max-depth") {
        config.max_depth = *max_depth;
    }

    if matches.get_flag("test-config") {
        println!("Bucket: {}", config.bucket);
        println!("Prefix: {}", if config.prefix.is_empty() { "(root)" } else { config.prefix.as_str() });
        println!("Table: {}", config.table);
        println!("Max depth: {}", config.clamped_max_depth());
        match config.validate() {
            Ok(()) => println!("Configuration OK"),
            Err(e) => {
                println!("Configuration invalid: {e}");
                process::exit(1);
            }
        }
        return;
    }

    // ConfigurationMissing is fatal: halt before any listing.
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        process::exit(1);
    }

    let storage = match SupabaseStorage::new(&config.supabase_url, &config.supabase_key, &config.bucket) {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("Error creating storage client: {e}");
            process::exit(1);
        }
    };
    let table = match SupabaseTable::new(&config.supabase_url, &config.supabase_key, &config.table) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error creating table client: {e}");
            process::exit(1);
        }
    };

    let materializer = TextMaterializer::new();
    if materializer.pdf_capability() == PdfCapability::Unavailable {
        log::warn!("Built without the pdf feature; PDF documents will be skipped as unparseable");
    }

    let walker = TreeWalker::new(config.clamped_max_depth());
    let (files, trace) = walker.list_files(&storage, &config.prefix).await;

    println!(
        "Found {} file(s) in bucket `{}` with prefix `{}`.",
        files.len(),
        config.bucket,
        if config.prefix.is_empty() { "(root)" } else { config.prefix.as_str() }
    );

    if matches.get_flag("show-listing") {
        match serde_json::to_string_pretty(&trace) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("Failed to render listing trace: {e}"),
        }
    }

    if files.is_empty() {
        println!();
        println!("No PDF/HTML files found here. Check bucket/prefix or storage policies:");
        println!("  - verify the exact bucket name");
        println!("  - try a blank prefix");
        println!("  - make the bucket public or add a storage read policy");
        println!("  - ensure files end in .pdf/.html/.htm");
        return;
    }

    for file in &files {
        println!("  {file}");
    }

    if matches.get_flag("list-only") {
        return;
    }

    let selected: Vec<String> = match matches.get_many::<String>("file") {
        Some(values) => {
            let requested: Vec<String> = values.cloned().collect();
            for path in &requested {
                if !files.contains(path) {
                    eprintln!("Selected file is not in the listing: {path}");
                    process::exit(1);
                }
            }
            requested
        }
        None => files.clone(),
    };

    println!();
    let runner = Runner::new();
    let mut run_log: Vec<RunLogEntry> = Vec::new();
    for (idx, path) in selected.iter().enumerate() {
        println!("{}/{} • {path}", idx + 1, selected.len());
        let report = runner.process_file(&storage, &table, path, &mut run_log).await;
        print_report(&report);
    }

    println!();
    print_run_log(&run_log);

    if let Some(csv_path) = matches.get_one::<String>("export-csv") {
        match std::fs::write(csv_path, render_csv(&run_log)) {
            Ok(()) => println!("Run log written to {csv_path}"),
            Err(e) => {
                eprintln!("Error writing run log: {e}");
                process::exit(1);
            }
        }
    }
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file(path)
    } else {
        log::debug!("Configuration file '{path}' not found, using default configuration");
        Ok(Config::default())
    }
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Set supabase_url/supabase_key there or via SUPABASE_URL/SUPABASE_ANON_KEY.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn print_report(report: &FileReport) {
    match &report.outcome {
        FileOutcome::DownloadFailed(e) => println!("  Download failed: {e}"),
        FileOutcome::Unparseable => {
            println!("  Could not parse file (build with the pdf feature for PDFs). Skipping.")
        }
        FileOutcome::NotAnInquiry => {
            println!("  This document does not look like a payment inquiry. Skipping.")
        }
        FileOutcome::LookupFailed(e) => println!("  Invoice lookup failed: {e}"),
        FileOutcome::Drafted(replies) => {
            println!(
                "  Detected invoice IDs: {}",
                if report.invoice_ids.is_empty() {
                    "—".to_string()
                } else {
                    report.invoice_ids.join(", ")
                }
            );
            println!(
                "  Detected vendor email: {}",
                report.vendor_email.as_deref().unwrap_or("—")
            );
            for reply in replies {
                println!();
                println!("Subject: {}", reply.email.subject);
                println!();
                println!("{}", reply.email.body);
            }
        }
    }
}

fn print_run_log(run_log: &[RunLogEntry]) {
    if run_log.is_empty() {
        println!("Run log: no replies drafted");
        return;
    }
    println!("Run log ({} entries):", run_log.len());
    println!(
        "  {:<40} {:<16} {:<12} {:<32} {}",
        "file", "invoice_no", "status", "action", "timestamp"
    );
    for entry in run_log {
        println!(
            "  {:<40} {:<16} {:<12} {:<32} {}",
            truncate(&entry.file, 40),
            entry.invoice_no.as_deref().unwrap_or("—"),
            truncate(&entry.status, 12),
            truncate(&entry.action, 32),
            entry.timestamp
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
