use std::path::Path;

use flagops_lib::ops::{self, ImportMode};
use flagops_lib::Error;

use crate::GlobalOpts;

pub fn run_import(opts: &GlobalOpts, file: &Path, continue_on_error: bool) -> Result<(), Error> {
    // Read and parse locally before touching the network.
    let records = ops::read_import_file(file)?;
    let (conn, client) = opts.connect()?;

    let mode = if continue_on_error {
        ImportMode::ContinueOnError
    } else {
        ImportMode::FailFast
    };
    let report = ops::import_flags(&client, &conn.environment, records, mode)?;

    for (key, e) in &report.failed {
        eprintln!("✗ {}: {}", key, e);
    }
    if report.skipped > 0 {
        eprintln!("Stopped after first failure, {} flags not attempted", report.skipped);
    }
    println!(
        "Imported {} of {} flags into {}",
        report.succeeded,
        report.total(),
        conn.environment
    );
    report.check()
}

pub fn run_export(opts: &GlobalOpts, output: Option<&Path>) -> Result<(), Error> {
    let (conn, client) = opts.connect()?;
    let doc = ops::export_flags(&client, &conn.environment)?;
    let body = serde_json::to_string_pretty(&doc)?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", body)).map_err(|source| Error::WriteFile {
                path: path.to_path_buf(),
                source,
            })?;
            eprintln!(
                "✓ Exported {} flags from {} to {}",
                doc.flags.len(),
                conn.environment,
                path.display()
            );
        }
        None => println!("{}", body),
    }
    Ok(())
}
