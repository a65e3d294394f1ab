//! `fingerpost-fsck` audits one index file and prints every structural
//! problem it can find. Its findings are advisory: the exit status is
//! zero even for a damaged file, unless the file cannot be read at all.

use std::path::PathBuf;

use argparse::{ArgumentParser, Store};
use fingerpost::fsck::check_index_file;

fn main() {
    env_logger::init();

    let mut filename = String::new();

    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Validate the structure of an index file.");
        _ = ap
            .refer(&mut filename)
            .add_argument("index", Store, "The index file to check.")
            .required();
        ap.parse_args_or_exit();
    }

    match check_index_file(&PathBuf::from(&filename)) {
        Ok(report) => {
            for diagnostic in &report.diagnostics {
                println!("{diagnostic}");
            }
            if report.is_clean() {
                println!("{filename}: clean");
            } else {
                println!(
                    "{filename}: {} problem(s) found",
                    report.diagnostics.len()
                );
            }
        }
        Err(err) => {
            println!("error: {err}");
            std::process::exit(1);
        }
    }
}
