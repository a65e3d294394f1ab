//! `fingerpost` builds an inverted index for a directory of documents
//! and writes it out as a single binary index file.

use std::path::PathBuf;

use argparse::{ArgumentParser, Store};
use fingerpost::build_index_file;

fn main() {
    env_logger::init();

    let mut docroot = String::new();
    let mut output = "index.fgp".to_string();

    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Build a searchable index file for a directory of documents.");
        _ = ap.refer(&mut output).add_option(
            &["-o", "--output"],
            Store,
            "Where to write the index file (default: index.fgp).",
        );
        _ = ap
            .refer(&mut docroot)
            .add_argument("docroot", Store, "Directory tree to index.")
            .required();
        ap.parse_args_or_exit();
    }

    match build_index_file(&PathBuf::from(&docroot), &PathBuf::from(&output)) {
        Ok(bytes) => println!("wrote {output}: {bytes} bytes"),
        Err(err) => println!("error: {err}"),
    }
}
