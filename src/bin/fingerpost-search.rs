//! `fingerpost-search` runs one query against a set of index files and
//! prints the matching documents, lowest rank first.

use argparse::{ArgumentParser, Collect, List};
use fingerpost::QueryProcessor;

fn main() {
    env_logger::init();

    let mut indexes: Vec<String> = vec![];
    let mut words: Vec<String> = vec![];

    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Search one or more index files for documents matching every word.");
        _ = ap.refer(&mut indexes).add_option(
            &["-i", "--index"],
            Collect,
            "An index file to search (repeatable).",
        );
        _ = ap
            .refer(&mut words)
            .add_argument("words", List, "Query words; a document must contain them all.");
        ap.parse_args_or_exit();
    }

    if indexes.is_empty() {
        println!("error: no index files given (use --index)");
        return;
    }
    if words.is_empty() {
        println!("error: empty query");
        return;
    }

    let query: Vec<String> = words.iter().map(|w| w.to_ascii_lowercase()).collect();
    let query: Vec<&str> = query.iter().map(String::as_str).collect();

    let result = QueryProcessor::open(&indexes).and_then(|mut qp| qp.process_query(&query));
    match result {
        Ok(results) => {
            if results.is_empty() {
                println!("no matching documents");
            }
            for hit in results {
                println!("{} ({})", hit.document_name, hit.rank);
            }
        }
        Err(err) => println!("error: {err}"),
    }
}
