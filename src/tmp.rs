//! Unique temporary files for staging an index before it is renamed
//! into place, so a finished index file appears atomically.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

/// Generates uniquely named `.tmp` files inside one directory.
pub struct TmpDir {
    dir: PathBuf,
    n: usize,
}

impl TmpDir {
    /// A generator for temporary files under `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> TmpDir {
        TmpDir {
            dir: dir.as_ref().to_owned(),
            n: 1,
        }
    }

    /// Create a fresh temporary file, failing only if a thousand name
    /// candidates in a row already exist.
    pub fn create(&mut self) -> io::Result<(PathBuf, BufWriter<File>)> {
        let mut attempt = 1;
        loop {
            let filename = self.dir.join(format!("tmp{:08x}.tmp", self.n));
            self.n += 1;
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&filename)
            {
                Ok(f) => return Ok((filename, BufWriter::new(f))),
                Err(exc) => {
                    if attempt < 999 && exc.kind() == io::ErrorKind::AlreadyExists {
                        // keep going
                    } else {
                        return Err(exc);
                    }
                }
            }
            attempt += 1;
        }
    }
}
