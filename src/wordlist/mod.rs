use std::fs::File;
use std::io::{BufRead, BufReader};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WordlistError {
    #[error("wordlist not found: {path}")]
    SourceNotFound { path: String },

    #[error("failed to read wordlist: {path}: {source}")]
    SourceReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub enum WordlistSource {
    FilePath(String),
    Inline(Vec<String>),
}

impl WordlistSource {
    // a short label used in the run overview
    pub fn describe(&self) -> String {
        match self {
            WordlistSource::FilePath(path) => path.clone(),
            WordlistSource::Inline(values) => format!("inline({})", values.len()),
        }
    }

    // Opens the source and returns a lazy iterator over its trimmed, non-empty
    // lines in source order. Missing or unreadable files are fatal.
    pub fn words(&self) -> Result<Words, WordlistError> {
        match self {
            WordlistSource::Inline(values) => Ok(Words {
                inner: WordsInner::Inline(values.clone().into_iter()),
            }),
            WordlistSource::FilePath(path) => {
                let path = crate::config::expand_tilde_string(path);
                let handle = File::open(&path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => WordlistError::SourceNotFound {
                        path: path.clone(),
                    },
                    _ => WordlistError::SourceReadError {
                        path: path.clone(),
                        source: e,
                    },
                })?;
                Ok(Words {
                    inner: WordsInner::File {
                        path,
                        reader: BufReader::new(handle),
                        buf: Vec::new(),
                    },
                })
            }
        }
    }

    pub fn count(&self) -> Result<usize, WordlistError> {
        let mut count = 0usize;
        for word in self.words()? {
            word?;
            count += 1;
        }
        Ok(count)
    }

    pub fn load(&self) -> Result<Vec<String>, WordlistError> {
        self.words()?.collect()
    }
}

enum WordsInner {
    Inline(std::vec::IntoIter<String>),
    File {
        path: String,
        reader: BufReader<File>,
        buf: Vec<u8>,
    },
}

pub struct Words {
    inner: WordsInner,
}

impl Iterator for Words {
    type Item = Result<String, WordlistError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            WordsInner::Inline(values) => {
                for value in values.by_ref() {
                    let word = value.trim();
                    if !word.is_empty() {
                        return Some(Ok(word.to_string()));
                    }
                }
                None
            }
            WordsInner::File { path, reader, buf } => loop {
                buf.clear();
                match reader.read_until(b'\n', buf) {
                    Ok(0) => return None,
                    Ok(_) => {
                        let line = decode_dropping_invalid(&buf[..]);
                        let word = line.trim();
                        if word.is_empty() {
                            continue;
                        }
                        return Some(Ok(word.to_string()));
                    }
                    Err(e) => {
                        return Some(Err(WordlistError::SourceReadError {
                            path: path.clone(),
                            source: e,
                        }))
                    }
                }
            },
        }
    }
}

// Undecodable byte sequences are dropped rather than failing the run. A
// literal U+FFFD in the file is valid text and is kept.
fn decode_dropping_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    out.push_str(valid);
                }
                match e.error_len() {
                    Some(len) => bytes = &rest[len..],
                    // truncated sequence at the end of the line
                    None => return out,
                }
            }
        }
    }
}
