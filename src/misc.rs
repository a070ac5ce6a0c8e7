// This file contains miscellaneous functions used by various parts of asmval.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use indicatif::{ProgressBar, ProgressStyle};
use flate2::read::MultiGzDecoder;
use std::collections::HashSet;
use std::fs::{File, OpenOptions, create_dir_all};
use std::io;
use std::io::{prelude::*, BufReader, Read};
use std::path::Path;
use std::time::Duration;
use which::which;


pub fn create_dir(dir_path: &Path) {
    match create_dir_all(dir_path) {
        Ok(_) => {},
        Err(e) => quit_with_error(&format!("failed to create directory {}\n{}", dir_path.display(), e)),
    }
}


pub fn touch_file(path: &Path) {
    // Creates the file if it doesn't exist, leaving any existing contents alone.
    if let Err(e) = OpenOptions::new().create(true).append(true).open(path) {
        quit_with_error(&format!("failed to create file {}\n{}", path.display(), e));
    }
}


pub fn check_if_file_exists(filename: &Path) {
    // Quits with an error if the given path is not an existing file.
    if !filename.exists() {
        quit_with_error(&format!("file does not exist: {}", filename.display()));
    }
    if !filename.is_file() {
        quit_with_error(&format!("{} is not a file", filename.display()));
    }
}


pub fn check_if_dir_exists(dir: &Path) {
    // Quits with an error if the given path is not an existing directory.
    if !dir.exists() {
        quit_with_error(&format!("directory does not exist: {}", dir.display()));
    }
    if !dir.is_dir() {
        quit_with_error(&format!("{} is not a directory", dir.display()));
    }
}


pub fn check_if_dir_is_not_dir(dir: &Path) {
    // Quits with an error if the given path exists but is not a directory (not existing is okay).
    if dir.exists() && !dir.is_dir() {
        quit_with_error(&format!("{} exists but is not a directory", dir.display()));
    }
}


pub fn check_requirements(reqs: &[&str]) {
    for cmd in reqs {
        if which(cmd).is_err() {
            quit_with_error(&format!("required program '{cmd}' not found in $PATH"));
        }
    }
}


#[cfg(not(test))]
pub fn quit_with_error(text: &str) -> ! {
    // For friendly error messages, this function normally just prints the error and quits.
    eprintln!();
    eprintln!("Error: {}", text);
    std::process::exit(1);
}
#[cfg(test)]
pub fn quit_with_error(text: &str) -> ! {
    // But when running unit tests, this function instead panics so I can catch it for the test.
    panic!("{}", text);
}


pub fn open_text_file(filename: &Path) -> BufReader<Box<dyn Read>> {
    // Returns a reader for a text file that works on both unzipped and gzipped files.
    let file = File::open(filename).unwrap_or_else(|e| {
        quit_with_error(&format!("unable to open {}\n{}", filename.display(), e));
    });
    let reader: Box<dyn Read> = if is_file_gzipped(filename) { Box::new(MultiGzDecoder::new(file)) }
                                                        else { Box::new(file) };
    BufReader::new(reader)
}


fn is_file_gzipped(filename: &Path) -> bool {
    // Returns true if the file appears to be gzipped (based on the first two bytes). Files too
    // small to hold a gzip header are treated as plain text.
    let mut file = match File::open(filename) {
        Ok(file) => file,
        Err(e)   => quit_with_error(&format!("unable to open {}\n{}", filename.display(), e)),
    };
    let mut buf = [0u8; 2];
    match file.read_exact(&mut buf) {
        Ok(_)  => buf[0] == 31 && buf[1] == 139,
        Err(_) => false,
    }
}


pub fn load_fasta(filename: &Path) -> Vec<(String, String, String)> {
    // This function loads a FASTA file and runs a few checks on the result. If everything looks
    // good, it returns a vector of name+header+sequence tuples.
    let fasta_seqs = match read_fasta_records(filename) {
        Ok(seqs) => seqs,
        Err(e)   => quit_with_error(&format!("unable to load {}\n{}", filename.display(), e)),
    };
    check_load_fasta(&fasta_seqs, filename);
    fasta_seqs
}


fn check_load_fasta(fasta_seqs: &[(String, String, String)], filename: &Path) {
    if fasta_seqs.is_empty() {
        quit_with_error(&format!("{} contains no sequences", filename.display()));
    }
    for (name, _, sequence) in fasta_seqs {
        if name.is_empty() {
            quit_with_error(&format!("{} has an unnamed sequence", filename.display()));
        }
        if sequence.is_empty() {
            quit_with_error(&format!("{} has an empty sequence", filename.display()));
        }
    }
    let mut set = HashSet::new();
    for (name, _, _) in fasta_seqs {
        if !set.insert(name) {
            quit_with_error(&format!("{} has a duplicate name: {}", filename.display(), name));
        }
    }
}


fn read_fasta_records(filename: &Path) -> io::Result<Vec<(String, String, String)>> {
    let mut fasta_seqs = Vec::new();
    let mut name = String::new();
    let mut header = String::new();
    let mut sequence = String::new();
    for line in open_text_file(filename).lines() {
        let text = line?;
        let text = text.trim_end();
        if text.is_empty() { continue; }
        if let Some(stripped) = text.strip_prefix('>') {
            if !name.is_empty() {
                fasta_seqs.push((name, header, sequence));
                sequence = String::new();
            }
            header = stripped.to_string();
            name = match header.split_whitespace().next() {
                Some(first_piece) => first_piece.to_string(),
                None => quit_with_error(&format!("{} is not correctly formatted", filename.display())),
            };
        } else {
            if name.is_empty() {
                quit_with_error(&format!("{} is not correctly formatted", filename.display()));
            }
            sequence.push_str(text);
        }
    }
    if !name.is_empty() {
        fasta_seqs.push((name, header, sequence));
    }
    Ok(fasta_seqs)
}


pub fn format_duration(duration: Duration) -> String {
    let microseconds = duration.as_micros() % 1000000;
    let seconds =      duration.as_micros() / 1000000 % 60;
    let minutes =      duration.as_micros() / 1000000 / 60 % 60;
    let hours =        duration.as_micros() / 1000000 / 60 / 60;
    format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, microseconds)
}


pub fn format_float(num: f64) -> String {
    // Formats a float with up to six decimal places but then drops trailing zeros.
    let mut formatted = format!("{:.6}", num);
    if !formatted.contains('.') { return formatted }
    while formatted.ends_with('0') { formatted.pop(); }
    if formatted.ends_with('.') { formatted.pop(); }
    formatted
}


pub fn spinner(message: &str) -> ProgressBar {
    if cfg!(test) {
        ProgressBar::hidden() // don't show a spinner during unit tests
    } else {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::default_spinner()
                .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
                .template("{spinner} {msg}").unwrap(),
        );
        pb.set_message(message.to_string());
        pb
    }
}
