// This file contains the code for waiting on comparison jobs. Jobs signal completion by writing
// an empty *.done file into the result directory, so waiting is a matter of polling that
// directory until enough done files exist.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use std::fs::read_dir;
use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::misc::{format_duration, quit_with_error, spinner};


pub fn count_done_files(dir: &Path) -> usize {
    let entries = match read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => quit_with_error(&format!("unable to read directory {}\n{}", dir.display(), e)),
    };
    entries.flatten()
        .filter(|entry| entry.path().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".done"))
        .count()
}


pub fn wait_for_done_files(dir: &Path, expected: usize, interval: Duration,
                           timeout: Option<Duration>) -> usize {
    let start = Instant::now();
    let mut done = count_done_files(dir);
    if done >= expected {
        return done;
    }
    // The spinner is hidden when stderr isn't a terminal, so the wait is also announced once.
    eprintln!("{}", waiting_message(done, expected));
    let pb = spinner(&waiting_message(done, expected));
    while done < expected {
        let mut pause = interval;
        if let Some(timeout) = timeout {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                pb.finish_and_clear();
                quit_with_error(&format!("timed out after {} with {} of {} done files in {}",
                                         format_duration(elapsed), done, expected,
                                         dir.display()));
            }
            pause = pause.min(timeout - elapsed);
        }
        sleep(pause);
        done = count_done_files(dir);
        pb.set_message(waiting_message(done, expected));
    }
    pb.finish_and_clear();
    eprintln!("All {} done files present after {}", expected, format_duration(start.elapsed()));
    done
}


fn waiting_message(done: usize, expected: usize) -> String {
    format!("waiting for report files... ({}/{} done)", done, expected)
}


pub fn install_interrupt_handler() {
    // Submitted queue jobs keep running after an interrupt, so rerunning picks up where this run
    // left off. An error here only means a handler is already installed.
    let _ = ctrlc::set_handler(|| {
        eprintln!();
        eprintln!("Interrupted. Rerun with the same result directory to resume.");
        std::process::exit(130);
    });
}
