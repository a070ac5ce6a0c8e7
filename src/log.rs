// This file contains functions for writing progress text to stderr.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use chrono::Local;
use colored::Colorize;


pub fn section_header(text: &str) {
    let now = Local::now().format("(%Y-%m-%d %H:%M:%S)").to_string();
    eprintln!();
    eprintln!("{} {}", text.bold().bright_yellow().underline(), now.dimmed());
}


pub fn explanation(text: &str) {
    eprintln!("{}", wrap_to_terminal(text).dimmed());
    eprintln!();
}


pub fn warning(text: &str) {
    eprintln!("{}", format!("Warning: {}", text).yellow());
}


fn wrap_to_terminal(text: &str) -> String {
    // Wraps to the terminal width (at most 100 columns, 80 when stderr isn't a terminal).
    let width = term_size::dimensions_stderr().map(|(w, _)| w).unwrap_or(80).min(100);
    textwrap::fill(text, width.max(40))
}
