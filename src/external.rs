// This file contains the code for describing and running external programs (BLAST, MUMmer, the
// queue submission tool and the contig builder).

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};


/// Where a step's output goes, mirroring the shell redirections used when the step is rendered
/// as a script line.
#[derive(Clone, Debug, PartialEq)]
pub enum Redirect {
    Inherit,
    Stdout(PathBuf),          // > file
    Combined(PathBuf),        // &>file
    CombinedAppend(PathBuf),  // &>>file 2>&1
}


#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub program: String,
    pub args: Vec<String>,
    pub redirect: Redirect,
}

impl Step {
    pub fn new(program: &str) -> Self {
        Step { program: program.to_string(), args: Vec::new(), redirect: Redirect::Inherit }
    }

    pub fn arg<S: ToString>(mut self, arg: S) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display())
    }

    pub fn redirect(mut self, redirect: Redirect) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn run(&self) -> Result<(), String> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        match &self.redirect {
            Redirect::Inherit => {},
            Redirect::Stdout(path) => {
                command.stdout(Stdio::from(open_output(path, false)?));
            },
            Redirect::Combined(path) | Redirect::CombinedAppend(path) => {
                let append = matches!(self.redirect, Redirect::CombinedAppend(_));
                let file = open_output(path, append)?;
                let err_file = file.try_clone()
                    .map_err(|e| format!("failed to reopen {}: {}", path.display(), e))?;
                command.stdout(Stdio::from(file));
                command.stderr(Stdio::from(err_file));
            },
        }
        let status = command.status()
            .map_err(|e| format!("failed to run {}: {}", self.program, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", self.program, status))
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        match &self.redirect {
            Redirect::Inherit              => Ok(()),
            Redirect::Stdout(path)         => write!(f, " > {}", path.display()),
            Redirect::Combined(path)       => write!(f, " &>{}", path.display()),
            Redirect::CombinedAppend(path) => write!(f, " &>>{} 2>&1", path.display()),
        }
    }
}


fn open_output(path: &Path, append: bool) -> Result<File, String> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append { options.append(true); } else { options.write(true).truncate(true); }
    options.open(path).map_err(|e| format!("failed to open {}: {}", path.display(), e))
}
