// This file contains the code for finding reference genomes and combining them into a single
// BLAST database.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use std::fs::{File, read_dir};
use std::io::{prelude::*, BufWriter};
use std::path::{Path, PathBuf};

use crate::external::Step;
use crate::log::{section_header, explanation};
use crate::misc::{open_text_file, quit_with_error};


#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    pub path: PathBuf,
    pub genome_name: String,
}

impl Reference {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        Reference { genome_name: genome_name(&file_name), path }
    }

    pub fn done_file(&self, result_dir: &Path) -> PathBuf {
        result_dir.join(format!("{}.done", self.genome_name))
    }

    pub fn report_file(&self, result_dir: &Path) -> PathBuf {
        result_dir.join(format!("{}.report", self.genome_name))
    }

    pub fn contigs_file(&self, result_dir: &Path) -> PathBuf {
        result_dir.join(format!("{}.mc.fasta", self.genome_name))
    }
}


pub fn genome_name(file_name: &str) -> String {
    // The genome name is the file name without its last extension. A file without any extension
    // keeps its whole name.
    match file_name.rfind('.') {
        Some(i) if i > 0 => file_name[..i].to_string(),
        _                => file_name.to_string(),
    }
}


pub fn find_references(ref_folder: &Path) -> Vec<Reference> {
    let entries = match read_dir(ref_folder) {
        Ok(entries) => entries,
        Err(e) => quit_with_error(&format!("unable to read directory {}\n{}",
                                           ref_folder.display(), e)),
    };
    let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path())
                                         .filter(|path| path.is_file()).collect();
    paths.sort_unstable();
    if paths.is_empty() {
        quit_with_error(&format!("no reference files found in {}", ref_folder.display()));
    }
    for path in &paths {
        check_fasta_header(path);
    }
    let references: Vec<Reference> = paths.into_iter().map(Reference::new).collect();
    check_unique_names(&references);
    references
}


fn check_fasta_header(path: &Path) {
    // Every file in the folder is used as a reference, so stray files (indices, notes) must be
    // caught here before their lines end up in another genome's sequence.
    let first_line = open_text_file(path).lines().map_while(Result::ok)
                                         .find(|line| !line.trim().is_empty());
    match first_line {
        Some(line) if line.starts_with('>') => {},
        _ => quit_with_error(&format!("{} is not a FASTA file (it must start with a > header line)
                                       Only reference genomes should be in the reference folder.",
                                      path.display())),
    }
}


fn check_unique_names(references: &[Reference]) {
    // Two files like genome.fasta and genome.fna would write to the same result files.
    let mut names: Vec<&str> = references.iter().map(|r| r.genome_name.as_str()).collect();
    names.sort_unstable();
    for pair in names.windows(2) {
        if pair[0] == pair[1] {
            quit_with_error(&format!("multiple reference files have the genome name {}", pair[0]));
        }
    }
}


pub fn build_reference_db(references: &[Reference], result_dir: &Path) -> PathBuf {
    section_header("Building reference database");
    explanation("All reference genomes are combined into one FASTA file (with each header \
                 prefixed by its genome name) and indexed as a BLAST nucleotide database.");
    let combined_fasta = result_dir.join("reference.fasta");
    let db_prefix = result_dir.join("reference");
    if let Err(e) = write_combined_fasta(references, &combined_fasta) {
        quit_with_error(&format!("failed to write {}\n{}", combined_fasta.display(), e));
    }
    eprintln!("Combined reference: {}", combined_fasta.display());
    let step = makeblastdb_step(&combined_fasta, &db_prefix);
    eprintln!("{}", step);
    if let Err(e) = step.run() {
        quit_with_error(&format!("failed to build BLAST database\n{}", e));
    }
    eprintln!();
    db_prefix
}


pub fn write_combined_fasta(references: &[Reference], combined_fasta: &Path)
        -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(combined_fasta)?);
    for reference in references {
        for line in open_text_file(&reference.path).lines() {
            let line = line?;
            match line.strip_prefix('>') {
                Some(header) => writeln!(out, ">{} {}", reference.genome_name, header)?,
                None         => writeln!(out, "{}", line)?,
            }
        }
    }
    out.flush()
}


pub fn makeblastdb_step(combined_fasta: &Path, db_prefix: &Path) -> Step {
    Step::new("makeblastdb").arg("-in").path_arg(combined_fasta)
                            .arg("-out").path_arg(db_prefix)
                            .arg("-dbtype").arg("nucl")
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir, read_to_string};
    use std::panic;
    use tempfile::tempdir;
    use crate::tests::{make_gzipped_test_file, make_test_file};

    #[test]
    fn test_genome_name() {
        assert_eq!(genome_name("E_coli.fasta"), "E_coli");
        assert_eq!(genome_name("a.b.fa"), "a.b");
        assert_eq!(genome_name("genome"), "genome");
        assert_eq!(genome_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_find_references() {
        let dir = tempdir().unwrap();
        make_test_file(&dir.path().join("b.fasta"), ">b\nACGT\n");
        make_test_file(&dir.path().join("a.fasta"), ">a\nACGT\n");
        create_dir(dir.path().join("subdir.fasta")).unwrap();
        let references = find_references(dir.path());
        let names: Vec<_> = references.iter().map(|r| r.genome_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(references[0].path, dir.path().join("a.fasta"));
        assert_eq!(references[1].done_file(Path::new("out")), PathBuf::from("out/b.done"));
        assert_eq!(references[1].report_file(Path::new("out")), PathBuf::from("out/b.report"));
        assert_eq!(references[1].contigs_file(Path::new("out")),
                   PathBuf::from("out/b.mc.fasta"));
    }

    #[test]
    fn test_find_references_errors() {
        let empty = tempdir().unwrap();
        assert!(panic::catch_unwind(|| { find_references(empty.path()); }).is_err());

        let clash = tempdir().unwrap();
        make_test_file(&clash.path().join("x.fasta"), ">x\nACGT\n");
        make_test_file(&clash.path().join("x.fna"), ">x\nACGT\n");
        assert!(panic::catch_unwind(|| { find_references(clash.path()); }).is_err());
    }

    #[test]
    fn test_find_references_rejects_non_fasta() {
        let dir = tempdir().unwrap();
        make_test_file(&dir.path().join("a.fasta"), ">chr\nACGT\n");
        make_test_file(&dir.path().join("a.fasta.fai"), "chr\t4\t5\t4\t5\n");
        assert!(panic::catch_unwind(|| { find_references(dir.path()); }).is_err());

        let dir = tempdir().unwrap();
        make_test_file(&dir.path().join("a.fasta"), ">chr\nACGT\n");
        make_test_file(&dir.path().join("empty.fasta"), "");
        assert!(panic::catch_unwind(|| { find_references(dir.path()); }).is_err());

        // Leading blank lines and gzipped files are fine.
        let dir = tempdir().unwrap();
        make_test_file(&dir.path().join("a.fasta"), "\n>chr\nACGT\n");
        make_gzipped_test_file(&dir.path().join("b.fasta.gz"), ">chr\nACGT\n");
        assert_eq!(find_references(dir.path()).len(), 2);
    }

    #[test]
    fn test_write_combined_fasta() {
        let ref_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        make_test_file(&ref_dir.path().join("g1.fasta"), ">chr1 desc\nACGT\nAC\n>plasmid\nTT\n");
        make_gzipped_test_file(&ref_dir.path().join("g2.fa"), ">seq\nGGGG\n");
        let references = find_references(ref_dir.path());
        let combined = out_dir.path().join("reference.fasta");
        write_combined_fasta(&references, &combined).unwrap();
        assert_eq!(read_to_string(&combined).unwrap(),
                   ">g1 chr1 desc\nACGT\nAC\n>g1 plasmid\nTT\n>g2 seq\nGGGG\n");

        // Rerunning replaces the file rather than appending to it.
        write_combined_fasta(&references, &combined).unwrap();
        assert_eq!(read_to_string(&combined).unwrap().matches('>').count(), 3);
    }

    #[test]
    fn test_makeblastdb_step() {
        let step = makeblastdb_step(Path::new("out/reference.fasta"), Path::new("out/reference"));
        assert_eq!(step.to_string(),
                   "makeblastdb -in out/reference.fasta -out out/reference -dbtype nucl");
    }
}
