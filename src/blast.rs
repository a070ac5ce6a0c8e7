// This file contains the code for aligning contigs to the reference database with blastn and
// picking each contig's best-hit reference genome.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use fxhash::FxHashSet;
use std::io::prelude::*;
use std::path::Path;

use crate::external::Step;
use crate::log::{section_header, explanation};
use crate::misc::{format_float, open_text_file, quit_with_error};


const BLAST_EVALUE: &str = "1e-3";


pub fn align_contigs(contig_file: &Path, db_prefix: &Path, result_dir: &Path, word_size: u32,
                     perc_identity: f64, threads: usize) -> Vec<(String, String)> {
    section_header("Aligning contigs to references");
    explanation("Each contig is aligned to the reference database with blastn. A contig's first \
                 hit decides which reference genome it is compared against.");
    let blast_out = result_dir.join("contig_to_ref.blastn");
    let step = blastn_step(contig_file, db_prefix, &blast_out, word_size, perc_identity, threads);
    eprintln!("{}", step);
    if let Err(e) = step.run() {
        quit_with_error(&format!("blastn failed\n{}", e));
    }
    let best_hits = parse_best_hits(&blast_out);
    eprintln!("Contigs with a reference hit: {}", best_hits.len());
    eprintln!();
    best_hits
}


pub fn blastn_step(contig_file: &Path, db_prefix: &Path, blast_out: &Path, word_size: u32,
                   perc_identity: f64, threads: usize) -> Step {
    Step::new("blastn").arg("-db").path_arg(db_prefix)
                       .arg("-query").path_arg(contig_file)
                       .arg("-word_size").arg(word_size)
                       .arg("-evalue").arg(BLAST_EVALUE)
                       .arg("-max_target_seqs").arg(1)
                       .arg("-perc_identity").arg(format_float(perc_identity))
                       .arg("-outfmt").arg(6)
                       .arg("-num_threads").arg(threads)
                       .arg("-out").path_arg(blast_out)
}


pub fn parse_best_hits(blast_out: &Path) -> Vec<(String, String)> {
    // Returns (contig, reference) pairs in the order contigs first appear. blastn lists a query's
    // hits best first, so only the first line for each contig counts.
    let mut best_hits = Vec::new();
    let mut seen = FxHashSet::default();
    for (i, line) in open_text_file(blast_out).lines().enumerate() {
        let line = line.unwrap_or_else(|e| {
            quit_with_error(&format!("failed to read {}\n{}", blast_out.display(), e));
        });
        let mut columns = line.split_whitespace();
        let contig = match columns.next() {
            Some(contig) => contig,
            None         => continue,
        };
        let reference = match columns.next() {
            Some(reference) => reference,
            None => quit_with_error(&format!("{} line {} has too few columns",
                                             blast_out.display(), i + 1)),
        };
        if seen.insert(contig.to_string()) {
            best_hits.push((contig.to_string(), reference.to_string()));
        }
    }
    best_hits
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;
    use tempfile::tempdir;
    use crate::tests::make_test_file;

    #[test]
    fn test_blastn_step() {
        let step = blastn_step(Path::new("mc.fasta"), Path::new("out/reference"),
                               Path::new("out/contig_to_ref.blastn"), 100, 95.0, 4);
        assert_eq!(step.to_string(),
                   "blastn -db out/reference -query mc.fasta -word_size 100 -evalue 1e-3 \
                    -max_target_seqs 1 -perc_identity 95 -outfmt 6 -num_threads 4 \
                    -out out/contig_to_ref.blastn");
    }

    #[test]
    fn test_parse_best_hits() {
        let dir = tempdir().unwrap();
        let blast_out = dir.path().join("contig_to_ref.blastn");
        make_test_file(&blast_out,
                       "ctg2\tE_coli\t99.5\t1000\t5\t0\t1\t1000\t1\t1000\t0.0\t1800\n\
                        ctg2\tS_aureus\t96.0\t500\t20\t0\t1\t500\t1\t500\t0.0\t800\n\
                        \n\
                        ctg1\tS_aureus\t100.0\t300\t0\t0\t1\t300\t1\t300\t0.0\t550\n\
                        ctg2\tE_coli\t98.0\t200\t4\t0\t1\t200\t1\t200\t0.0\t350\n");
        assert_eq!(parse_best_hits(&blast_out),
                   vec![("ctg2".to_string(), "E_coli".to_string()),
                        ("ctg1".to_string(), "S_aureus".to_string())]);
    }

    #[test]
    fn test_parse_best_hits_empty() {
        let dir = tempdir().unwrap();
        let blast_out = dir.path().join("contig_to_ref.blastn");
        make_test_file(&blast_out, "");
        assert!(parse_best_hits(&blast_out).is_empty());
    }

    #[test]
    fn test_parse_best_hits_bad_line() {
        let dir = tempdir().unwrap();
        let blast_out = dir.path().join("contig_to_ref.blastn");
        make_test_file(&blast_out, "ctg1\tE_coli\t100.0\nctg2\n");
        assert!(panic::catch_unwind(|| { parse_best_hits(&blast_out); }).is_err());
    }
}
