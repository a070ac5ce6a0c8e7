// This file contains the code for splitting the assembly's contigs into one FASTA file per
// reference genome, based on each contig's best BLAST hit.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use fxhash::FxHashMap;
use std::fs::File;
use std::io::{prelude::*, BufWriter};
use std::path::Path;

use crate::log::{section_header, explanation, warning};
use crate::misc::{load_fasta, quit_with_error};
use crate::reference::Reference;


/// Writes each reference's contigs to its own file. Returns the number of contigs written for each
/// reference and the total number of contigs in the contig file.
pub fn split_contigs(contig_file: &Path, best_hits: &[(String, String)],
                     references: &[Reference], result_dir: &Path) -> (Vec<usize>, usize) {
    section_header("Splitting contigs by reference");
    explanation("Contigs are grouped by their best-hit reference genome, giving one FASTA file \
                 of contigs per reference.");
    let contigs = load_fasta(contig_file);
    let sequences: FxHashMap<&str, &str> = contigs.iter()
        .map(|(name, _, seq)| (name.as_str(), seq.as_str())).collect();

    let mut counts = Vec::with_capacity(references.len());
    for reference in references {
        let out_path = reference.contigs_file(result_dir);
        let count = write_reference_contigs(&reference.genome_name, best_hits, &sequences, &out_path)
            .unwrap_or_else(|e| {
                quit_with_error(&format!("failed to write {}\n{}", out_path.display(), e));
            });
        eprintln!("  {}: {} contig{}", reference.genome_name, count, if count == 1 { "" } else { "s" });
        counts.push(count);
    }
    eprintln!();
    warn_about_unknown_hits(best_hits, &sequences, references);
    (counts, contigs.len())
}


fn write_reference_contigs(genome_name: &str, best_hits: &[(String, String)],
                           sequences: &FxHashMap<&str, &str>, out_path: &Path)
        -> std::io::Result<usize> {
    // Contigs are written as one-line FASTA records in the order of the BLAST hits.
    let mut out = BufWriter::new(File::create(out_path)?);
    let mut count = 0;
    for (contig, reference) in best_hits {
        if reference != genome_name { continue; }
        if let Some(seq) = sequences.get(contig.as_str()) {
            writeln!(out, ">{}\n{}", contig, seq)?;
            count += 1;
        }
    }
    out.flush()?;
    Ok(count)
}


fn warn_about_unknown_hits(best_hits: &[(String, String)], sequences: &FxHashMap<&str, &str>,
                           references: &[Reference]) {
    for (contig, reference) in best_hits {
        if !sequences.contains_key(contig.as_str()) {
            warning(&format!("BLAST hit for contig {} which is not in the contig file", contig));
        }
        if !references.iter().any(|r| &r.genome_name == reference) {
            warning(&format!("contig {} hit unknown reference {}", contig, reference));
        }
    }
}
