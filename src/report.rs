// This file contains the code for turning dnadiff reports into the summary table, including the
// asmval report subcommand which does this for an existing result directory.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use std::fs::{File, read_dir, remove_file};
use std::io::{prelude::*, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::log::{section_header, explanation, warning};
use crate::metrics::{GenomeSummary, ValidationMetrics, NA};
use crate::misc::{check_if_dir_exists, open_text_file, quit_with_error};
use crate::reference::{find_references, Reference};
use crate::wait::{install_interrupt_handler, wait_for_done_files};


const INTERMEDIATE_EXTENSIONS: [&str; 10] = [".delta", ".1delta", ".qdiff", ".rdiff", ".snps",
                                             ".unqry", ".mcoords", ".mdelta", ".delta.filt",
                                             ".1coords"];


pub fn report(ref_folder: PathBuf, result_dir: PathBuf, output: PathBuf, poll_interval: u64,
              timeout: Option<u64>, keep_intermediate: bool) {
    check_settings(&ref_folder, &result_dir, &output);
    starting_message();
    print_settings(&ref_folder, &result_dir, &output, poll_interval, timeout, keep_intermediate);
    install_interrupt_handler();
    let references = find_references(&ref_folder);
    let metrics_yaml = result_dir.join("validation.yaml");
    let mut metrics = ValidationMetrics::load_or_default(&metrics_yaml);
    metrics.reference_count = references.len() as u32;
    metrics.genomes = create_report_file(&references, &result_dir, &output,
                                         Duration::from_secs(poll_interval),
                                         timeout.map(Duration::from_secs));
    if !keep_intermediate {
        clean_intermediate_files(&result_dir);
    }
    metrics.save_to_yaml(&metrics_yaml);
    finished_message(&output, &metrics_yaml);
}


fn check_settings(ref_folder: &Path, result_dir: &Path, output: &Path) {
    check_if_dir_exists(ref_folder);
    check_if_dir_exists(result_dir);
    if output.is_dir() {
        quit_with_error(&format!("{} is a directory", output.display()));
    }
}


fn starting_message() {
    section_header("Starting asmval report");
    explanation("This command waits for all comparisons in a result directory to finish and \
                 then summarises their dnadiff reports in a single table.");
}


fn print_settings(ref_folder: &Path, result_dir: &Path, output: &Path, poll_interval: u64,
                  timeout: Option<u64>, keep_intermediate: bool) {
    eprintln!("Settings:");
    eprintln!("  --ref_folder {}", ref_folder.display());
    eprintln!("  --result_dir {}", result_dir.display());
    eprintln!("  --output {}", output.display());
    eprintln!("  --poll_interval {}", poll_interval);
    if let Some(timeout) = timeout {
        eprintln!("  --timeout {}", timeout);
    }
    if keep_intermediate {
        eprintln!("  --keep_intermediate");
    }
    eprintln!();
}


fn finished_message(output: &Path, metrics_yaml: &Path) {
    section_header("Finished!");
    eprintln!("Summary table: {}", output.display());
    eprintln!("Metrics:       {}", metrics_yaml.display());
    eprintln!();
}


/// The fields of a dnadiff .report file that go into the summary table.
#[derive(Debug, Default, PartialEq)]
pub struct DnadiffReport {
    pub aligned_seqs: Option<String>,
    pub total_bases: Option<String>,
    pub aligned_bases: Option<String>,
    pub avg_length: Option<String>,
    pub avg_identity: Option<String>,
    pub total_snps: Option<String>,
    pub total_gsnps: Option<String>,
}

impl DnadiffReport {
    pub fn from_file(report_file: &Path) -> Self {
        let lines: Vec<String> = open_text_file(report_file).lines()
            .collect::<Result<_, _>>()
            .unwrap_or_else(|e| {
                quit_with_error(&format!("failed to read {}\n{}", report_file.display(), e))
            });
        Self::parse(lines.iter().map(|s| s.as_str()))
    }

    pub fn parse<'a>(lines: impl Iterator<Item = &'a str>) -> Self {
        // dnadiff reports have a reference column then a query column. Only the first rule whose
        // key appears in a line is applied. AvgLength and AvgIdentity appear for both 1-to-1 and
        // M-to-M alignments, and only the first (1-to-1) value is used. Other fields keep the
        // last value seen.
        let mut report = DnadiffReport::default();
        let (mut seen_avg_length, mut seen_avg_identity) = (false, false);
        for line in lines {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if line.contains("AlignedSeqs") {
                report.aligned_seqs = token_before_paren(&tokens, 2);
            } else if line.contains("TotalBases") {
                report.total_bases = token(&tokens, 1);
            } else if line.contains("AlignedBases") {
                report.aligned_bases = token_before_paren(&tokens, 1);
            } else if line.contains("AvgLength") {
                if !seen_avg_length {
                    report.avg_length = token(&tokens, 1);
                    seen_avg_length = true;
                }
            } else if line.contains("AvgIdentity") {
                if !seen_avg_identity {
                    report.avg_identity = token(&tokens, 2);
                    seen_avg_identity = true;
                }
            } else if line.contains("TotalSNPs") {
                report.total_snps = token(&tokens, 2);
            } else if line.contains("TotalGSNPs") {
                report.total_gsnps = token(&tokens, 2);
            }
        }
        report
    }

    pub fn percent_recovered(&self) -> Option<f64> {
        let aligned: f64 = self.aligned_bases.as_ref()?.parse().ok()?;
        let total: f64 = self.total_bases.as_ref()?.parse().ok()?;
        if total > 0.0 { Some(aligned / total * 100.0) } else { None }
    }

    pub fn to_summary(&self, genome_name: &str) -> GenomeSummary {
        let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| NA.to_string());
        GenomeSummary {
            genome_name: genome_name.to_string(),
            nb_contig: or_na(&self.aligned_seqs),
            total_ref_bases: or_na(&self.total_bases),
            aligned_bases: or_na(&self.aligned_bases),
            percent_ref_recovered: self.percent_recovered().map(|p| format!("{:.4}", p))
                                                           .unwrap_or_else(|| NA.to_string()),
            avg_identity: or_na(&self.avg_identity),
            avg_alignment_len: or_na(&self.avg_length),
            total_snps: or_na(&self.total_snps),
            total_gsnps: or_na(&self.total_gsnps),
        }
    }
}


fn token(tokens: &[&str], i: usize) -> Option<String> {
    tokens.get(i).map(|t| t.to_string())
}


fn token_before_paren(tokens: &[&str], i: usize) -> Option<String> {
    // Values like "4000(80.00%)" are reduced to "4000".
    tokens.get(i).map(|t| t.split('(').next().unwrap_or_default().to_string())
}


pub fn summarise_genome(reference: &Reference, result_dir: &Path) -> GenomeSummary {
    let report_file = reference.report_file(result_dir);
    if report_file.is_file() {
        return DnadiffReport::from_file(&report_file).to_summary(&reference.genome_name);
    }
    let mut summary = GenomeSummary::missing(&reference.genome_name);
    if count_fasta_records(&reference.contigs_file(result_dir)) == Some(0) {
        summary.nb_contig = "0".to_string();
    } else {
        warning(&format!("{} not found", report_file.display()));
    }
    summary
}


fn count_fasta_records(fasta: &Path) -> Option<usize> {
    if !fasta.is_file() {
        return None;
    }
    let count = open_text_file(fasta).lines().map_while(Result::ok)
                                     .filter(|line| line.starts_with('>')).count();
    Some(count)
}


pub fn create_report_file(references: &[Reference], result_dir: &Path, output: &Path,
                          poll_interval: Duration, timeout: Option<Duration>)
        -> Vec<GenomeSummary> {
    section_header("Waiting for comparisons");
    explanation("Each comparison writes a done file when it finishes. The result directory is \
                 checked periodically until every genome (plus the ready marker) has one.");
    wait_for_done_files(result_dir, references.len() + 1, poll_interval, timeout);

    section_header("Creating summary table");
    explanation("The dnadiff report for each reference genome is summarised in one row of the \
                 output table.");
    let summaries: Vec<GenomeSummary> = references.iter()
        .map(|reference| summarise_genome(reference, result_dir)).collect();
    if let Err(e) = write_summary_table(&summaries, output) {
        quit_with_error(&format!("failed to write {}\n{}", output.display(), e));
    }
    for summary in &summaries {
        eprintln!("  {}: {}% recovered", summary.genome_name, summary.percent_ref_recovered);
    }
    eprintln!();
    summaries
}


pub fn write_summary_table(summaries: &[GenomeSummary], output: &Path) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(output)?);
    writeln!(out, "{}", GenomeSummary::tsv_header())?;
    for summary in summaries {
        writeln!(out, "{}", summary.tsv_row())?;
    }
    out.flush()
}


pub fn clean_intermediate_files(result_dir: &Path) -> usize {
    section_header("Cleaning up");
    explanation("Intermediate MUMmer files are now deleted from the result directory.");
    let entries = match read_dir(result_dir) {
        Ok(entries) => entries,
        Err(e) => quit_with_error(&format!("unable to read directory {}\n{}",
                                           result_dir.display(), e)),
    };
    let mut removed = 0;
    for path in entries.flatten().map(|entry| entry.path()) {
        if !path.is_file() || !is_intermediate_file(&path) { continue; }
        match remove_file(&path) {
            Ok(_)  => removed += 1,
            Err(e) => warning(&format!("failed to delete {}: {}", path.display(), e)),
        }
    }
    eprintln!("Deleted {} intermediate file{}", removed, if removed == 1 { "" } else { "s" });
    eprintln!();
    removed
}


fn is_intermediate_file(path: &Path) -> bool {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    INTERMEDIATE_EXTENSIONS.iter().any(|ext| file_name.ends_with(ext))
}
