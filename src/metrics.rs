// This file contains the code for the summary rows and the YAML file of run metrics.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::io::Write;
use std::path::Path;

use crate::misc::quit_with_error;


pub const NA: &str = "NA";

pub const SUMMARY_COLUMNS: [&str; 9] = ["genome_name", "nb_contig", "total_ref_bases",
                                        "aligned_bases", "%_ref_recovered", "%_avg_identity",
                                        "avg_alignment_len", "total_snps", "total_gsnps"];


/// One row of the summary table. Values are kept as the text dnadiff reported them, with "NA"
/// for anything that couldn't be found.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenomeSummary {
    pub genome_name: String,
    pub nb_contig: String,
    pub total_ref_bases: String,
    pub aligned_bases: String,
    pub percent_ref_recovered: String,
    pub avg_identity: String,
    pub avg_alignment_len: String,
    pub total_snps: String,
    pub total_gsnps: String,
}

impl GenomeSummary {
    pub fn missing(genome_name: &str) -> Self {
        GenomeSummary { genome_name: genome_name.to_string(),
                        nb_contig: NA.to_string(),
                        total_ref_bases: NA.to_string(),
                        aligned_bases: NA.to_string(),
                        percent_ref_recovered: NA.to_string(),
                        avg_identity: NA.to_string(),
                        avg_alignment_len: NA.to_string(),
                        total_snps: NA.to_string(),
                        total_gsnps: NA.to_string() }
    }

    pub fn tsv_header() -> String {
        SUMMARY_COLUMNS.join("\t")
    }

    pub fn tsv_row(&self) -> String {
        [&self.genome_name, &self.nb_contig, &self.total_ref_bases, &self.aligned_bases,
         &self.percent_ref_recovered, &self.avg_identity, &self.avg_alignment_len,
         &self.total_snps, &self.total_gsnps].map(|s| s.as_str()).join("\t")
    }
}


#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ValidationMetrics {
    pub reference_count: u32,
    pub contig_count: u32,
    pub assigned_contig_count: u32,
    pub genomes: Vec<GenomeSummary>,
}

impl ValidationMetrics {
    pub fn new() -> Self { Self::default() }

    pub fn load_or_default(filename: &Path) -> Self {
        // A result directory from an earlier run may already have metrics, in which case the
        // counts gathered then are kept.
        if !filename.is_file() {
            return Self::default();
        }
        let content = fs::read_to_string(filename).unwrap_or_else(|e| {
            quit_with_error(&format!("could not read {}\n{}", filename.display(), e))
        });
        serde_yaml::from_str(&content).unwrap_or_else(|e| {
            quit_with_error(&format!("failed to parse {}\n{}", filename.display(), e))
        })
    }

    pub fn save_to_yaml(&self, filename: &Path) {
        if let Err(e) = save_yaml(filename, self) {
            quit_with_error(&format!("failed to write {}\n{}", filename.display(), e));
        }
    }
}


fn save_yaml<T: Serialize>(yaml_filename: &Path, data: T) -> io::Result<()> {
    let yaml_string = serde_yaml::to_string(&data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut file = File::create(yaml_filename)?;
    file.write_all(yaml_string.as_bytes())?;
    Ok(())
}
