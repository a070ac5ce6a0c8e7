// This file contains the code for the asmval validate subcommand, which runs the whole assembly
// validation pipeline.

// Copyright 2026 the asmval authors

// This file is part of asmval. asmval is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free Software Foundation,
// either version 3 of the License, or (at your option) any later version. asmval is distributed
// in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty
// of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for
// more details. You should have received a copy of the GNU General Public License along with
// asmval. If not, see <http://www.gnu.org/licenses/>.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::blast::align_contigs;
use crate::compare::{compare_contigs_to_ref, required_programs, Executor, QueueSettings};
use crate::log::{section_header, explanation};
use crate::metrics::ValidationMetrics;
use crate::misc::{check_if_dir_exists, check_if_dir_is_not_dir, check_if_file_exists,
                  check_requirements, create_dir, format_duration, format_float, quit_with_error};
use crate::partition::split_contigs;
use crate::reference::{build_reference_db, find_references};
use crate::report::{clean_intermediate_files, create_report_file};
use crate::wait::install_interrupt_handler;


pub struct ValidateSettings {
    pub contig_file: PathBuf,
    pub ref_folder: PathBuf,
    pub result_dir: PathBuf,
    pub output: PathBuf,
    pub threads: usize,
    pub min_identity: f64,
    pub min_length: u32,
    pub executor: Executor,
    pub queue: QueueSettings,
    pub poll_interval: u64,
    pub timeout: Option<u64>,
    pub keep_intermediate: bool,
}


pub fn validate(settings: ValidateSettings) {
    let start_time = Instant::now();
    check_settings(&settings);
    starting_message();
    print_settings(&settings);
    check_requirements(&required_programs(settings.executor, &settings.queue));
    create_dir(&settings.result_dir);
    install_interrupt_handler();

    let result_dir = &settings.result_dir;
    let metrics_yaml = result_dir.join("validation.yaml");
    let mut metrics = ValidationMetrics::new();

    let references = find_references(&settings.ref_folder);
    metrics.reference_count = references.len() as u32;
    let db_prefix = build_reference_db(&references, result_dir);
    let best_hits = align_contigs(&settings.contig_file, &db_prefix, result_dir,
                                  settings.min_length, settings.min_identity, settings.threads);
    let (contig_counts, contig_count) = split_contigs(&settings.contig_file, &best_hits,
                                                     &references, result_dir);
    metrics.contig_count = contig_count as u32;
    metrics.assigned_contig_count = contig_counts.iter().sum::<usize>() as u32;

    compare_contigs_to_ref(&references, &contig_counts, result_dir, settings.executor,
                           &settings.queue, settings.threads, settings.min_identity,
                           settings.min_length);
    metrics.genomes = create_report_file(&references, result_dir, &settings.output,
                                         Duration::from_secs(settings.poll_interval),
                                         settings.timeout.map(Duration::from_secs));
    if !settings.keep_intermediate {
        clean_intermediate_files(result_dir);
    }
    metrics.save_to_yaml(&metrics_yaml);
    finished_message(&settings.output, &metrics_yaml, start_time);
}


fn check_settings(settings: &ValidateSettings) {
    check_if_file_exists(&settings.contig_file);
    check_if_dir_exists(&settings.ref_folder);
    check_if_dir_is_not_dir(&settings.result_dir);
    if settings.output.is_dir() {
        quit_with_error(&format!("{} is a directory", settings.output.display()));
    }
    if settings.threads < 1 {
        quit_with_error("--threads must be at least 1");
    }
    if settings.min_identity <= 0.0 || settings.min_identity > 100.0 {
        quit_with_error("--min_identity must be greater than 0 and at most 100");
    }
    if settings.min_length < 1 {
        quit_with_error("--min_length must be at least 1");
    }
    if settings.poll_interval < 1 {
        quit_with_error("--poll_interval must be at least 1");
    }
}


fn starting_message() {
    section_header("Starting asmval validate");
    explanation("This command assigns each contig of a metagenomic assembly to its best-matching \
                 reference genome, compares each reference to its contigs and summarises how \
                 much of each reference the assembly recovered.");
}


fn print_settings(settings: &ValidateSettings) {
    eprintln!("Settings:");
    eprintln!("  --contig_file {}", settings.contig_file.display());
    eprintln!("  --ref_folder {}", settings.ref_folder.display());
    eprintln!("  --result_dir {}", settings.result_dir.display());
    eprintln!("  --output {}", settings.output.display());
    eprintln!("  --threads {}", settings.threads);
    eprintln!("  --min_identity {}", format_float(settings.min_identity));
    eprintln!("  --min_length {}", settings.min_length);
    match settings.executor {
        Executor::Local => eprintln!("  --executor local"),
        Executor::Queue => {
            eprintln!("  --executor queue");
            eprintln!("  --submit_cmd {}", settings.queue.submit_cmd);
            eprintln!("  --queue {}", settings.queue.queue);
            eprintln!("  --resources {}", settings.queue.resources);
        },
    }
    eprintln!("  --poll_interval {}", settings.poll_interval);
    if let Some(timeout) = settings.timeout {
        eprintln!("  --timeout {}", timeout);
    }
    if settings.keep_intermediate {
        eprintln!("  --keep_intermediate");
    }
    eprintln!();
}


fn finished_message(output: &Path, metrics_yaml: &Path, start_time: Instant) {
    section_header("Finished!");
    eprintln!("Summary table: {}", output.display());
    eprintln!("Metrics:       {}", metrics_yaml.display());
    eprintln!("Time to run:   {}", format_duration(start_time.elapsed()));
    eprintln!();
}
